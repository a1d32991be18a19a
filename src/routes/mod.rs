mod helpers;
mod method_not_allowed;
mod subscribe;
mod unsubscribe;
mod verify;

pub use helpers::{envelope_framework_error, ApiError, Envelope, LinkParameters};
pub use method_not_allowed::*;
pub use subscribe::*;
pub use unsubscribe::*;
pub use verify::*;
