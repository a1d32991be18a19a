mod subscriber;
mod subscriber_email;
mod subscription_status;
mod subscription_token;

pub use subscriber::{Subscriber, TransitionError};
pub use subscriber_email::SubscriberEmail;
pub use subscription_status::SubscriptionStatus;
pub use subscription_token::SubscriptionToken;
