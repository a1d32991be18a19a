use async_trait::async_trait;

use crate::domain::{Subscriber, SubscriberEmail};

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Key-value persistence for subscriber records, keyed by email
///
/// Writes follow last-writer-wins: `put_subscriber` replaces whatever record is
/// stored under the same email.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Fetch the record stored for `email`, if any
    async fn get_subscriber(&self, email: &SubscriberEmail) -> anyhow::Result<Option<Subscriber>>;

    /// Insert or replace the record for `subscriber.email()`
    async fn put_subscriber(&self, subscriber: &Subscriber) -> anyhow::Result<()>;
}
