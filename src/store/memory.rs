use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Subscriber, SubscriberEmail};
use crate::store::SubscriberStore;

/// Process-local store, for development and tests
#[derive(Default)]
pub struct InMemoryStore {
    subscribers: RwLock<HashMap<SubscriberEmail, Subscriber>>,
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn get_subscriber(&self, email: &SubscriberEmail) -> anyhow::Result<Option<Subscriber>> {
        Ok(self.subscribers.read().await.get(email).cloned())
    }

    async fn put_subscriber(&self, subscriber: &Subscriber) -> anyhow::Result<()> {
        self.subscribers
            .write()
            .await
            .insert(subscriber.email().clone(), subscriber.clone());
        Ok(())
    }
}
