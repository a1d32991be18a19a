use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Subscriber, SubscriberEmail, SubscriptionToken};
use crate::store::SubscriberStore;

/// Subscriber records kept in the `subscribers` table
pub struct PostgresStore {
    db_pool: PgPool,
}

/// Raw `subscribers` row
#[derive(sqlx::FromRow)]
struct SubscriberRow {
    email: String,
    token: String,
    verified: bool,
    unsubscribed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = anyhow::Error;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(row.email).map_err(anyhow::Error::msg)?;
        let token = SubscriptionToken::parse(row.token)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid token stored for subscriber {email}"))?;
        Ok(Self::restore(
            email,
            token,
            row.verified,
            row.unsubscribed_at,
            row.created_at,
            row.updated_at,
        ))
    }
}

impl PostgresStore {
    pub const fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Apply the migrations shipped in `./migrations`
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run database migrations")
    }
}

#[async_trait]
impl SubscriberStore for PostgresStore {
    #[tracing::instrument(name = "Fetch subscriber from the database", skip(self))]
    async fn get_subscriber(&self, email: &SubscriberEmail) -> anyhow::Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r"
            SELECT email, token, verified, unsubscribed_at, created_at, updated_at
            FROM subscribers
            WHERE email = $1
            ",
        )
        .bind(email.as_ref())
        .fetch_optional(&self.db_pool)
        .await
        .context("Failed to perform a query to fetch a subscriber")?;

        row.map(Subscriber::try_from).transpose()
    }

    #[tracing::instrument(
        name = "Save subscriber in the database",
        skip_all,
        fields(subscriber_email = %subscriber.email())
    )]
    async fn put_subscriber(&self, subscriber: &Subscriber) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO subscribers (email, token, verified, unsubscribed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                token = EXCLUDED.token,
                verified = EXCLUDED.verified,
                unsubscribed_at = EXCLUDED.unsubscribed_at,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(subscriber.email().as_ref())
        .bind(subscriber.token().as_ref())
        .bind(subscriber.verified())
        .bind(subscriber.unsubscribed_at())
        .bind(subscriber.created_at())
        .bind(subscriber.updated_at())
        .execute(&self.db_pool)
        .await
        .context("Failed to perform a query to save a subscriber")?;

        Ok(())
    }
}
