use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::field::{display, Empty};
use tracing::Span;
use url::Url;

use crate::domain::{Subscriber, SubscriberEmail, TransitionError};
use crate::email_client::EmailSender;
use crate::store::SubscriberStore;
use crate::templates::{Templates, VERIFIED_HTML, VERIFIED_TEXT, VERIFY_HTML, VERIFY_TEXT};

const VERIFY_SUBJECT: &str = "Verify your email";
const VERIFIED_SUBJECT: &str = "Email verified";

/// Subscription operation error type
#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("The subscriber is already verified")]
    AlreadySubscribed,
    #[error("Unknown subscriber or token mismatch")]
    Unauthorized,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<TransitionError> for SubscriptionError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadySubscribed => Self::AlreadySubscribed,
            TransitionError::TokenMismatch => Self::Unauthorized,
        }
    }
}

/// Double opt-in subscription workflow on top of a record store and an email sender
pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
    email_client: Arc<dyn EmailSender>,
    templates: Templates,
    base_url: String,
}

impl SubscriptionService {
    /// `base_url` is the public address that links in emails point to
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        email_client: Arc<dyn EmailSender>,
        templates: Templates,
        base_url: String,
    ) -> Self {
        Self {
            store,
            email_client,
            templates,
            base_url: {
                let mut base_url = base_url;
                base_url.truncate(base_url.trim_end_matches('/').len());
                base_url
            },
        }
    }

    /// Register `email` as a pending subscriber and send the verification email
    #[tracing::instrument(name = "Subscribe", skip(self), fields(subscriber_status = Empty))]
    pub async fn subscribe(&self, email: SubscriberEmail) -> Result<Subscriber, SubscriptionError> {
        let existing = self
            .store
            .get_subscriber(&email)
            .await
            .context("Failed to look up the subscriber")?;
        if let Some(existing) = &existing {
            Span::current().record("subscriber_status", display(existing.status()));
        }

        let subscriber = Subscriber::subscribe(existing, email, Utc::now())?;
        self.store
            .put_subscriber(&subscriber)
            .await
            .context("Failed to store the pending subscriber")?;

        self.send_verification_email(&subscriber)
            .await
            .context("Failed to send the verification email")?;

        Ok(subscriber)
    }

    /// Verify `email` if `token` is its current token, then send the confirmation email
    #[tracing::instrument(name = "Verify", skip(self, token), fields(subscriber_status = Empty))]
    pub async fn verify(
        &self,
        email: &SubscriberEmail,
        token: &str,
    ) -> Result<Subscriber, SubscriptionError> {
        let previous = self.authorized_subscriber(email).await?;
        let mut subscriber = previous.clone();
        subscriber.verify(token, Utc::now())?;

        self.store
            .put_subscriber(&subscriber)
            .await
            .context("Failed to store the verified subscriber")?;

        if let Err(e) = self.send_confirmation_email(&subscriber).await {
            self.roll_back(&previous).await;
            return Err(e.context("Failed to send the confirmation email").into());
        }

        Ok(subscriber)
    }

    /// Unsubscribe `email` if `token` is its current token
    #[tracing::instrument(
        name = "Unsubscribe",
        skip(self, token),
        fields(subscriber_status = Empty)
    )]
    pub async fn unsubscribe(
        &self,
        email: &SubscriberEmail,
        token: &str,
    ) -> Result<Subscriber, SubscriptionError> {
        let mut subscriber = self.authorized_subscriber(email).await?;
        subscriber.unsubscribe(token, Utc::now())?;

        self.store
            .put_subscriber(&subscriber)
            .await
            .context("Failed to store the unsubscribed subscriber")?;

        Ok(subscriber)
    }

    /// Load the record for `email`, treating an absent record like a token mismatch
    ///
    /// The status found is recorded on the current span.
    async fn authorized_subscriber(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Subscriber, SubscriptionError> {
        let subscriber = self
            .store
            .get_subscriber(email)
            .await
            .context("Failed to look up the subscriber")?
            .ok_or(SubscriptionError::Unauthorized)?;
        Span::current().record("subscriber_status", display(subscriber.status()));
        Ok(subscriber)
    }

    /// Write back the record as it was before a transition whose side effect failed
    async fn roll_back(&self, previous: &Subscriber) {
        if let Err(e) = self.store.put_subscriber(previous).await {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Failed to restore subscriber {} after a failed notification",
                previous.email()
            );
        }
    }

    /// Build `{base_url}/{action}?email=..&token=..`
    fn action_link(&self, action: &str, subscriber: &Subscriber) -> anyhow::Result<Url> {
        let mut link = Url::parse(&format!("{}/{action}", self.base_url))
            .context("Failed to build a link from the application base URL")?;
        link.query_pairs_mut()
            .append_pair("email", subscriber.email().as_ref())
            .append_pair("token", subscriber.token().as_ref());
        Ok(link)
    }

    #[tracing::instrument(name = "Send verification email", skip_all)]
    async fn send_verification_email(&self, subscriber: &Subscriber) -> anyhow::Result<()> {
        let verify_url = self.action_link("verify", subscriber)?;
        let unsubscribe_url = self.action_link("unsubscribe", subscriber)?;
        let html_body = self.templates.render(
            VERIFY_HTML,
            &[
                ("verify_url", verify_url.as_str()),
                ("unsubscribe_url", unsubscribe_url.as_str()),
            ],
        )?;
        let text_body = self
            .templates
            .render(VERIFY_TEXT, &[("verify_url", verify_url.as_str())])?;

        self.email_client
            .send_email(subscriber.email(), VERIFY_SUBJECT, &html_body, &text_body)
            .await
    }

    #[tracing::instrument(name = "Send confirmation email", skip_all)]
    async fn send_confirmation_email(&self, subscriber: &Subscriber) -> anyhow::Result<()> {
        let unsubscribe_url = self.action_link("unsubscribe", subscriber)?;
        let substitutions = [("unsubscribe_url", unsubscribe_url.as_str())];
        let html_body = self.templates.render(VERIFIED_HTML, &substitutions)?;
        let text_body = self.templates.render(VERIFIED_TEXT, &substitutions)?;

        self.email_client
            .send_email(subscriber.email(), VERIFIED_SUBJECT, &html_body, &text_body)
            .await
    }
}
