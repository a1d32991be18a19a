use chrono::{DateTime, Utc};

use crate::domain::{SubscriberEmail, SubscriptionStatus, SubscriptionToken};

/// Reasons a subscription state transition is refused
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("The subscriber is already verified")]
    AlreadySubscribed,
    #[error("The provided token does not match the stored one")]
    TokenMismatch,
}

/// Subscriber record, one per email address
///
/// The lifecycle state is derived from `verified` and `unsubscribed_at`:
/// a verified record is [`SubscriptionStatus::Verified`], an unverified one that
/// went through a successful unsubscription is [`SubscriptionStatus::Unverified`],
/// anything else is [`SubscriptionStatus::Pending`].
#[derive(Debug, Clone)]
pub struct Subscriber {
    email: SubscriberEmail,
    token: SubscriptionToken,
    verified: bool,
    unsubscribed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Subscriber {
    /// Handle a subscription request for `email`, given its current record if any
    ///
    /// Active subscribers are refused. Any other record is replaced by a pending
    /// one with a fresh token, which invalidates links sent out earlier.
    pub fn subscribe(
        existing: Option<Self>,
        email: SubscriberEmail,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        let created_at = match existing {
            Some(subscriber) if subscriber.is_active() => {
                return Err(TransitionError::AlreadySubscribed)
            }
            Some(subscriber) => subscriber.created_at,
            None => now,
        };

        Ok(Self {
            email,
            token: SubscriptionToken::generate(),
            verified: false,
            unsubscribed_at: None,
            created_at,
            updated_at: now,
        })
    }

    /// Mark the subscriber as verified if `token` matches, from any state
    pub fn verify(&mut self, token: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.authorize(token)?;
        self.verified = true;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the subscriber as unsubscribed if `token` matches, from any state
    ///
    /// The token is kept, so the unsubscribe link stays usable and a later
    /// verification with the same link re-activates the record.
    pub fn unsubscribe(&mut self, token: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.authorize(token)?;
        self.verified = false;
        self.unsubscribed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn authorize(&self, token: &str) -> Result<(), TransitionError> {
        if self.token.matches(token) {
            Ok(())
        } else {
            Err(TransitionError::TokenMismatch)
        }
    }

    pub const fn status(&self) -> SubscriptionStatus {
        if self.verified {
            SubscriptionStatus::Verified
        } else if self.unsubscribed_at.is_some() {
            SubscriptionStatus::Unverified
        } else {
            SubscriptionStatus::Pending
        }
    }

    pub const fn is_active(&self) -> bool {
        self.status().is_active()
    }

    pub const fn email(&self) -> &SubscriberEmail {
        &self.email
    }

    pub const fn token(&self) -> &SubscriptionToken {
        &self.token
    }

    pub const fn verified(&self) -> bool {
        self.verified
    }

    pub const fn unsubscribed_at(&self) -> Option<DateTime<Utc>> {
        self.unsubscribed_at
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rebuild a record loaded from a store
    pub(crate) fn restore(
        email: SubscriberEmail,
        token: SubscriptionToken,
        verified: bool,
        unsubscribed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            token,
            verified,
            unsubscribed_at,
            created_at,
            updated_at,
        }
    }
}
