use std::fmt;

/// Lifecycle state of a subscriber record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Invited, waiting for the verification link to be followed
    Pending,
    /// Active subscriber
    Verified,
    /// Unsubscribed
    Unverified,
}

impl SubscriptionStatus {
    /// Only verified subscribers receive list mail
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Verified)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Unverified => "unverified",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
