use std::fmt;

use validator::ValidateEmail;

/// Subscriber email, trimmed and lowercased so that lookups are case-insensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Parse and normalize subscriber email
    pub fn parse(email: String) -> Result<Self, String> {
        let normalized = email.trim().to_lowercase();
        if ValidateEmail::validate_email(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(format!("{email} is not a valid subscriber email"))
        }
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
