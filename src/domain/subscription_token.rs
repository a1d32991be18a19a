use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes behind a token (128 bits)
const TOKEN_BYTES: usize = 16;

/// Opaque bearer credential embedded in verification and unsubscription links
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// Generate a new token from the operating system CSPRNG, hex encoded
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a token previously issued by [`SubscriptionToken::generate`]
    pub fn parse(token: String) -> Result<Self, String> {
        let is_valid = token.len() == TOKEN_BYTES * 2
            && token
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if is_valid {
            Ok(Self(token))
        } else {
            Err("Not a valid subscription token".to_string())
        }
    }

    /// Compare against a candidate without short-circuiting on the first differing byte
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubscriptionToken([REDACTED])")
    }
}
