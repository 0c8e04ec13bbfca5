//! The token stored in the auth and pending two-factor cookies.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserID};

/// Identifies a user until `expires_at`.
///
/// Serialised as JSON with an RFC 3339 expiry, e.g.
/// `{"user_id":1,"expires_at":"2025-12-21T03:54:00Z"}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// A token for `user_id` that expires `lifetime` from now (UTC).
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateFormat] if the expiry would overflow.
    pub fn new(user_id: UserID, lifetime: Duration) -> Result<Self, Error> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(lifetime)
            .ok_or_else(|| Error::InvalidDateFormat(format!("now + {lifetime} overflows")))?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// The same token with its expiry pushed out to `lifetime` from now, if
    /// that is later than the current expiry.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateFormat] if the expiry would overflow.
    pub fn extended_to(self, lifetime: Duration) -> Result<Self, Error> {
        let candidate = Self::new(self.user_id, lifetime)?;

        Ok(Self {
            user_id: self.user_id,
            expires_at: self.expires_at.max(candidate.expires_at),
        })
    }
}
