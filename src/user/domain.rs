//! Core user domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash, currency::Currency};

/// The maximum number of characters in a username.
pub const USERNAME_MAX_LENGTH: usize = 80;
/// The maximum number of characters in an email address.
pub const EMAIL_MAX_LENGTH: usize = 120;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated, non-empty username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Username(String);

impl Username {
    /// Create a username from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyUsername] if `name` is blank, or [Error::TooLong]
    /// if it is longer than [USERNAME_MAX_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyUsername)
        } else if name.chars().count() > USERNAME_MAX_LENGTH {
            Err(Error::TooLong {
                field: "Username",
                max: USERNAME_MAX_LENGTH,
            })
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a username without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An email address of the form `name@domain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Email(String);

impl Email {
    /// Create an email address from a string, trimming surrounding whitespace.
    ///
    /// Only a light check is made: the address must contain exactly one '@'
    /// with text on either side.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if the address is malformed, or
    /// [Error::TooLong] if it is longer than [EMAIL_MAX_LENGTH] characters.
    pub fn new(email: &str) -> Result<Self, Error> {
        let email = email.trim();

        if email.chars().count() > EMAIL_MAX_LENGTH {
            return Err(Error::TooLong {
                field: "Email",
                max: EMAIL_MAX_LENGTH,
            });
        }

        match email.split_once('@') {
            Some((name, domain))
                if !name.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(email.to_owned()))
            }
            _ => Err(Error::InvalidEmail(email.to_owned())),
        }
    }

    /// Create an email address without validation.
    pub fn new_unchecked(email: &str) -> Self {
        Self(email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The unique name the user logs in with.
    pub username: Username,
    /// The user's unique email address.
    pub email: Email,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user can manage other users.
    pub is_admin: bool,
    /// The currency amounts are displayed in.
    pub currency: Currency,
    /// The base32 encoded TOTP secret, set once two-factor setup has started.
    pub totp_secret: Option<String>,
    /// Whether a TOTP code is required at log-in.
    pub totp_enabled: bool,
    /// When the user was created.
    pub created_at: OffsetDateTime,
}

/// The data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub is_admin: bool,
}
