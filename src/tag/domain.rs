//! Core tag domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, color::HexColor, user::UserID};

/// The maximum number of characters in a tag name.
pub const TAG_NAME_MAX_LENGTH: usize = 50;

/// A validated, non-empty tag name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TagName(String);

impl TagName {
    /// Create a tag name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyTagName] if `name` is blank,
    /// or [Error::TooLong] if it is longer than [TAG_NAME_MAX_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyTagName)
        } else if name.chars().count() > TAG_NAME_MAX_LENGTH {
            Err(Error::TooLong {
                field: "Tag name",
                max: TAG_NAME_MAX_LENGTH,
            })
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a tag name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a tag.
pub type TagId = i64;

/// A coloured label, e.g. 'Groceries', offered as a suggestion when tagging expenses.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: TagId,
    pub name: TagName,
    pub color: HexColor,
    pub user_id: UserID,
    pub created_at: OffsetDateTime,
}

/// Form data for tag creation and editing.
#[derive(Debug, Serialize, Deserialize)]
pub struct TagFormData {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[cfg(test)]
mod tag_name_tests {
    use crate::{
        Error,
        tag::{TagName, domain::TAG_NAME_MAX_LENGTH},
    };

    #[test]
    fn name_is_trimmed() {
        assert_eq!(TagName::new(" Rent ").unwrap().as_ref(), "Rent");
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(TagName::new("   "), Err(Error::EmptyTagName));
    }

    #[test]
    fn long_name_is_rejected() {
        let name = "x".repeat(TAG_NAME_MAX_LENGTH + 1);

        assert_eq!(
            TagName::new(&name),
            Err(Error::TooLong {
                field: "Tag name",
                max: TAG_NAME_MAX_LENGTH
            })
        );
    }
}
