//! Hex colours used for categories and tags.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The colour given to categories and tags when none is chosen.
pub const DEFAULT_COLOR: &str = "#6366f1";

/// A colour in the form `#rrggbb`, stored in lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexColor(String);

impl HexColor {
    /// Parse a colour string, falling back to [DEFAULT_COLOR] for empty input.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidColor] if `color` is not empty and not of the form `#rrggbb`.
    pub fn new(color: &str) -> Result<Self, Error> {
        let color = color.trim();

        if color.is_empty() {
            return Ok(Self::default());
        }

        let is_valid = color.len() == 7
            && color.starts_with('#')
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());

        if is_valid {
            Ok(Self(color.to_ascii_lowercase()))
        } else {
            Err(Error::InvalidColor(color.to_owned()))
        }
    }

    /// Create a colour without validation.
    ///
    /// The caller should ensure that `color` is of the form `#rrggbb`.
    pub fn new_unchecked(color: &str) -> Self {
        Self(color.to_owned())
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self(DEFAULT_COLOR.to_owned())
    }
}

impl AsRef<str> for HexColor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for HexColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HexColor::new(s)
    }
}

impl Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for HexColor {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for HexColor {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(HexColor::new_unchecked)
    }
}

#[cfg(test)]
mod hex_color_tests {
    use crate::{
        Error,
        color::{DEFAULT_COLOR, HexColor},
    };

    #[test]
    fn empty_string_uses_default() {
        assert_eq!(HexColor::new("  ").unwrap().as_ref(), DEFAULT_COLOR);
    }

    #[test]
    fn accepts_and_lowercases_hex() {
        assert_eq!(HexColor::new("#FF00aa").unwrap().as_ref(), "#ff00aa");
    }

    #[test]
    fn rejects_named_colours() {
        assert_eq!(
            HexColor::new("red"),
            Err(Error::InvalidColor("red".to_owned()))
        );
    }

    #[test]
    fn rejects_short_hex() {
        assert!(HexColor::new("#fff").is_err());
    }
}
