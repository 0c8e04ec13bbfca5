//! Core category domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, color::HexColor, database_id::CategoryId, user::UserID};

/// The maximum number of characters in a category name.
pub const CATEGORY_NAME_MAX_LENGTH: usize = 100;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyCategoryName] if `name` is blank, or
    /// [Error::TooLong] if it is longer than [CATEGORY_NAME_MAX_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else if name.chars().count() > CATEGORY_NAME_MAX_LENGTH {
            Err(Error::TooLong {
                field: "Category name",
                max: CATEGORY_NAME_MAX_LENGTH,
            })
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named group of a user's expenses, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    pub description: Option<String>,
    pub color: HexColor,
    pub user_id: UserID,
    pub created_at: OffsetDateTime,
}

/// The data needed to insert a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: CategoryName,
    pub description: Option<String>,
    pub color: HexColor,
    pub user_id: UserID,
}

/// Form data for category creation and editing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryFormData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

/// A validated category form.
pub(crate) struct CategoryFields {
    pub name: CategoryName,
    pub description: Option<String>,
    pub color: HexColor,
}

impl CategoryFormData {
    /// Check the name and colour. A blank description becomes `None`.
    pub(crate) fn validate(&self) -> Result<CategoryFields, Error> {
        let name = CategoryName::new(&self.name)?;
        let color = HexColor::new(&self.color)?;
        let description = self.description.trim();
        let description = (!description.is_empty()).then(|| description.to_owned());

        Ok(CategoryFields {
            name,
            description,
            color,
        })
    }
}
