//! Core expense domain types.

use time::{Date, OffsetDateTime};

use crate::{
    database_id::{CategoryId, ExpenseId},
    user::UserID,
};

/// The maximum number of characters in an expense description.
pub const EXPENSE_DESCRIPTION_MAX_LENGTH: usize = 200;

/// Money spent on something, filed under one of the user's categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: f64,
    pub date: Date,
    /// Who paid, e.g. a partner's name.
    pub paid_by: Option<String>,
    /// Comma separated labels.
    pub tags: Option<String>,
    /// The stored attachment's file name inside the upload directory.
    pub file_path: Option<String>,
    pub category_id: CategoryId,
    pub user_id: UserID,
    pub created_at: OffsetDateTime,
}

impl Expense {
    /// The individual labels in [Expense::tags], trimmed, skipping empty ones.
    pub fn tag_labels(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }
}

/// The fields of an expense a user can edit, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseFields {
    pub description: String,
    pub amount: f64,
    pub date: Date,
    pub paid_by: Option<String>,
    pub tags: Option<String>,
}

/// The data needed to insert an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    pub date: Date,
    pub paid_by: Option<String>,
    pub tags: Option<String>,
    pub file_path: Option<String>,
    pub category_id: CategoryId,
    pub user_id: UserID,
}

#[cfg(test)]
mod expense_domain_tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{expense::Expense, user::UserID};

    #[test]
    fn tag_labels_are_split_and_trimmed() {
        let expense = Expense {
            id: 1,
            description: "Lunch".to_owned(),
            amount: 10.0,
            date: date!(2024 - 03 - 01),
            paid_by: None,
            tags: Some(" work, food ,, ".to_owned()),
            file_path: None,
            category_id: 1,
            user_id: UserID::new(1),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        assert_eq!(expense.tag_labels(), vec!["work", "food"]);
    }
}
