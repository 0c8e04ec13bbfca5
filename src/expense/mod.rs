//! Expenses belong to one of a user's categories and may have a receipt attached.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod form;

pub use create::{create_expense_endpoint, get_new_expense_page};
pub use db::{
    create_expense, create_expense_table, delete_expense, get_expense, get_expenses_for_category,
    get_file_paths_for_category, get_file_paths_for_user, update_expense,
};
pub(crate) use db::map_row;
pub use delete::delete_expense_endpoint;
pub use domain::{EXPENSE_DESCRIPTION_MAX_LENGTH, Expense, ExpenseFields, NewExpense};
pub use edit::{get_edit_expense_page, update_expense_endpoint};
pub(crate) use form::parse_date;
