//! Importing expenses from CSV files.

mod import_expenses;
mod import_page;

pub use import_expenses::import_expenses;
pub use import_page::get_import_page;
