//! Categories group a user's expenses, e.g. "Groceries" or "Rent".

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod view;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    create_category, create_category_table, delete_category, get_all_categories, get_category,
    get_or_create_category_by_name, update_category,
};
pub(crate) use db::map_row as map_category_row;
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryFormData, CategoryName, NewCategory};
pub use edit::{get_edit_category_page, update_category_endpoint};
pub use view::get_category_page;
