//! Coloured tags that users can label their expenses with.

mod create;
mod db;
mod delete;
mod domain;
mod edit;

pub use create::{create_tag_endpoint, get_new_tag_page};
pub use db::{create_tag, create_tag_table, get_all_tags, get_tag, update_tag};
pub use delete::delete_tag_endpoint;
pub use domain::{Tag, TagId, TagName};
pub use edit::{get_edit_tag_page, update_tag_endpoint};
