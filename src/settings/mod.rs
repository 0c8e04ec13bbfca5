//! The settings pages: the overview and two-factor authentication setup.

mod page;
mod two_factor;

pub use page::get_settings_page;
pub use two_factor::{disable_two_factor_endpoint, enable_two_factor_endpoint, get_two_factor_page};
