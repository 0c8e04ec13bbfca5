//! Dashboard module
//!
//! Provides an overview page with spending totals per category and charts
//! that can be filtered by year and category.

mod aggregation;
mod charts;
mod handlers;

pub use handlers::{get_dashboard_page, get_index_page, get_metrics};
