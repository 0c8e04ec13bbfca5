//! The endpoint URIs for pages and the HTMX API.
//!
//! For endpoints that take a parameter, e.g., '/tags/{tag_id}/edit', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for logging out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page listing the expenses in a category.
pub const CATEGORY_VIEW: &str = "/categories/{category_id}";
/// The page for editing a category.
pub const EDIT_CATEGORY_VIEW: &str = "/categories/{category_id}/edit";
/// The page for adding an expense to a category.
pub const NEW_EXPENSE_VIEW: &str = "/categories/{category_id}/expenses/new";
/// The page for editing an expense.
pub const EDIT_EXPENSE_VIEW: &str = "/expenses/{expense_id}/edit";
/// Serves an expense's attachment inline.
pub const EXPENSE_ATTACHMENT: &str = "/expenses/{expense_id}/attachment";
/// Serves an expense's attachment as a download.
pub const EXPENSE_ATTACHMENT_DOWNLOAD: &str = "/expenses/{expense_id}/attachment/download";
/// The page for creating a new tag.
pub const NEW_TAG_VIEW: &str = "/tags/new";
/// The page for editing an existing tag.
pub const EDIT_TAG_VIEW: &str = "/tags/{tag_id}/edit";
/// The settings overview page.
pub const SETTINGS_VIEW: &str = "/settings";
/// The page for editing the current user's profile.
pub const PROFILE_VIEW: &str = "/settings/profile";
/// The page for setting up two-factor authentication.
pub const TWO_FACTOR_VIEW: &str = "/settings/two_factor";
/// The admin page for creating a user.
pub const NEW_USER_VIEW: &str = "/settings/users/new";
/// The admin page for editing a user.
pub const EDIT_USER_VIEW: &str = "/settings/users/{user_id}/edit";
/// The page for importing expenses from a CSV file.
pub const IMPORT_VIEW: &str = "/import";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for completing a log in with a two-factor code.
pub const LOG_IN_TWO_FACTOR_API: &str = "/api/log_in/two_factor";
/// The route for registering a user.
pub const USERS: &str = "/api/users";
/// The route for the JSON chart metrics.
pub const METRICS_API: &str = "/api/metrics";
/// The route to create a category.
pub const POST_CATEGORY: &str = "/api/categories";
/// The route to update a category.
pub const PUT_CATEGORY: &str = "/api/categories/{category_id}";
/// The route to delete a category.
pub const DELETE_CATEGORY: &str = "/api/categories/{category_id}";
/// The route to create an expense in a category.
pub const POST_EXPENSE: &str = "/api/categories/{category_id}/expenses";
/// The route to update an expense.
pub const PUT_EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route to delete an expense.
pub const DELETE_EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route to create a tag.
pub const POST_TAG: &str = "/api/tags";
/// The route to update a tag.
pub const PUT_TAG: &str = "/api/tags/{tag_id}";
/// The route to delete a tag.
pub const DELETE_TAG: &str = "/api/tags/{tag_id}";
/// The route to update the current user's profile.
pub const PUT_PROFILE: &str = "/api/profile";
/// The admin route to create a user.
pub const POST_USER_ADMIN: &str = "/api/admin/users";
/// The admin route to update a user.
pub const PUT_USER_ADMIN: &str = "/api/admin/users/{user_id}";
/// The admin route to delete a user.
pub const DELETE_USER_ADMIN: &str = "/api/admin/users/{user_id}";
/// The route to turn on two-factor authentication.
pub const ENABLE_TWO_FACTOR: &str = "/api/two_factor/enable";
/// The route to turn off two-factor authentication.
pub const DISABLE_TWO_FACTOR: &str = "/api/two_factor/disable";
/// The route to download the user's expenses as CSV.
pub const EXPORT: &str = "/api/export";
/// The route to upload a CSV file of expenses.
pub const IMPORT: &str = "/api/import";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/tags/{tag_id}', '{tag_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
