//! The page shown when something goes wrong on the server.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// A 500 page that tells the user to try again later.
pub fn get_internal_server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(
            error_view(
                "Internal Server Error",
                "500",
                "Sorry, something went wrong.",
                "Try again later or check the server logs.",
            )
            .into_string(),
        ),
    )
        .into_response()
}

/// Route handler for the error page that HTMX requests are redirected to.
pub async fn get_internal_server_error_page() -> Response {
    get_internal_server_error_response()
}
