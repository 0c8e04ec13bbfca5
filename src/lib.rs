//! Fina is a web app for tracking personal expenses.
//!
//! Users organise expenses into categories, attach receipts, view monthly
//! and yearly charts of their spending, and import or export their data as
//! CSV. The library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod attachment;
mod auth;
mod category;
mod color;
mod csv_export;
mod csv_import;
mod currency;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod expense;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod security_headers;
mod settings;
mod tag;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use user::{User, UserID, Username, get_user_by_username, update_password};

use crate::{
    alert::Alert,
    html::error_view,
    internal_server_error::get_internal_server_error_response,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The auth token is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token in the cookie could not be parsed or has expired.
    #[error("the auth token is invalid or has expired")]
    InvalidToken,

    /// There was an error creating or formatting the expiry date time of a cookie.
    #[error("could not create the cookie expiry date-time: {0}")]
    InvalidDateFormat(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty or whitespace-only username was given.
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// The email address is not of the form `name@domain`.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// A text field exceeded its maximum length.
    #[error("{field} must be at most {max} characters long")]
    TooLong {
        /// The human readable name of the field.
        field: &'static str,
        /// The maximum number of characters.
        max: usize,
    },

    /// The username is already taken by another user.
    #[error("Username already exists")]
    DuplicateUsername,

    /// The email address is already used by another user.
    #[error("Email already exists")]
    DuplicateEmail,

    /// The currency code is not one of the supported currencies.
    #[error("unsupported currency \"{0}\"")]
    InvalidCurrency(String),

    /// A colour string was not of the form `#rrggbb`.
    #[error("\"{0}\" is not a valid colour, expected a hex colour like #6366f1")]
    InvalidColor(String),

    /// An empty string was used to create a tag name.
    #[error("Tag name cannot be empty")]
    EmptyTagName,

    /// The user already has a tag with the same name.
    #[error("A tag with this name already exists")]
    DuplicateTagName,

    /// An empty string was used to create a category name.
    #[error("Category name is required")]
    EmptyCategoryName,

    /// An empty string was used as an expense description.
    #[error("Description and amount are required")]
    EmptyDescription,

    /// The expense amount was missing, not a number, or not greater than zero.
    #[error("Please enter a valid amount")]
    InvalidAmount,

    /// A date string could not be parsed as `YYYY-MM-DD`.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a file.
    #[error("No file selected")]
    NoFileSelected,

    /// The uploaded file does not have a `.csv` extension.
    #[error("Only CSV files are supported")]
    NotCSV,

    /// The CSV had issues that prevented it from being imported.
    #[error("{0}")]
    InvalidCSV(String),

    /// An attachment could not be written to, or read from, disk.
    #[error("attachment storage error: {0}")]
    AttachmentError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created and
    /// belongs to the user.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A non-admin user tried to access an admin-only route.
    #[error("admin access required")]
    AdminRequired,

    /// An admin tried to delete their own account.
    #[error("cannot delete your own account")]
    CannotDeleteSelf,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON or CSV.
    #[error("could not serialize data: {0}")]
    SerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update an expense that does not exist
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to update a tag that does not exist
    #[error("tried to update a tag that is not in the database")]
    UpdateMissingTag,

    /// Tried to delete a tag that does not exist
    #[error("tried to delete a tag that is not in the database")]
    DeleteMissingTag,

    /// Tried to update a user that does not exist
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist
    #[error("tried to delete a user that is not in the database")]
    DeleteMissingUser,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("tag.name") =>
            {
                Error::DuplicateTagName
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::AdminRequired => (
                StatusCode::FORBIDDEN,
                Html(
                    error_view(
                        "Forbidden",
                        "403",
                        "Admin access required",
                        "Ask an administrator to perform this action for you.",
                    )
                    .into_string(),
                ),
            )
                .into_response(),
            Error::DatabaseLockError => get_internal_server_error_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                get_internal_server_error_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for HTMX requests.
    fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "The requested item could not be found. \
                        Try refreshing the page to see if it has been deleted."
                        .to_owned(),
                },
            ),
            Error::AdminRequired => (
                StatusCode::FORBIDDEN,
                Alert::ErrorSimple {
                    message: "Admin access required".to_owned(),
                },
            ),
            Error::CannotDeleteSelf => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Cannot delete your own account".to_owned(),
                },
            ),
            Error::UpdateMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update category".to_owned(),
                    details: "The category could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete category".to_owned(),
                    details: "The category could not be found. \
                        Try refreshing the page to see if the category has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingExpense => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update expense".to_owned(),
                    details: "The expense could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingExpense => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete expense".to_owned(),
                    details: "The expense could not be found. \
                        Try refreshing the page to see if the expense has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingTag => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update tag".to_owned(),
                    details: "The tag could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingTag => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete tag".to_owned(),
                    details: "The tag could not be found. \
                        Try refreshing the page to see if the tag has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingUser => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update user".to_owned(),
                    details: "The user could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingUser => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete user".to_owned(),
                    details: "The user could not be found. \
                        Try refreshing the page to see if the user has already been deleted."
                        .to_owned(),
                },
            ),
            Error::NoFileSelected => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "No file selected".to_owned(),
                },
            ),
            Error::NotCSV => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Only CSV files are supported".to_owned(),
                },
            ),
            Error::InvalidCSV(details) => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: format!("Import failed: {details}"),
                },
            ),
            Error::MultipartError(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not read the submitted form".to_owned(),
                    details,
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details: "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
