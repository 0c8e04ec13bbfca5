//! Category deletion endpoint.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error, attachment::delete_attachments, category::delete_category,
    database_id::CategoryId, endpoints, expense::get_file_paths_for_category, user::UserID,
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// Delete a category, its expenses and their attachments, then redirect to
/// the dashboard.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let file_paths = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        let result = get_file_paths_for_category(category_id, user_id, &connection)
            .and_then(|file_paths| {
                delete_category(category_id, user_id, &connection).map(|_| file_paths)
            });

        match result {
            Ok(file_paths) => file_paths,
            Err(Error::DeleteMissingCategory) => {
                return Error::DeleteMissingCategory.into_alert_response();
            }
            Err(error) => {
                tracing::error!(
                    "An unexpected error occurred while deleting category {category_id}: {error}"
                );
                return error.into_alert_response();
            }
        }
    };

    delete_attachments(&state.upload_dir, &file_paths);
    tracing::info!(
        "User {user_id} deleted category {category_id} and {} attachment(s)",
        file_paths.len()
    );

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
