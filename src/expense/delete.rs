//! Expense deletion endpoint.

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
    AppState, Error,
    attachment::delete_attachment,
    database_id::ExpenseId,
    endpoints::{self, format_endpoint},
    expense::{delete_expense, get_expense},
    user::UserID,
};

/// The state needed for deleting an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// Delete an expense and its attachment, then redirect to its category.
pub async fn delete_expense_endpoint(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<DeleteExpenseState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let expense = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        let result = get_expense(expense_id, user_id, &connection)
            .map_err(|error| match error {
                Error::NotFound => Error::DeleteMissingExpense,
                error => error,
            })
            .and_then(|expense| {
                delete_expense(expense_id, user_id, &connection).map(|_| expense)
            });

        match result {
            Ok(expense) => expense,
            Err(Error::DeleteMissingExpense) => {
                return Error::DeleteMissingExpense.into_alert_response();
            }
            Err(error) => {
                tracing::error!(
                    "An unexpected error occurred while deleting expense {expense_id}: {error}"
                );
                return error.into_alert_response();
            }
        }
    };

    if let Some(file_path) = &expense.file_path {
        delete_attachment(&state.upload_dir, file_path);
    }

    (
        HxRedirect(format_endpoint(endpoints::CATEGORY_VIEW, expense.category_id)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
