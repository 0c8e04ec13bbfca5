//! Download all of a user's expenses as a CSV file.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::macros::format_description;

use crate::{
    AppState, Error,
    expense::{Expense, map_row},
    timezone::local_today,
    user::UserID,
};

/// The header row of exported files, also the columns read by the importer.
pub const CSV_HEADER: [&str; 6] = ["Category", "Description", "Amount", "Date", "Paid By", "Tags"];

/// The state needed for exporting expenses.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Route handler that sends the user's expenses as `expenses_YYYYMMDD.csv`.
pub async fn export_expenses(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let expenses = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_expenses_with_category_names(user_id, &connection)?
    };

    let data = write_csv(&expenses)?;
    let date = local_today(&state.local_timezone)
        .format(format_description!("[year][month][day]"))
        .map_err(|error| Error::InvalidDateFormat(error.to_string()))?;

    tracing::debug!("Exporting {} expenses for user {user_id}", expenses.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"expenses_{date}.csv\""),
            ),
        ],
        data,
    )
        .into_response())
}

/// Every expense of the user paired with the name of its category, oldest first.
fn get_expenses_with_category_names(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<(String, Expense)>, Error> {
    connection
        .prepare(
            "SELECT e.id, e.description, e.amount, e.date, e.paid_by, e.tags, e.file_path,
                e.category_id, e.user_id, e.created_at, c.name
            FROM expense e
            INNER JOIN category c ON c.id = e.category_id
            WHERE e.user_id = ?1
            ORDER BY e.date ASC, e.id ASC",
        )?
        .query_map([user_id.as_i64()], |row| Ok((row.get(10)?, map_row(row)?)))?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

fn write_csv(expenses: &[(String, Expense)]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|error| Error::SerializationError(error.to_string()))?;

    for (category_name, expense) in expenses {
        let amount = expense.amount.to_string();
        let date = expense.date.to_string();
        let record: [&str; 6] = [
            category_name,
            &expense.description,
            &amount,
            &date,
            expense.paid_by.as_deref().unwrap_or_default(),
            expense.tags.as_deref().unwrap_or_default(),
        ];

        writer
            .write_record(record)
            .map_err(|error| Error::SerializationError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::SerializationError(error.to_string()))
}
