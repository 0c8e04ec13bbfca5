use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    category::{CategoryName, get_or_create_category_by_name},
    endpoints,
    expense::{NewExpense, create_expense, parse_date},
    html::link,
    timezone::local_today,
    user::UserID,
};

/// The state needed for importing expenses.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone, used for the date of rows without one.
    pub local_timezone: String,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// One row of an imported CSV file, matched to the columns by header name.
#[derive(Debug, Deserialize)]
struct ExpenseRecord {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Amount", default)]
    amount: Option<f64>,
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Paid By", default)]
    paid_by: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Option<String>,
}

/// Route handler for importing expenses from a CSV file.
///
/// The file is read from the multipart field `file`. All rows are imported
/// in one database transaction, so any invalid row leaves the database unchanged.
pub async fn import_expenses(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
    multipart: Multipart,
) -> Response {
    let start_time = std::time::Instant::now();

    let csv_data = match read_csv_field(multipart).await {
        Ok(csv_data) => csv_data,
        Err(error) => return error.into_alert_response(),
    };
    let today = local_today(&state.local_timezone);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = connection
        .unchecked_transaction()
        .map_err(Error::from)
        .and_then(|tx| {
            let imported = import_csv(&csv_data, user_id, today, &tx)?;
            tx.commit()?;
            Ok(imported)
        });

    match result {
        Ok(imported) => {
            tracing::info!(
                "Imported {imported} expenses for user {user_id} in {}ms",
                start_time.elapsed().as_millis()
            );

            (
                StatusCode::CREATED,
                html! {
                    p id="import-success" class="font-medium text-green-700 dark:text-green-400"
                    {
                        "Successfully imported " (imported) " expenses!"
                    }
                    p { (link(endpoints::DASHBOARD_VIEW, "Go to the dashboard")) }
                },
            )
                .into_response()
        }
        Err(error) => {
            tracing::debug!("Import failed for user {user_id}: {error}");
            Error::InvalidCSV(error.to_string()).into_alert_response()
        }
    }
}

/// Read the text of the uploaded CSV file.
///
/// # Errors
///
/// - [Error::NoFileSelected] if there is no `file` field or it has no file name.
/// - [Error::NotCSV] if the file name does not end with `.csv`.
async fn read_csv_field(mut multipart: Multipart) -> Result<String, Error> {
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::error!("Could not read multipart field: {error}");
        Error::MultipartError(error.body_text())
    })? {
        if field.name() == Some("file") {
            return read_csv_file(field).await;
        }
    }

    Err(Error::NoFileSelected)
}

async fn read_csv_file(field: Field<'_>) -> Result<String, Error> {
    let file_name = field.file_name().unwrap_or_default().trim().to_owned();

    if file_name.is_empty() {
        return Err(Error::NoFileSelected);
    }

    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(Error::NotCSV);
    }

    field.text().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })
}

/// Insert an expense for every row of `csv_data` and return how many were inserted.
///
/// Categories are looked up by exact name and created when the user has none
/// with that name. A missing amount is stored as zero and a blank date as `today`.
fn import_csv(
    csv_data: &str,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());
    let mut imported = 0;

    for record in reader.deserialize::<ExpenseRecord>() {
        let record = record.map_err(|error| Error::InvalidCSV(error.to_string()))?;
        let row_number = imported + 1;

        let category_name = CategoryName::new(&record.category)
            .map_err(|error| Error::InvalidCSV(format!("row {row_number}: {error}")))?;
        let date = parse_date(&record.date, today)
            .map_err(|error| Error::InvalidCSV(format!("row {row_number}: {error}")))?;
        let category = get_or_create_category_by_name(&category_name, user_id, connection)?;

        create_expense(
            NewExpense {
                description: record.description,
                amount: record.amount.unwrap_or(0.0),
                date,
                paid_by: record.paid_by.filter(|paid_by| !paid_by.is_empty()),
                tags: record.tags.filter(|tags| !tags.is_empty()),
                file_path: None,
                category_id: category.id,
                user_id,
            },
            connection,
        )?;

        imported += 1;
    }

    Ok(imported)
}
