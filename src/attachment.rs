//! Receipt files attached to expenses.
//!
//! Files live in a single upload directory under the name
//! `{user_id}_{YYYYMMDD_HHMMSS}_{sanitised name}`, and the expense row stores
//! that file name.

use std::{
    io::ErrorKind,
    path::{Path as FilePath, PathBuf},
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::{OffsetDateTime, macros::format_description};

use crate::{
    AppState, Error, database_id::ExpenseId, expense::get_expense, user::UserID,
};

/// The file extensions accepted for attachments, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "pdf", "gif"];

/// The lowercase extension of `file_name` if it is one of [ALLOWED_EXTENSIONS].
fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();

    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Whether `file_name` has one of the [ALLOWED_EXTENSIONS].
pub fn is_allowed_file(file_name: &str) -> bool {
    allowed_extension(file_name).is_some()
}

/// Make a client supplied file name safe to use as a path component.
///
/// ASCII letters, digits, '.', '-' and '_' are kept, whitespace becomes '_'
/// and everything else is dropped. Leading dots are stripped.
pub fn sanitize_file_name(file_name: &str) -> String {
    // Browsers on Windows may send the full path.
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized: String = base_name
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    sanitized.trim_start_matches('.').to_owned()
}

/// The name an upload is stored under.
pub fn stored_file_name(user_id: UserID, uploaded_at: OffsetDateTime, file_name: &str) -> String {
    let timestamp = uploaded_at
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|error| {
            tracing::warn!("Could not format upload timestamp: {error}");
            uploaded_at.unix_timestamp().to_string()
        });

    format!("{user_id}_{timestamp}_{}", sanitize_file_name(file_name))
}

/// Write an uploaded file to `upload_dir`.
///
/// Returns the stored file name, or `None` if the file name is empty or does
/// not have an allowed extension, in which case nothing is written.
///
/// # Errors
///
/// Returns [Error::AttachmentError] if the file could not be written.
pub async fn save_attachment(
    upload_dir: &FilePath,
    user_id: UserID,
    file_name: &str,
    data: &[u8],
) -> Result<Option<String>, Error> {
    if file_name.is_empty() {
        return Ok(None);
    }

    if !is_allowed_file(file_name) || sanitize_file_name(file_name).is_empty() {
        tracing::info!("Ignoring attachment \"{file_name}\" with an unsupported file type");
        return Ok(None);
    }

    let stored_name = stored_file_name(user_id, OffsetDateTime::now_utc(), file_name);

    let stored_path = upload_dir.join(&stored_name);
    let write = async {
        tokio::fs::create_dir_all(upload_dir).await?;
        tokio::fs::write(&stored_path, data).await
    };

    write.await.map_err(|error| {
        tracing::error!("Could not save attachment {stored_name}: {error}");
        Error::AttachmentError(error.to_string())
    })?;

    tracing::debug!("Saved attachment {stored_name} ({} bytes)", data.len());

    Ok(Some(stored_name))
}

/// Remove an attachment file. A file that is already gone is not an error,
/// other failures are logged.
pub fn delete_attachment(upload_dir: &FilePath, file_name: &str) {
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        tracing::warn!("Refusing to delete attachment with unexpected name \"{file_name}\"");
        return;
    }

    match std::fs::remove_file(upload_dir.join(file_name)) {
        Ok(()) => tracing::debug!("Deleted attachment {file_name}"),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!("Attachment {file_name} was already deleted");
        }
        Err(error) => tracing::error!("Could not delete attachment {file_name}: {error}"),
    }
}

/// Remove several attachment files, see [delete_attachment].
pub fn delete_attachments(upload_dir: &FilePath, file_names: &[String]) {
    for file_name in file_names {
        delete_attachment(upload_dir, file_name);
    }
}

fn content_type(file_name: &str) -> &'static str {
    match allowed_extension(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// The state needed to serve attachments.
#[derive(Debug, Clone)]
pub struct AttachmentState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for AttachmentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

async fn serve_attachment(
    state: AttachmentState,
    expense_id: ExpenseId,
    user_id: UserID,
    as_download: bool,
) -> Result<Response, Error> {
    let file_name = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_expense(expense_id, user_id, &connection)?
            .file_path
            .ok_or(Error::NotFound)?
    };

    let data = match tokio::fs::read(state.upload_dir.join(&file_name)).await {
        Ok(data) => data,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::warn!("Attachment {file_name} of expense {expense_id} is missing");
            return Err(Error::NotFound);
        }
        Err(error) => {
            tracing::error!("Could not read attachment {file_name}: {error}");
            return Err(Error::AttachmentError(error.to_string()));
        }
    };

    let disposition = if as_download { "attachment" } else { "inline" };

    Ok((
        [
            (CONTENT_TYPE, content_type(&file_name).to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{file_name}\""),
            ),
        ],
        data,
    )
        .into_response())
}

/// Show an expense's attachment in the browser.
pub async fn get_attachment(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<AttachmentState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    serve_attachment(state, expense_id, user_id, false).await
}

/// Download an expense's attachment.
pub async fn download_attachment(
    Path(expense_id): Path<ExpenseId>,
    State(state): State<AttachmentState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    serve_attachment(state, expense_id, user_id, true).await
}
