//! The state shared by every route handler.
//!
//! Handlers do not take [AppState] directly, they take a smaller state struct
//! with only the fields they need, built with [FromRef].

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, auth::DEFAULT_COOKIE_DURATION, db::initialize};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Signs and encrypts the private auth cookies.
    pub cookie_key: Key,

    /// How long an auth cookie lasts without activity.
    pub cookie_duration: Duration,

    /// The canonical name of the server's timezone, e.g. "Europe/Bucharest".
    /// Used for "today" when an expense has no date and for the current year
    /// on the dashboard.
    pub local_timezone: String,

    /// The one connection to the application database.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Where expense attachments are stored.
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Set up the database tables and the upload directory and derive the
    /// cookie key from `cookie_secret`.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the database cannot be initialized, or
    /// an [Error::AttachmentError] if `upload_dir` cannot be created.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        upload_dir: PathBuf,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        std::fs::create_dir_all(&upload_dir).map_err(|error| {
            Error::AttachmentError(format!(
                "could not create the upload directory {upload_dir:?}: {error}"
            ))
        })?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
            upload_dir,
        })
    }
}

// Lets `PrivateCookieJar` find the key in the app state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive a cookie key from `secret` by hashing it with SHA-512, which gives
/// the 64 bytes [Key] needs for any length of secret.
pub fn create_cookie_key(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret))
}

#[cfg(test)]
mod app_state_tests {
    use rusqlite::Connection;

    use crate::{AppState, Error};

    use super::create_cookie_key;

    #[test]
    fn same_secret_gives_same_key() {
        assert_eq!(
            create_cookie_key("foobar").master(),
            create_cookie_key("foobar").master()
        );
        assert_ne!(
            create_cookie_key("foobar").master(),
            create_cookie_key("barfoo").master()
        );
    }

    #[test]
    fn new_creates_upload_dir_and_tables() {
        let upload_dir = std::env::temp_dir().join(format!(
            "fina-app-state-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&upload_dir);

        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "foobar",
            "Etc/UTC",
            upload_dir.clone(),
        )
        .unwrap();

        assert!(upload_dir.is_dir());
        let table_count: i64 = state
            .db_connection
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 1);
    }

    #[test]
    fn new_fails_when_upload_dir_is_a_file() {
        let file_path = std::env::temp_dir().join(format!(
            "fina-app-state-file-{}",
            std::process::id()
        ));
        std::fs::write(&file_path, b"not a directory").unwrap();

        let result = AppState::new(
            Connection::open_in_memory().unwrap(),
            "foobar",
            "Etc/UTC",
            file_path,
        );

        assert!(matches!(result, Err(Error::AttachmentError(_))));
    }
}
