use std::path::PathBuf;

use axum_extra::extract::cookie::Key;
use rand::Rng;
use rusqlite::Connection;

use crate::{
    PasswordHash,
    app_state::create_cookie_key,
    db::initialize,
    user::{Email, NewUser, User, Username, create_user},
};

/// The password of users made with [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "correct horse battery staple";

/// An in-memory database with all the tables created.
pub(crate) fn get_test_db_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user called `username` with the email `{username}@example.com`
/// and the password [TEST_PASSWORD].
#[track_caller]
pub(crate) fn create_test_user(username: &str, connection: &Connection) -> User {
    // The minimum bcrypt cost keeps the tests fast.
    let password_hash =
        PasswordHash::from_raw_password(TEST_PASSWORD, 4).expect("Could not hash password");

    create_user(
        NewUser {
            username: Username::new_unchecked(username),
            email: Email::new_unchecked(&format!("{username}@example.com")),
            password_hash,
            is_admin: false,
        },
        connection,
    )
    .expect("Could not create test user")
}

pub(crate) fn get_test_cookie_key() -> Key {
    create_cookie_key("nafstenoas")
}

/// A new, empty directory for saving attachments.
pub(crate) fn get_test_upload_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "fina-test-uploads-{}",
        rand::thread_rng().r#gen::<u64>()
    ));
    std::fs::create_dir_all(&dir).expect("Could not create test upload directory");

    dir
}
