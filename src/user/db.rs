//! Code for creating the user table and reading and writing users.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, PasswordHash,
    currency::Currency,
    user::{
        User, UserID,
        domain::{Email, NewUser, Username},
    },
};

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'USD',
                totp_secret TEXT,
                totp_enabled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const SELECT_USER: &str = "SELECT id, username, email, password, is_admin, currency, \
    totp_secret, totp_enabled, created_at FROM user";

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateUsername] or [Error::DuplicateEmail] if another user has the same username or email,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO user (username, email, password, is_admin, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            new_user.username.as_ref(),
            new_user.email.as_ref(),
            new_user.password_hash.as_ref(),
            new_user.is_admin,
            created_at,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        is_admin: new_user.is_admin,
        currency: Currency::default(),
        totp_secret: None,
        totp_enabled: false,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user with the exact username `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE username = :username"))?
        .query_row(&[(":username", &username.trim())], map_row)
        .map_err(|error| error.into())
}

/// Get all users ordered by username.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("{SELECT_USER} ORDER BY username ASC"))?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Update the fields a user may change about themselves.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist, or
/// [Error::DuplicateUsername]/[Error::DuplicateEmail] if the new values are taken.
pub fn update_profile(
    user_id: UserID,
    username: &Username,
    email: &Email,
    currency: Currency,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET username = ?1, email = ?2, currency = ?3 WHERE id = ?4",
        (username.as_ref(), email.as_ref(), currency, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Update the fields an admin may change about any user.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist, or
/// [Error::DuplicateUsername]/[Error::DuplicateEmail] if the new values are taken.
pub fn update_user_details(
    user_id: UserID,
    username: &Username,
    email: &Email,
    is_admin: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET username = ?1, email = ?2, is_admin = ?3 WHERE id = ?4",
        (username.as_ref(), email.as_ref(), is_admin, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Replace a user's password hash.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Set the user's TOTP secret and whether two-factor log-in is required.
///
/// Passing `None` for `secret` clears the secret.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist.
pub fn update_two_factor(
    user_id: UserID,
    secret: Option<&str>,
    enabled: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET totp_secret = ?1, totp_enabled = ?2 WHERE id = ?3",
        (secret, enabled, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete a user. Their categories, expenses and tags are removed by cascade.
///
/// # Errors
///
/// Returns [Error::DeleteMissingUser] if the user does not exist.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingUser);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_username: String = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: Username::new_unchecked(&raw_username),
        email: Email::new_unchecked(&raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_admin: row.get(4)?,
        currency: row.get(5)?,
        totp_secret: row.get(6)?,
        totp_enabled: row.get(7)?,
        created_at: row.get(8)?,
    })
}
