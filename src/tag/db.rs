//! Database operations for tags.
//!
//! Every query is scoped to the owning user, so a tag ID belonging to
//! someone else behaves exactly like a missing tag.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    color::HexColor,
    tag::{Tag, TagId, TagName},
    user::UserID,
};

/// Create a tag and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateTagName] if the user already has a tag called `name`.
pub fn create_tag(
    name: TagName,
    color: HexColor,
    user_id: UserID,
    connection: &Connection,
) -> Result<Tag, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO tag (name, color, user_id, created_at) VALUES (?1, ?2, ?3, ?4);",
        (name.as_ref(), &color, user_id.as_i64(), created_at),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Tag {
        id,
        name,
        color,
        user_id,
        created_at,
    })
}

/// Retrieve a single tag owned by `user_id`.
pub fn get_tag(tag_id: TagId, user_id: UserID, connection: &Connection) -> Result<Tag, Error> {
    connection
        .prepare(
            "SELECT id, name, color, user_id, created_at FROM tag
            WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &tag_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's tags ordered alphabetically by name.
pub fn get_all_tags(user_id: UserID, connection: &Connection) -> Result<Vec<Tag>, Error> {
    connection
        .prepare(
            "SELECT id, name, color, user_id, created_at FROM tag
            WHERE user_id = :user_id ORDER BY name ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Rename and recolour a tag.
///
/// # Errors
///
/// Returns [Error::UpdateMissingTag] if the user has no tag with `tag_id`, or
/// [Error::DuplicateTagName] if the new name is taken by another of their tags.
pub fn update_tag(
    tag_id: TagId,
    user_id: UserID,
    new_name: TagName,
    new_color: HexColor,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE tag SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4",
        (new_name.as_ref(), &new_color, tag_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTag);
    }

    Ok(())
}

/// Delete a tag by ID. Returns an error if the user has no such tag.
pub fn delete_tag(tag_id: TagId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM tag WHERE id = ?1 AND user_id = ?2",
        (tag_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTag);
    }

    Ok(())
}

/// Initialize the tag table and indexes.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '#6366f1',
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tag_user_id ON tag(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = TagName::new_unchecked(&raw_name);

    Ok(Tag {
        id,
        name,
        color: row.get(2)?,
        user_id: UserID::new(row.get(3)?),
        created_at: row.get(4)?,
    })
}
