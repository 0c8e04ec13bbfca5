//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryName, NewCategory},
    color::HexColor,
    database_id::CategoryId,
    user::UserID,
};

/// Initialize the category table.
///
/// `UNIQUE(id, user_id)` lets expenses reference a category together with
/// its owner.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            color TEXT NOT NULL DEFAULT '#6366f1',
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(id, user_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);",
    )?;

    Ok(())
}

const SELECT_CATEGORY: &str =
    "SELECT id, name, description, color, user_id, created_at FROM category";

/// Create a category and return it with its generated ID.
pub fn create_category(
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO category (name, description, color, user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            new_category.name.as_ref(),
            &new_category.description,
            &new_category.color,
            new_category.user_id.as_i64(),
            created_at,
        ),
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: new_category.name,
        description: new_category.description,
        color: new_category.color,
        user_id: new_category.user_id,
        created_at,
    })
}

/// Retrieve a category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered by name.
pub fn get_all_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE user_id = :user_id ORDER BY name ASC, id ASC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Find the user's category called exactly `name`, creating it if there is none.
pub fn get_or_create_category_by_name(
    name: &CategoryName,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let existing = connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE name = ?1 AND user_id = ?2 ORDER BY id ASC LIMIT 1"
        ))?
        .query_row((name.as_ref(), user_id.as_i64()), map_row)
        .optional()?;

    match existing {
        Some(category) => Ok(category),
        None => create_category(
            NewCategory {
                name: name.clone(),
                description: None,
                color: HexColor::default(),
                user_id,
            },
            connection,
        ),
    }
}

/// Update a category's name, description and colour.
///
/// # Errors
///
/// Returns [Error::UpdateMissingCategory] if the user has no such category.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserID,
    name: &CategoryName,
    description: Option<&str>,
    color: &HexColor,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1, description = ?2, color = ?3
        WHERE id = ?4 AND user_id = ?5",
        (
            name.as_ref(),
            description,
            color,
            category_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category. Its expenses are removed by cascade.
///
/// # Errors
///
/// Returns [Error::DeleteMissingCategory] if the user has no such category.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

pub(crate) fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        description: row.get(2)?,
        color: row.get(3)?,
        user_id: UserID::new(row.get(4)?),
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            Category, CategoryName, NewCategory, create_category, delete_category,
            get_all_categories, get_category, get_or_create_category_by_name, update_category,
        },
        color::HexColor,
        test_utils::{create_test_user, get_test_db_connection},
        user::UserID,
    };

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = get_test_db_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);

        (connection, alice.id, bob.id)
    }

    fn create(name: &str, user_id: UserID, connection: &Connection) -> Category {
        create_category(
            NewCategory {
                name: CategoryName::new_unchecked(name),
                description: Some("Things to eat".to_owned()),
                color: HexColor::default(),
                user_id,
            },
            connection,
        )
        .expect("Could not create category")
    }

    #[test]
    fn create_and_get_category() {
        let (connection, alice, _) = get_test_connection();
        let category = create("Food", alice, &connection);

        let got = get_category(category.id, alice, &connection).unwrap();

        assert_eq!(got.name.as_ref(), "Food");
        assert_eq!(got.description.as_deref(), Some("Things to eat"));
        assert_eq!(got.color, HexColor::default());
        assert_eq!(got.user_id, alice);
    }

    #[test]
    fn get_category_of_other_user_is_not_found() {
        let (connection, alice, bob) = get_test_connection();
        let category = create("Food", alice, &connection);

        let got = get_category(category.id, bob, &connection);

        assert_eq!(got.map(|category| category.id), Err(Error::NotFound));
    }

    #[test]
    fn get_all_categories_is_scoped_and_sorted() {
        let (connection, alice, bob) = get_test_connection();
        create("Travel", alice, &connection);
        create("Food", alice, &connection);
        create("Rent", bob, &connection);

        let names: Vec<String> = get_all_categories(alice, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect();

        assert_eq!(names, vec!["Food", "Travel"]);
    }

    #[test]
    fn get_or_create_reuses_existing_category() {
        let (connection, alice, _) = get_test_connection();
        let category = create("Food", alice, &connection);

        let got =
            get_or_create_category_by_name(&CategoryName::new_unchecked("Food"), alice, &connection)
                .unwrap();

        assert_eq!(got.id, category.id);
        assert_eq!(get_all_categories(alice, &connection).unwrap().len(), 1);
    }

    #[test]
    fn get_or_create_creates_missing_category_for_user() {
        let (connection, alice, bob) = get_test_connection();
        let alices = create("Food", alice, &connection);

        let bobs =
            get_or_create_category_by_name(&CategoryName::new_unchecked("Food"), bob, &connection)
                .unwrap();

        assert_ne!(bobs.id, alices.id);
        assert_eq!(bobs.user_id, bob);
        assert_eq!(bobs.color, HexColor::default());
    }

    #[test]
    fn update_category_succeeds() {
        let (connection, alice, _) = get_test_connection();
        let category = create("Food", alice, &connection);
        let color = HexColor::new_unchecked("#ff0000");

        update_category(
            category.id,
            alice,
            &CategoryName::new_unchecked("Groceries"),
            None,
            &color,
            &connection,
        )
        .unwrap();

        let got = get_category(category.id, alice, &connection).unwrap();
        assert_eq!(got.name.as_ref(), "Groceries");
        assert_eq!(got.description, None);
        assert_eq!(got.color, color);
    }

    #[test]
    fn update_category_of_other_user_fails() {
        let (connection, alice, bob) = get_test_connection();
        let category = create("Food", alice, &connection);

        let result = update_category(
            category.id,
            bob,
            &CategoryName::new_unchecked("Mine"),
            None,
            &HexColor::default(),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_category_succeeds() {
        let (connection, alice, _) = get_test_connection();
        let category = create("Food", alice, &connection);

        delete_category(category.id, alice, &connection).unwrap();

        assert!(get_all_categories(alice, &connection).unwrap().is_empty());
    }

    #[test]
    fn delete_category_of_other_user_fails() {
        let (connection, alice, bob) = get_test_connection();
        let category = create("Food", alice, &connection);

        let result = delete_category(category.id, bob, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }
}
