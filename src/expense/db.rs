//! Database operations for expenses.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{CategoryId, ExpenseId},
    expense::{Expense, ExpenseFields, NewExpense},
    user::UserID,
};

/// Initialize the expense table.
///
/// The composite foreign key means an expense can only be filed under a
/// category owned by the same user.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            paid_by TEXT,
            tags TEXT,
            file_path TEXT,
            category_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(category_id, user_id) REFERENCES category(id, user_id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_expense_category_id ON expense(category_id);
        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
    )?;

    Ok(())
}

const SELECT_EXPENSE: &str = "SELECT id, description, amount, date, paid_by, tags, file_path, \
    category_id, user_id, created_at FROM expense";

/// Create an expense and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::SqlError] if the category does not belong to the user.
pub fn create_expense(new_expense: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expense
            (description, amount, date, paid_by, tags, file_path, category_id, user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            &new_expense.description,
            new_expense.amount,
            new_expense.date,
            &new_expense.paid_by,
            &new_expense.tags,
            &new_expense.file_path,
            new_expense.category_id,
            new_expense.user_id.as_i64(),
            created_at,
        ),
    )?;

    Ok(Expense {
        id: connection.last_insert_rowid(),
        description: new_expense.description,
        amount: new_expense.amount,
        date: new_expense.date,
        paid_by: new_expense.paid_by,
        tags: new_expense.tags,
        file_path: new_expense.file_path,
        category_id: new_expense.category_id,
        user_id: new_expense.user_id,
        created_at,
    })
}

/// Retrieve an expense owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist or belongs to another user.
pub fn get_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &expense_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the expenses in a category, newest first.
pub fn get_expenses_for_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE category_id = :category_id AND user_id = :user_id
            ORDER BY date DESC, id DESC"
        ))?
        .query_map(
            &[
                (":category_id", &category_id),
                (":user_id", &user_id.as_i64()),
            ],
            map_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Update an expense's editable fields and its attachment file name.
///
/// # Errors
///
/// Returns [Error::UpdateMissingExpense] if the user has no such expense.
pub fn update_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    fields: &ExpenseFields,
    file_path: Option<&str>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE expense
        SET description = ?1, amount = ?2, date = ?3, paid_by = ?4, tags = ?5, file_path = ?6
        WHERE id = ?7 AND user_id = ?8",
        (
            &fields.description,
            fields.amount,
            fields.date,
            &fields.paid_by,
            &fields.tags,
            file_path,
            expense_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    Ok(())
}

/// Delete an expense.
///
/// # Errors
///
/// Returns [Error::DeleteMissingExpense] if the user has no such expense.
pub fn delete_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (expense_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingExpense);
    }

    Ok(())
}

/// The attachment file names of every expense in a category.
pub fn get_file_paths_for_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT file_path FROM expense
            WHERE category_id = ?1 AND user_id = ?2 AND file_path IS NOT NULL",
        )?
        .query_map((category_id, user_id.as_i64()), |row| row.get(0))?
        .map(|maybe_path| maybe_path.map_err(|error| error.into()))
        .collect()
}

/// The attachment file names of every expense a user owns.
pub fn get_file_paths_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<String>, Error> {
    connection
        .prepare("SELECT file_path FROM expense WHERE user_id = ?1 AND file_path IS NOT NULL")?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .map(|maybe_path| maybe_path.map_err(|error| error.into()))
        .collect()
}

pub(crate) fn map_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        paid_by: row.get(4)?,
        tags: row.get(5)?,
        file_path: row.get(6)?,
        category_id: row.get(7)?,
        user_id: UserID::new(row.get(8)?),
        created_at: row.get(9)?,
    })
}
