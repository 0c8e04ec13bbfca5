//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, category::create_category_table, expense::create_expense_table,
    tag::create_tag_table, user::create_user_table,
};

/// Switch on foreign key enforcement and create the tables for all the
/// domain models if they do not exist yet.
///
/// Tables are created in a single exclusive transaction so that a partially
/// initialised database is never left behind.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_tag_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
