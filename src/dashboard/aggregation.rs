//! Spending totals for the dashboard charts.
//!
//! Expense dates are stored as `YYYY-MM-DD` text, so years and months are
//! extracted with SQLite's `strftime`.

use rusqlite::Connection;

use crate::{
    Error,
    category::{Category, map_category_row},
    database_id::CategoryId,
    user::UserID,
};

/// Turn `(month, total)` rows into totals for January to December.
fn collect_months(
    rows: impl Iterator<Item = Result<(u8, f64), rusqlite::Error>>,
) -> Result<[f64; 12], Error> {
    let mut totals = [0.0; 12];

    for row in rows {
        let (month, total) = row?;

        if let Some(slot) = usize::from(month).checked_sub(1).and_then(|i| totals.get_mut(i)) {
            *slot = total;
        }
    }

    Ok(totals)
}

/// The total spent in each month of `year` in one category.
pub fn get_monthly_totals(
    category_id: CategoryId,
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<[f64; 12], Error> {
    let mut statement = connection.prepare(
        "SELECT CAST(strftime('%m', date) AS INTEGER) AS month, SUM(amount)
        FROM expense
        WHERE category_id = ?1 AND user_id = ?2 AND strftime('%Y', date) = ?3
        GROUP BY month",
    )?;
    let rows = statement.query_map(
        (category_id, user_id.as_i64(), format!("{year:04}")),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    collect_months(rows)
}

/// The total spent in each month of `year` across all of a user's categories.
pub fn get_monthly_totals_for_user(
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<[f64; 12], Error> {
    let mut statement = connection.prepare(
        "SELECT CAST(strftime('%m', date) AS INTEGER) AS month, SUM(amount)
        FROM expense
        WHERE user_id = ?1 AND strftime('%Y', date) = ?2
        GROUP BY month",
    )?;
    let rows = statement.query_map((user_id.as_i64(), format!("{year:04}")), |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;

    collect_months(rows)
}

/// Every category of the user with the total spent in it during `year`,
/// including categories with nothing spent.
pub fn get_yearly_totals(
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<Vec<(Category, f64)>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name, c.description, c.color, c.user_id, c.created_at,
                COALESCE(SUM(e.amount), 0.0)
            FROM category c
            LEFT JOIN expense e ON e.category_id = c.id AND strftime('%Y', e.date) = ?2
            WHERE c.user_id = ?1
            GROUP BY c.id
            ORDER BY c.name ASC, c.id ASC",
        )?
        .query_map((user_id.as_i64(), format!("{year:04}")), |row| {
            Ok((map_category_row(row)?, row.get(6)?))
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// Every category of the user with the total spent in it over all time.
pub fn get_category_totals(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<(Category, f64)>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name, c.description, c.color, c.user_id, c.created_at,
                COALESCE(SUM(e.amount), 0.0)
            FROM category c
            LEFT JOIN expense e ON e.category_id = c.id
            WHERE c.user_id = ?1
            GROUP BY c.id
            ORDER BY c.name ASC, c.id ASC",
        )?
        .query_map([user_id.as_i64()], |row| {
            Ok((map_category_row(row)?, row.get(6)?))
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// The years in which the user has expenses, most recent first.
pub fn get_available_years(user_id: UserID, connection: &Connection) -> Result<Vec<i32>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT CAST(strftime('%Y', date) AS INTEGER) AS year
            FROM expense
            WHERE user_id = ?1
            ORDER BY year DESC",
        )?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .map(|maybe_year| maybe_year.map_err(|error| error.into()))
        .collect()
}

/// The number of expenses the user has recorded.
pub fn count_expenses(user_id: UserID, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM expense WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod aggregation_tests {
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use crate::{
        category::{Category, CategoryName, NewCategory, create_category},
        color::HexColor,
        expense::{NewExpense, create_expense},
        test_utils::{create_test_user, get_test_db_connection},
        user::UserID,
    };

    use super::{
        count_expenses, get_available_years, get_category_totals, get_monthly_totals,
        get_monthly_totals_for_user, get_yearly_totals,
    };

    struct Fixture {
        connection: Connection,
        alice: UserID,
        bob: UserID,
        food: Category,
        travel: Category,
    }

    fn category(name: &str, user_id: UserID, connection: &Connection) -> Category {
        create_category(
            NewCategory {
                name: CategoryName::new_unchecked(name),
                description: None,
                color: HexColor::default(),
                user_id,
            },
            connection,
        )
        .unwrap()
    }

    fn expense(category: &Category, amount: f64, date: Date, connection: &Connection) {
        create_expense(
            NewExpense {
                description: "Thing".to_owned(),
                amount,
                date,
                paid_by: None,
                tags: None,
                file_path: None,
                category_id: category.id,
                user_id: category.user_id,
            },
            connection,
        )
        .unwrap();
    }

    /// Alice has food and travel expenses in 2023 and 2024, and an empty
    /// "Rent" category. Bob has one expense in 2024.
    fn get_fixture() -> Fixture {
        let connection = get_test_db_connection();
        let alice = create_test_user("alice", &connection).id;
        let bob = create_test_user("bob", &connection).id;
        let food = category("Food", alice, &connection);
        let travel = category("Travel", alice, &connection);
        category("Rent", alice, &connection);
        let bobs = category("Food", bob, &connection);

        expense(&food, 10.0, date!(2024 - 01 - 05), &connection);
        expense(&food, 5.5, date!(2024 - 01 - 20), &connection);
        expense(&food, 7.0, date!(2024 - 12 - 31), &connection);
        expense(&travel, 100.0, date!(2024 - 01 - 10), &connection);
        expense(&travel, 50.0, date!(2023 - 06 - 01), &connection);
        expense(&bobs, 999.0, date!(2024 - 01 - 01), &connection);

        Fixture {
            connection,
            alice,
            bob,
            food,
            travel,
        }
    }

    #[test]
    fn monthly_totals_for_category() {
        let fixture = get_fixture();

        let totals =
            get_monthly_totals(fixture.food.id, fixture.alice, 2024, &fixture.connection).unwrap();

        let mut want = [0.0; 12];
        want[0] = 15.5;
        want[11] = 7.0;
        assert_eq!(totals, want);
    }

    #[test]
    fn monthly_totals_for_user_sum_categories() {
        let fixture = get_fixture();

        let totals = get_monthly_totals_for_user(fixture.alice, 2024, &fixture.connection).unwrap();

        assert_eq!(totals[0], 115.5);
        assert_eq!(totals[5], 0.0);
        assert_eq!(totals[11], 7.0);
    }

    #[test]
    fn monthly_totals_for_other_users_category_are_zero() {
        let fixture = get_fixture();

        let totals =
            get_monthly_totals(fixture.food.id, fixture.bob, 2024, &fixture.connection).unwrap();

        assert_eq!(totals, [0.0; 12]);
    }

    #[test]
    fn yearly_totals_include_empty_categories() {
        let fixture = get_fixture();

        let totals: Vec<(String, f64)> = get_yearly_totals(fixture.alice, 2023, &fixture.connection)
            .unwrap()
            .into_iter()
            .map(|(category, total)| (category.name.to_string(), total))
            .collect();

        assert_eq!(
            totals,
            vec![
                ("Food".to_owned(), 0.0),
                ("Rent".to_owned(), 0.0),
                ("Travel".to_owned(), 50.0)
            ]
        );
    }

    #[test]
    fn category_totals_cover_all_time() {
        let fixture = get_fixture();

        let totals = get_category_totals(fixture.alice, &fixture.connection).unwrap();

        let travel_total = totals
            .iter()
            .find(|(category, _)| category.id == fixture.travel.id)
            .map(|(_, total)| *total);
        assert_eq!(travel_total, Some(150.0));
        assert_eq!(totals.len(), 3);
    }

    #[test]
    fn available_years_are_descending() {
        let fixture = get_fixture();

        assert_eq!(
            get_available_years(fixture.alice, &fixture.connection).unwrap(),
            vec![2024, 2023]
        );
    }

    #[test]
    fn count_expenses_is_scoped_to_user() {
        let fixture = get_fixture();

        assert_eq!(count_expenses(fixture.alice, &fixture.connection).unwrap(), 5);
        assert_eq!(count_expenses(fixture.bob, &fixture.connection).unwrap(), 1);
    }
}
