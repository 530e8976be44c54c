//! Defines the core data models and database queries for budgets.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use time::{Date, Duration, Month};

use crate::{
    Error,
    category::{CategoryId, CategoryName},
};

// ============================================================================
// MODELS
// ============================================================================

/// A budget period key identifying one calendar month within one year.
///
/// Stored and displayed as `YYYY-MM`, which is also the value format of the
/// HTML month input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    year: i32,
    month: Month,
}

impl YearMonth {
    /// Create a year-month pair.
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The month that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        Date::from_calendar_date(self.year, self.month, 1).unwrap()
    }

    /// The last day of the month, accounting for leap years.
    pub fn last_day(&self) -> Date {
        self.next().first_day() - Duration::days(1)
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        let year = if self.month == Month::January {
            self.year - 1
        } else {
            self.year
        };

        Self {
            year,
            month: self.month.previous(),
        }
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        let year = if self.month == Month::December {
            self.year + 1
        } else {
            self.year
        };

        Self {
            year,
            month: self.month.next(),
        }
    }
}

impl Ord for YearMonth {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month as u8).cmp(&(other.year, other.month as u8))
    }
}

impl PartialOrd for YearMonth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_string());

        let (year_text, month_text) = s.trim().split_once('-').ok_or_else(invalid)?;

        let year: i32 = year_text.parse().map_err(|_| invalid())?;
        let month_number: u8 = month_text.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month_number).map_err(|_| invalid())?;

        Ok(Self { year, month })
    }
}

impl ToSql for YearMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for YearMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse()
            .map_err(|_| FromSqlError::Other(format!("invalid year-month \"{text}\"").into()))
    }
}

/// Database identifier for a budget.
pub type BudgetId = i64;

/// A monthly spending limit for one category.
///
/// At most one budget exists per (category, month) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category the limit applies to.
    pub category_id: CategoryId,
    /// The calendar month the limit applies to.
    pub month: YearMonth,
    /// The spending limit in dollars. Non-negative.
    pub amount: f64,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a budget and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateBudgetMonth] if a budget for the category and month exists,
/// - [Error::InvalidCategory] if `category_id` does not refer to a real category,
/// - [Error::NegativeAmount] if the limit is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    category_id: CategoryId,
    month: YearMonth,
    amount: f64,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(
            "INSERT INTO budget (category_id, month, amount) VALUES (?1, ?2, ?3)
             RETURNING id, category_id, month, amount",
        )?
        .query_row((category_id, month, amount), map_budget_row)
        .map_err(|error| map_constraint_error(error, amount, category_id))
}

/// Retrieve a single budget by ID.
pub fn get_budget(budget_id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare("SELECT id, category_id, month, amount FROM budget WHERE id = :id;")?
        .query_row(&[(":id", &budget_id)], map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve the budget configured for a category and month, if any.
pub fn get_budget_for(
    category_id: CategoryId,
    month: YearMonth,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, month, amount FROM budget
             WHERE category_id = ?1 AND month = ?2",
        )?
        .query_row((category_id, month), map_budget_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve every budget configured for a month with its category name,
/// ordered alphabetically by category name.
pub fn get_budgets_for_month(
    month: YearMonth,
    connection: &Connection,
) -> Result<Vec<(Budget, CategoryName)>, Error> {
    connection
        .prepare(
            "SELECT budget.id, budget.category_id, budget.month, budget.amount, category.name
             FROM budget
             INNER JOIN category ON budget.category_id = category.id
             WHERE budget.month = ?1
             ORDER BY category.name ASC",
        )?
        .query_map([month], |row| {
            let budget = map_budget_row(row)?;
            let raw_name: String = row.get(4)?;

            Ok((budget, CategoryName::new_unchecked(&raw_name)))
        })?
        .map(|result| result.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the budget `budget_id` with a new category, month and limit.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingBudget] if `budget_id` does not exist,
/// - [Error::DuplicateBudgetMonth] if another budget already covers the category and month,
/// - [Error::InvalidCategory] if `category_id` does not refer to a real category,
/// - [Error::NegativeAmount] if the limit is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    budget_id: BudgetId,
    category_id: CategoryId,
    month: YearMonth,
    amount: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE budget SET category_id = ?1, month = ?2, amount = ?3 WHERE id = ?4",
            (category_id, month, amount, budget_id),
        )
        .map_err(|error| map_constraint_error(error, amount, category_id))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    Ok(())
}

/// Delete a budget by ID.
pub fn delete_budget(budget_id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [budget_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Initialize the budget table.
///
/// Budgets follow their category: deleting a category deletes its budgets.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            UNIQUE(category_id, month),
            FOREIGN KEY(category_id) REFERENCES category(id)
                ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        month: row.get(2)?,
        amount: row.get(3)?,
    })
}

fn map_constraint_error(error: rusqlite::Error, amount: f64, category_id: CategoryId) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateBudgetMonth,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(Some(category_id)),
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_CHECK,
            },
            _,
        ) => Error::NegativeAmount(amount),
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod year_month_tests {
    use time::{Month, macros::date};

    use crate::Error;

    use super::YearMonth;

    #[test]
    fn parses_and_displays_round_trip() {
        let month: YearMonth = "2024-01".parse().unwrap();

        assert_eq!(month, YearMonth::new(2024, Month::January));
        assert_eq!(month.to_string(), "2024-01");
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "2024", "2024-13", "2024-0", "Jan 2024", "2024-1-1"] {
            let result: Result<YearMonth, _> = text.parse();

            assert_eq!(
                result,
                Err(Error::InvalidMonth(text.to_string())),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn containing_uses_calendar_month() {
        assert_eq!(
            YearMonth::containing(date!(2024 - 02 - 29)),
            YearMonth::new(2024, Month::February)
        );
    }

    #[test]
    fn day_bounds_cover_the_whole_month() {
        let february = YearMonth::new(2024, Month::February);

        assert_eq!(february.first_day(), date!(2024 - 02 - 01));
        assert_eq!(february.last_day(), date!(2024 - 02 - 29));

        let december = YearMonth::new(2023, Month::December);
        assert_eq!(december.last_day(), date!(2023 - 12 - 31));
    }

    #[test]
    fn previous_and_next_roll_over_years() {
        let january = YearMonth::new(2024, Month::January);

        assert_eq!(january.previous(), YearMonth::new(2023, Month::December));
        assert_eq!(
            YearMonth::new(2023, Month::December).next(),
            january
        );
    }

    #[test]
    fn orders_chronologically() {
        let mut months = vec![
            YearMonth::new(2024, Month::February),
            YearMonth::new(2023, Month::December),
            YearMonth::new(2024, Month::January),
        ];

        months.sort();

        assert_eq!(
            months,
            vec![
                YearMonth::new(2023, Month::December),
                YearMonth::new(2024, Month::January),
                YearMonth::new(2024, Month::February),
            ]
        );
    }
}

#[cfg(test)]
mod budget_query_tests {
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        Error,
        category::{CategoryName, create_category, delete_category},
        db::initialize,
    };

    use super::{
        YearMonth, create_budget, delete_budget, get_budget, get_budget_for,
        get_budgets_for_month, update_budget,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn january() -> YearMonth {
        YearMonth::new(2024, Month::January)
    }

    #[test]
    fn create_budget_succeeds() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();

        let budget = create_budget(food.id, january(), 100.0, &conn)
            .expect("Could not create budget");

        assert!(budget.id > 0);
        assert_eq!(budget.category_id, food.id);
        assert_eq!(budget.month, january());
        assert_eq!(budget.amount, 100.0);
    }

    #[test]
    fn create_budget_fails_on_duplicate_month() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        create_budget(food.id, january(), 100.0, &conn).unwrap();

        let duplicate = create_budget(food.id, january(), 150.0, &conn);

        assert_eq!(duplicate, Err(Error::DuplicateBudgetMonth));
    }

    #[test]
    fn same_category_may_have_budgets_in_different_months() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        create_budget(food.id, january(), 100.0, &conn).unwrap();

        let result = create_budget(food.id, january().next(), 100.0, &conn);

        assert!(result.is_ok());
    }

    #[test]
    fn create_budget_fails_on_invalid_category() {
        let conn = get_test_connection();

        let result = create_budget(42, january(), 100.0, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(42))));
    }

    #[test]
    fn create_budget_fails_on_negative_amount() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();

        let result = create_budget(food.id, january(), -1.0, &conn);

        assert_eq!(result, Err(Error::NegativeAmount(-1.0)));
    }

    #[test]
    fn get_budget_for_finds_the_configured_month() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let created = create_budget(food.id, january(), 100.0, &conn).unwrap();

        assert_eq!(
            get_budget_for(food.id, january(), &conn).unwrap(),
            Some(created)
        );
        assert_eq!(get_budget_for(food.id, january().next(), &conn).unwrap(), None);
    }

    #[test]
    fn get_budgets_for_month_is_sorted_by_category_name() {
        let conn = get_test_connection();
        let zoo = create_category(CategoryName::new_unchecked("Zoo"), None, &conn).unwrap();
        let alpha = create_category(CategoryName::new_unchecked("Alpha"), None, &conn).unwrap();
        create_budget(zoo.id, january(), 10.0, &conn).unwrap();
        create_budget(alpha.id, january(), 20.0, &conn).unwrap();
        // Another month should not appear.
        create_budget(alpha.id, january().next(), 30.0, &conn).unwrap();

        let budgets = get_budgets_for_month(january(), &conn).unwrap();

        let names: Vec<String> = budgets.iter().map(|(_, name)| name.to_string()).collect();
        assert_eq!(names, vec!["Alpha".to_string(), "Zoo".to_string()]);
    }

    #[test]
    fn update_budget_overwrites_fields() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let budget = create_budget(food.id, january(), 100.0, &conn).unwrap();

        update_budget(budget.id, food.id, january(), 250.0, &conn)
            .expect("Could not update budget");

        let updated = get_budget(budget.id, &conn).unwrap();
        assert_eq!(updated.amount, 250.0);
    }

    #[test]
    fn update_budget_fails_on_missing_id() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();

        let result = update_budget(999, food.id, january(), 250.0, &conn);

        assert_eq!(result, Err(Error::UpdateMissingBudget));
    }

    #[test]
    fn delete_budget_succeeds() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let budget = create_budget(food.id, january(), 100.0, &conn).unwrap();

        delete_budget(budget.id, &conn).expect("Could not delete budget");

        assert_eq!(get_budget(budget.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_budget_fails_on_missing_id() {
        let conn = get_test_connection();

        let result = delete_budget(999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingBudget));
    }

    #[test]
    fn deleting_a_category_deletes_its_budgets() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let budget = create_budget(food.id, january(), 100.0, &conn).unwrap();

        delete_category(food.id, &conn).expect("Could not delete category");

        assert_eq!(get_budget(budget.id, &conn), Err(Error::NotFound));
    }
}
