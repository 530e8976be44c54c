//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, category::CategoryId};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Whether a transaction brought money in or sent money out.
///
/// Amounts are stored as non-negative numbers; this flag carries the sign of
/// the event. The same convention is used for storage, aggregation and CSV
/// export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// The value stored in the database and used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The capitalized label shown in tables and forms.
    pub fn label(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(()),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse().map_err(|_| {
            FromSqlError::Other(format!("unknown transaction kind \"{text}\"").into())
        })
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction. Non-negative.
    pub amount: f64,
    /// Whether the amount was earned or spent.
    pub kind: TransactionKind,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: f64,
        kind: TransactionKind,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            date,
            description: description.to_owned(),
            category_id: None,
        }
    }
}

/// The fields of a transaction that has not been inserted yet.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction, in dollars. Non-negative.
    pub amount: f64,
    /// Whether the amount was earned or spent.
    pub kind: TransactionKind,
    /// The date when the transaction occurred. Must not be in the future.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// The category of the transaction, e.g. "Groceries", "Rent".
    pub category_id: Option<CategoryId>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the specified category ID does not refer to a real category,
/// - [Error::NegativeAmount] if the amount is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, kind, date, description, category_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, kind, date, description, category_id",
        )?
        .query_row(
            (
                builder.amount,
                builder.kind,
                builder.date,
                &builder.description,
                builder.category_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| map_constraint_error(error, builder.amount, builder.category_id))
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, amount, kind, date, description, category_id
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the transaction `id` with the fields of `builder`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a valid transaction,
/// - [Error::InvalidCategory] if the specified category ID does not refer to a real category,
/// - [Error::NegativeAmount] if the amount is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\"
             SET amount = ?1, kind = ?2, date = ?3, description = ?4, category_id = ?5
             WHERE id = ?6",
            (
                builder.amount,
                builder.kind,
                builder.date,
                &builder.description,
                builder.category_id,
                id,
            ),
        )
        .map_err(|error| map_constraint_error(error, builder.amount, builder.category_id))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete a transaction by ID.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL CHECK (amount >= 0),
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER,
            FOREIGN KEY(category_id) REFERENCES category(id)
                ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date_category
            ON \"transaction\"(date, category_id);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let kind = row.get(2)?;
    let date = row.get(3)?;
    let description = row.get(4)?;
    let category_id = row.get(5)?;

    Ok(Transaction {
        id,
        amount,
        kind,
        date,
        description,
        category_id,
    })
}

fn map_constraint_error(
    error: rusqlite::Error,
    amount: f64,
    category_id: Option<CategoryId>,
) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(category_id),
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
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryName, create_category},
        db::initialize,
        transaction::{
            Transaction, TransactionKind, count_transactions, create_transaction,
            delete_transaction, get_transaction, update_transaction,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let amount = 12.3;

        let result = create_transaction(
            Transaction::build(amount, TransactionKind::Expense, date!(2024 - 10 - 05), "Lunch"),
            &conn,
        );

        match result {
            Ok(transaction) => {
                assert_eq!(transaction.amount, amount);
                assert_eq!(transaction.kind, TransactionKind::Expense);
                assert_eq!(transaction.description, "Lunch");
            }
            Err(error) => panic!("Unexpected error: {error}"),
        }
    }

    #[test]
    fn create_fails_on_negative_amount() {
        let conn = get_test_connection();

        let result = create_transaction(
            Transaction::build(-5.0, TransactionKind::Expense, date!(2024 - 10 - 05), ""),
            &conn,
        );

        assert_eq!(result, Err(Error::NegativeAmount(-5.0)));
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let conn = get_test_connection();
        let category_id = Some(42);

        let result = create_transaction(
            Transaction::build(123.45, TransactionKind::Income, date!(2024 - 10 - 04), "")
                .category_id(category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn create_with_category_succeeds() {
        let conn = get_test_connection();
        let category = create_category(CategoryName::new_unchecked("Groceries"), None, &conn)
            .expect("Could not create test category");

        let transaction = create_transaction(
            Transaction::build(25.50, TransactionKind::Expense, date!(2024 - 10 - 04), "")
                .category_id(Some(category.id)),
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.category_id, Some(category.id));
    }

    #[test]
    fn get_returns_created_transaction() {
        let conn = get_test_connection();
        let created = create_transaction(
            Transaction::build(1.5, TransactionKind::Income, date!(2024 - 02 - 29), "Interest"),
            &conn,
        )
        .unwrap();

        let fetched = get_transaction(created.id, &conn).expect("Could not get transaction");

        assert_eq!(created, fetched);
    }

    #[test]
    fn get_fails_on_missing_id() {
        let conn = get_test_connection();

        let result = get_transaction(999, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = get_test_connection();
        let created = create_transaction(
            Transaction::build(10.0, TransactionKind::Expense, date!(2024 - 01 - 01), "Before"),
            &conn,
        )
        .unwrap();

        update_transaction(
            created.id,
            Transaction::build(20.0, TransactionKind::Income, date!(2024 - 01 - 02), "After"),
            &conn,
        )
        .expect("Could not update transaction");

        let updated = get_transaction(created.id, &conn).unwrap();
        assert_eq!(updated.amount, 20.0);
        assert_eq!(updated.kind, TransactionKind::Income);
        assert_eq!(updated.date, date!(2024 - 01 - 02));
        assert_eq!(updated.description, "After");
    }

    #[test]
    fn update_fails_on_missing_id() {
        let conn = get_test_connection();

        let result = update_transaction(
            999,
            Transaction::build(20.0, TransactionKind::Income, date!(2024 - 01 - 02), ""),
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_removes_transaction() {
        let conn = get_test_connection();
        let created = create_transaction(
            Transaction::build(10.0, TransactionKind::Expense, date!(2024 - 01 - 01), ""),
            &conn,
        )
        .unwrap();

        delete_transaction(created.id, &conn).expect("Could not delete transaction");

        assert_eq!(get_transaction(created.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_fails_on_missing_id() {
        let conn = get_test_connection();

        let result = delete_transaction(999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingTransaction));
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(
                Transaction::build(i as f64, TransactionKind::Expense, date!(2024 - 10 - 05), ""),
                &conn,
            )
            .expect("Could not create transaction");
        }

        let got_count = count_transactions(&conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }
}
