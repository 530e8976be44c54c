//! Database initialization and the additive schema upgrader.
//!
//! The schema version is stored in SQLite's `user_version` pragma. A fresh
//! database gets the full current schema in one step; an existing database
//! replays every migration newer than its stamp, in order, inside a single
//! exclusive transaction. Migrations only ever add columns, tables and
//! indexes, so database files written by older releases keep working without
//! manual intervention.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, budget::create_budget_table, category::create_category_table,
    transaction::create_transaction_table,
};

/// The schema version expected by this build of the application.
pub const SCHEMA_VERSION: i32 = 3;

/// A single additive schema upgrade.
struct Migration {
    /// The `user_version` a database has after this migration is applied.
    version: i32,
    /// Short human-readable summary for the startup log.
    description: &'static str,
    /// Applies the upgrade. Must only add columns, tables or indexes.
    apply: fn(&Connection) -> Result<(), rusqlite::Error>,
}

/// Upgrades for database files created by older releases, in the order they
/// shipped. Version 0 is the original schema: `category (id, name)` and
/// `"transaction" (id, amount, kind, date, category_id)`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "add a free-text description to transactions",
        apply: |connection| {
            connection.execute_batch(
                "ALTER TABLE \"transaction\" ADD COLUMN description TEXT NOT NULL DEFAULT '';",
            )
        },
    },
    Migration {
        version: 2,
        description: "add the budget table",
        apply: create_budget_table,
    },
    Migration {
        version: 3,
        description: "add category nesting and the ledger date index",
        apply: |connection| {
            connection.execute_batch(
                "ALTER TABLE category
                    ADD COLUMN parent_id INTEGER REFERENCES category(id) ON DELETE SET NULL;

                CREATE INDEX IF NOT EXISTS idx_transaction_date_category
                    ON \"transaction\"(date, category_id);",
            )
        },
    },
];

/// Bring the database at `connection` up to the current schema.
///
/// Runs once at startup, before any request is served. Idempotent: calling
/// this against an already-current database applies nothing.
///
/// # Errors
/// Returns an [Error::SchemaMismatch] if a migration cannot be applied (for
/// example, a column already exists with an incompatible shape). The failed
/// upgrade is rolled back in full and no repair is attempted; the documented
/// recovery is to back up and delete the database file.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let version: i32 = transaction.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version == 0 && !table_exists(&transaction, "transaction")? {
        create_schema(&transaction)?;
    } else {
        for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
            (migration.apply)(&transaction).map_err(|error| Error::SchemaMismatch {
                version: migration.version,
                message: error.to_string(),
            })?;

            tracing::info!(
                "applied schema migration {}: {}",
                migration.version,
                migration.description
            );
        }
    }

    transaction.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    transaction.commit()?;

    Ok(())
}

/// Create the full current schema in a fresh database.
fn create_schema(connection: &Connection) -> Result<(), Error> {
    create_category_table(connection)?;
    create_transaction_table(connection)?;
    create_budget_table(connection)?;

    Ok(())
}

fn table_exists(connection: &Connection, name: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}
