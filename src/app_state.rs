//! Implements a struct that holds the state of the server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, budget::BudgetThresholds, db::initialize};

/// The state of the server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The thresholds used to classify spending against monthly budgets.
    pub budget_thresholds: BudgetThresholds,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will run the schema upgrader against the database before
    /// anything else touches it. `local_timezone` should be a valid,
    /// canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database schema cannot be brought up to date.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        budget_thresholds: BudgetThresholds,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            budget_thresholds,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
