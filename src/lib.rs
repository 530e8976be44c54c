//! Centsible is a web app for tracking personal income, expenses and monthly
//! category budgets.
//!
//! This library provides a server that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod alert;
mod app_state;
mod budget;
mod category;
mod dashboard;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod timezone;
mod transaction;

pub use app_state::AppState;
pub use budget::BudgetThresholds;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;

use crate::{
    alert::Alert, category::CategoryId, internal_server_error::render_internal_server_error,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The category name used to create or rename a category already exists.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// Assigning the requested parent would make the category its own
    /// ancestor.
    #[error("the parent category would create a cycle")]
    CategoryCycle,

    /// The category ID used to create a transaction or budget did not match a
    /// valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// A negative amount was used for a transaction or budget limit.
    ///
    /// Amounts are stored as non-negative numbers with a separate
    /// income/expense flag, so a negative amount is always a client error.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(f64),

    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A date string could not be parsed as a calendar date.
    #[error("\"{0}\" is not a valid date, expected the format YYYY-MM-DD")]
    InvalidDate(String),

    /// A month string could not be parsed as a year-month pair.
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// A budget already exists for the specified category and month.
    #[error("a budget for this category and month already exists")]
    DuplicateBudgetMonth,

    /// The budget warning ratio was outside the half-open interval (0, 1].
    #[error("{0} is not a valid warning ratio, expected a number in (0, 1]")]
    InvalidWarningRatio(f64),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// A schema migration could not be applied to the database file.
    ///
    /// The upgrader never attempts automatic repair. The documented recovery
    /// is to back up and delete the database file, then restart the server.
    #[error("could not upgrade the database schema to version {version}: {message}")]
    SchemaMismatch {
        /// The migration version that failed to apply.
        version: i32,
        /// The underlying SQLite error text.
        message: String,
    },

    /// An error occurred while writing CSV output.
    #[error("could not write CSV output: {0}")]
    CsvError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezone(timezone) => render_internal_server_error(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to a valid, canonical timezone string"
                ),
            ),
            Error::DatabaseLockError => render_internal_server_error(
                "Sorry, something went wrong.",
                "Try again later or check the server logs",
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error(
                    "Sorry, something went wrong.",
                    "Try again later or check the server logs",
                )
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::EmptyCategoryName => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid category name",
                "The category name cannot be empty.",
            )
            .into_response(),
            Error::DuplicateCategoryName(name) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Duplicate category name",
                &format!(
                    "The category \"{name}\" already exists. \
                    Choose a different name, or edit or delete the existing category."
                ),
            )
            .into_response(),
            Error::CategoryCycle => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid parent category",
                "A category cannot be its own ancestor. Choose a different parent.",
            )
            .into_response(),
            Error::InvalidCategory(category_id) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid category ID",
                &format!("Could not find a category with the ID {category_id:?}"),
            )
            .into_response(),
            Error::NegativeAmount(amount) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid amount",
                &format!("{amount} is negative. Enter a non-negative amount."),
            )
            .into_response(),
            Error::FutureDate(date) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid transaction date",
                &format!("{date} is a date in the future, which is not allowed."),
            )
            .into_response(),
            Error::InvalidDate(text) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid date",
                &format!("\"{text}\" is not a valid date. Use the format YYYY-MM-DD."),
            )
            .into_response(),
            Error::InvalidMonth(text) => Alert::error(
                StatusCode::BAD_REQUEST,
                "Invalid month",
                &format!("\"{text}\" is not a valid month. Use the format YYYY-MM."),
            )
            .into_response(),
            Error::DuplicateBudgetMonth => Alert::error(
                StatusCode::BAD_REQUEST,
                "Duplicate budget",
                "A budget for this category and month already exists. \
                Edit the existing budget instead.",
            )
            .into_response(),
            Error::UpdateMissingTransaction => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not update transaction",
                "The transaction could not be found.",
            )
            .into_response(),
            Error::DeleteMissingTransaction => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not delete transaction",
                "The transaction could not be found. \
                Try refreshing the page to see if the transaction has already been deleted.",
            )
            .into_response(),
            Error::UpdateMissingCategory => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not update category",
                "The category could not be found.",
            )
            .into_response(),
            Error::DeleteMissingCategory => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not delete category",
                "The category could not be found. \
                Try refreshing the page to see if the category has already been deleted.",
            )
            .into_response(),
            Error::UpdateMissingBudget => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not update budget",
                "The budget could not be found.",
            )
            .into_response(),
            Error::DeleteMissingBudget => Alert::error(
                StatusCode::NOT_FOUND,
                "Could not delete budget",
                "The budget could not be found. \
                Try refreshing the page to see if the budget has already been deleted.",
            )
            .into_response(),
            _ => Alert::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "An unexpected error occurred, check the server logs for more details.",
            )
            .into_response(),
        }
    }
}
