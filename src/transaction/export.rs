//! CSV export of the filtered ledger.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    transaction::{LedgerEntry, get_ledger, list::LedgerQueryParams},
};

/// The state needed to export transactions.
#[derive(Debug, Clone)]
pub struct ExportTransactionsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Download the transactions matching the active filter as a CSV file.
///
/// The rows use the same filter semantics and ordering as the transactions
/// page: one row per matching transaction, most recent first.
pub async fn export_transactions(
    State(state): State<ExportTransactionsState>,
    Query(query_params): Query<LedgerQueryParams>,
) -> Result<Response, Error> {
    let filter = query_params.into_filter()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let entries = get_ledger(&filter, &connection)
        .inspect_err(|error| tracing::error!("could not get ledger entries: {error}"))?;

    let body = write_csv(&entries)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

/// Serialize ledger entries in the export column order:
/// date, type, category, amount, description.
fn write_csv(entries: &[LedgerEntry]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["date", "type", "category", "amount", "description"])
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for entry in entries {
        let transaction = &entry.transaction;
        let category = entry
            .category_name
            .as_ref()
            .map(|name| name.to_string())
            .unwrap_or_default();

        writer
            .write_record([
                transaction.date.to_string(),
                transaction.kind.as_str().to_string(),
                category,
                format!("{:.2}", transaction.amount),
                transaction.description.clone(),
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

#[cfg(test)]
mod export_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        category::{CategoryName, create_category},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction, list::LedgerQueryParams},
    };

    use super::{ExportTransactionsState, export_transactions};

    fn get_test_state() -> ExportTransactionsState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        ExportTransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    async fn response_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&body).to_string()
    }

    #[tokio::test]
    async fn exports_filtered_rows_in_listing_order() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
            create_transaction(
                Transaction::build(1000.0, TransactionKind::Income, date!(2024 - 01 - 01), "Pay"),
                &conn,
            )
            .unwrap();
            create_transaction(
                Transaction::build(20.0, TransactionKind::Expense, date!(2024 - 01 - 05), "Lunch")
                    .category_id(Some(food.id)),
                &conn,
            )
            .unwrap();
            create_transaction(
                Transaction::build(50.0, TransactionKind::Income, date!(2024 - 01 - 10), "Refund"),
                &conn,
            )
            .unwrap();
        }

        // Export with the income filter: only income rows, most recent first.
        let params = LedgerQueryParams {
            kind: Some("income".to_string()),
            ..Default::default()
        };
        let response = export_transactions(State(state), Query(params))
            .await
            .expect("Could not export transactions");

        let content_type = response
            .headers()
            .get("content-type")
            .expect("content-type header missing")
            .clone();
        assert_eq!(content_type, "text/csv; charset=utf-8");

        let text = response_text(response).await;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "date,type,category,amount,description",
                "2024-01-10,income,,50.00,Refund",
                "2024-01-01,income,,1000.00,Pay",
            ]
        );
    }

    #[tokio::test]
    async fn export_includes_category_names() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
            create_transaction(
                Transaction::build(20.0, TransactionKind::Expense, date!(2024 - 01 - 05), "Lunch")
                    .category_id(Some(food.id)),
                &conn,
            )
            .unwrap();
        }

        let response = export_transactions(State(state), Query(LedgerQueryParams::default()))
            .await
            .expect("Could not export transactions");

        let text = response_text(response).await;
        assert!(text.contains("2024-01-05,expense,Food,20.00,Lunch"));
    }

    #[tokio::test]
    async fn export_of_empty_ledger_has_only_the_header() {
        let state = get_test_state();

        let response = export_transactions(State(state), Query(LedgerQueryParams::default()))
            .await
            .expect("Could not export transactions");

        let text = response_text(response).await;
        assert_eq!(text.trim_end(), "date,type,category,amount,description");
    }
}
