//! Transaction editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    category::{Category, get_all_categories},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    transaction::{
        Transaction, TransactionId, core::update_transaction,
        create::{TransactionForm, transaction_form_fields}, get_transaction,
    },
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the transaction editing page.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, &connection).inspect_err(|error| {
        tracing::error!("could not get transaction {transaction_id}: {error}")
    })?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;

    Ok(edit_transaction_view(&transaction, &categories).into_response())
}

/// A route handler for overwriting an existing transaction.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Form(form): Form<TransactionForm>,
) -> Response {
    if let Err(error) = form.validate(&state.local_timezone) {
        tracing::error!("rejected transaction form: {error}");
        return error.into_alert_response();
    }

    let builder = Transaction::build(form.amount, form.kind, form.date, &form.description)
        .category_id(form.category_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_transaction(transaction_id, builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn edit_transaction_view(transaction: &Transaction, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let update_url = endpoints::format_endpoint(endpoints::PUT_TRANSACTION, transaction.id);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Transaction" }

            form
                hx-put=(update_url)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (transaction_form_fields(Some(transaction), transaction.date, categories))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Changes" }
            }
        }
    };

    base("Edit Transaction", &[], &content)
}
