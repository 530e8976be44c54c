//! Transaction creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error, endpoints,
    category::{Category, CategoryId, get_all_categories},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    timezone::local_date_today,
    transaction::{Transaction, TransactionKind, core::create_transaction},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating or editing a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The value of the transaction in dollars.
    pub amount: f64,
    /// Whether the amount was earned or spent.
    pub kind: TransactionKind,
    /// The date when the transaction occurred.
    pub date: Date,
    /// Text detailing the transaction.
    pub description: String,
    /// The category to file this transaction under.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl TransactionForm {
    /// Check the form against the validation rules that the database cannot
    /// express: non-negative amounts and no future dates.
    pub(super) fn validate(&self, local_timezone: &str) -> Result<(), Error> {
        if self.amount < 0.0 {
            return Err(Error::NegativeAmount(self.amount));
        }

        let today = local_date_today(local_timezone)
            .ok_or_else(|| Error::InvalidTimezone(local_timezone.to_owned()))?;

        if self.date > today {
            return Err(Error::FutureDate(self.date));
        }

        Ok(())
    }
}

/// Render the transaction creation page.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
) -> Result<Response, Error> {
    let today = local_date_today(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezone(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;

    Ok(new_transaction_view(today, &categories).into_response())
}

/// A route handler for creating a new transaction, redirects to transactions view on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
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

    if let Err(error) = create_transaction(builder, &connection) {
        tracing::error!("could not create transaction: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

fn new_transaction_view(today: Date, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New Transaction" }

            form
                hx-post=(endpoints::POST_TRANSACTION)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (transaction_form_fields(None, today, categories))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Transaction" }
            }
        }
    };

    base("New Transaction", &[], &content)
}

/// The shared form fields for creating and editing a transaction.
///
/// When `transaction` is `Some`, the fields are pre-filled with its values;
/// otherwise `default_date` seeds the date picker.
pub(super) fn transaction_form_fields(
    transaction: Option<&Transaction>,
    default_date: Date,
    categories: &[Category],
) -> Markup {
    let amount = transaction.map(|t| t.amount);
    let kind = transaction.map(|t| t.kind).unwrap_or(TransactionKind::Expense);
    let date = transaction.map(|t| t.date).unwrap_or(default_date);
    let description = transaction.map(|t| t.description.as_str()).unwrap_or("");
    let category_id = transaction.and_then(|t| t.category_id);

    let kind_radio = |value: TransactionKind| {
        let id = format!("kind-{}", value.as_str());

        html!(
            label for=(id) class="flex items-center gap-2 text-sm"
            {
                input
                    id=(id)
                    type="radio"
                    name="kind"
                    value=(value.as_str())
                    checked[kind == value];

                (value.label())
            }
        )
    };

    html! {
        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

            input
                id="amount"
                type="number"
                name="amount"
                step="0.01"
                min="0"
                required
                autofocus
                value=[amount]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        fieldset class="flex gap-6"
        {
            legend class=(FORM_LABEL_STYLE) { "Type" }

            (kind_radio(TransactionKind::Expense))
            (kind_radio(TransactionKind::Income))
        }

        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                id="date"
                type="date"
                name="date"
                required
                value=(date)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="description" class=(FORM_LABEL_STYLE) { "Description" }

            input
                id="description"
                type="text"
                name="description"
                placeholder="What was this for?"
                value=(description)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="category_id" class=(FORM_LABEL_STYLE) { "Category (optional)" }

            select id="category_id" name="category_id" class=(FORM_SELECT_STYLE)
            {
                option value="" selected[category_id.is_none()] { "None" }

                @for category in categories {
                    option
                        value=(category.id)
                        selected[category_id == Some(category.id)]
                    {
                        (category.name)
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod transaction_form_tests {
    use crate::transaction::TransactionKind;

    use super::TransactionForm;

    #[test]
    fn form_decodes_with_empty_category() {
        let form: TransactionForm =
            serde_html_form::from_str("amount=12.5&kind=expense&date=2024-01-05&description=Lunch&category_id=")
                .expect("Could not decode form");

        assert_eq!(form.amount, 12.5);
        assert_eq!(form.kind, TransactionKind::Expense);
        assert_eq!(form.description, "Lunch");
        assert_eq!(form.category_id, None);
    }

    #[test]
    fn form_decodes_category_id() {
        let form: TransactionForm =
            serde_html_form::from_str("amount=1&kind=income&date=2024-01-05&description=&category_id=7")
                .expect("Could not decode form");

        assert_eq!(form.kind, TransactionKind::Income);
        assert_eq!(form.category_id, Some(7));
    }
}
