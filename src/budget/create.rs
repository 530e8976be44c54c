//! Budget creation page and endpoint.

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

use crate::{
    AppState, Error, endpoints,
    budget::{Budget, YearMonth, core::create_budget},
    category::{Category, CategoryId, get_all_categories},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    timezone::local_date_today,
};

/// The state needed to create a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating or editing a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The category the limit applies to.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The month the limit applies to, as `YYYY-MM`.
    pub month: String,
    /// The spending limit in dollars.
    pub amount: f64,
}

impl BudgetForm {
    /// Normalize the form into its validated parts.
    pub(super) fn validate(&self) -> Result<(CategoryId, YearMonth, f64), Error> {
        let category_id = self.category_id.ok_or(Error::InvalidCategory(None))?;
        let month: YearMonth = self.month.parse()?;

        if self.amount < 0.0 {
            return Err(Error::NegativeAmount(self.amount));
        }

        Ok((category_id, month, self.amount))
    }
}

/// Render the budget creation page.
pub async fn get_new_budget_page(
    State(state): State<CreateBudgetState>,
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

    Ok(new_budget_view(YearMonth::containing(today), &categories).into_response())
}

/// Handle budget creation form submission.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetState>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let (category_id, month, amount) = match form.validate() {
        Ok(validated) => validated,
        Err(error) => {
            tracing::error!("rejected budget form: {error}");
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_budget(category_id, month, amount, &connection) {
        Ok(_) => (
            HxRedirect(format!("{}?month={month}", endpoints::BUDGETS_VIEW)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not create budget: {error}");
            error.into_alert_response()
        }
    }
}

fn new_budget_view(default_month: YearMonth, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_BUDGET_VIEW).into_html();

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Create Budget" }

            form
                hx-post=(endpoints::POST_BUDGET)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (budget_form_fields(None, default_month, categories))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Budget" }
            }
        }
    };

    base("Create Budget", &[], &content)
}

/// The shared form fields for creating and editing a budget.
pub(super) fn budget_form_fields(
    budget: Option<&Budget>,
    default_month: YearMonth,
    categories: &[Category],
) -> Markup {
    let category_id = budget.map(|b| b.category_id);
    let month = budget.map(|b| b.month).unwrap_or(default_month);
    let amount = budget.map(|b| b.amount);

    html! {
        div
        {
            label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

            select
                id="category_id"
                name="category_id"
                required
                class=(FORM_SELECT_STYLE)
            {
                option value="" disabled selected[category_id.is_none()] { "Choose a category" }

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

        div
        {
            label for="month" class=(FORM_LABEL_STYLE) { "Month" }

            input
                id="month"
                type="month"
                name="month"
                required
                value=(month)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Monthly Limit" }

            input
                id="amount"
                type="number"
                name="amount"
                step="0.01"
                min="0"
                required
                value=[amount]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

#[cfg(test)]
mod create_budget_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        budget::{YearMonth, get_budget},
        category::{CategoryName, create_category},
        db::initialize,
    };

    use super::{BudgetForm, CreateBudgetState, create_budget_endpoint};

    fn get_test_state() -> CreateBudgetState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        CreateBudgetState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn can_create_budget() {
        let state = get_test_state();
        let category_id = {
            let conn = state.db_connection.lock().unwrap();
            create_category(CategoryName::new_unchecked("Food"), None, &conn)
                .unwrap()
                .id
        };

        let form = BudgetForm {
            category_id: Some(category_id),
            month: "2024-01".to_string(),
            amount: 100.0,
        };
        let response = create_budget_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(HX_REDIRECT)
            .expect("expected response to have the header hx-redirect");
        assert_eq!(location, "/budgets?month=2024-01");

        let conn = state.db_connection.lock().unwrap();
        let budget = get_budget(1, &conn).expect("Budget should exist");
        assert_eq!(budget.category_id, category_id);
        assert_eq!(budget.month, "2024-01".parse::<YearMonth>().unwrap());
        assert_eq!(budget.amount, 100.0);
    }

    #[tokio::test]
    async fn rejects_missing_category() {
        let state = get_test_state();
        let form = BudgetForm {
            category_id: None,
            month: "2024-01".to_string(),
            amount: 100.0,
        };

        let response = create_budget_endpoint(State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_malformed_month() {
        let state = get_test_state();
        let category_id = {
            let conn = state.db_connection.lock().unwrap();
            create_category(CategoryName::new_unchecked("Food"), None, &conn)
                .unwrap()
                .id
        };

        let form = BudgetForm {
            category_id: Some(category_id),
            month: "January 2024".to_string(),
            amount: 100.0,
        };
        let response = create_budget_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Nothing was written.
        let conn = state.db_connection.lock().unwrap();
        assert!(get_budget(1, &conn).is_err());
    }

    #[tokio::test]
    async fn rejects_duplicate_budget() {
        let state = get_test_state();
        let category_id = {
            let conn = state.db_connection.lock().unwrap();
            create_category(CategoryName::new_unchecked("Food"), None, &conn)
                .unwrap()
                .id
        };

        let form = BudgetForm {
            category_id: Some(category_id),
            month: "2024-01".to_string(),
            amount: 100.0,
        };
        create_budget_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        let duplicate = BudgetForm {
            category_id: Some(category_id),
            month: "2024-01".to_string(),
            amount: 200.0,
        };
        let response = create_budget_endpoint(State(state), Form(duplicate))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
