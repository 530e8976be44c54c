//! Budget editing page and endpoint.

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
    budget::{
        Budget, BudgetId,
        core::{get_budget, update_budget},
        create::{BudgetForm, budget_form_fields},
    },
    category::{Category, get_all_categories},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
};

/// The state needed to edit a budget.
#[derive(Debug, Clone)]
pub struct EditBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the budget editing page.
pub async fn get_edit_budget_page(
    Path(budget_id): Path<BudgetId>,
    State(state): State<EditBudgetState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = get_budget(budget_id, &connection)
        .inspect_err(|error| tracing::error!("could not get budget {budget_id}: {error}"))?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;

    Ok(edit_budget_view(&budget, &categories).into_response())
}

/// A route handler for overwriting an existing budget.
pub async fn update_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<EditBudgetState>,
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

    match update_budget(budget_id, category_id, month, amount, &connection) {
        Ok(_) => (
            HxRedirect(format!("{}?month={month}", endpoints::BUDGETS_VIEW)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

fn edit_budget_view(budget: &Budget, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();
    let update_url = endpoints::format_endpoint(endpoints::PUT_BUDGET, budget.id);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Budget" }

            form
                hx-put=(update_url)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (budget_form_fields(Some(budget), budget.month, categories))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Changes" }
            }
        }
    };

    base("Edit Budget", &[], &content)
}

#[cfg(test)]
mod edit_budget_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        Error,
        budget::{YearMonth, create::BudgetForm, create_budget, get_budget},
        category::{CategoryName, create_category},
        db::initialize,
    };

    use super::{EditBudgetState, get_edit_budget_page, update_budget_endpoint};

    fn get_test_state() -> EditBudgetState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        EditBudgetState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn insert_budget(state: &EditBudgetState) -> i64 {
        let conn = state.db_connection.lock().unwrap();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        create_budget(food.id, YearMonth::new(2024, Month::January), 100.0, &conn)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn edit_page_renders_budget_fields() {
        let state = get_test_state();
        let budget_id = insert_budget(&state);

        let response = get_edit_budget_page(Path(budget_id), State(state))
            .await
            .expect("Could not render edit page");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body).to_string();
        assert!(text.contains("2024-01"));
        assert!(text.contains("Food"));
    }

    #[tokio::test]
    async fn edit_page_returns_not_found_for_missing_budget() {
        let state = get_test_state();

        let result = get_edit_budget_page(Path(42), State(state)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn can_update_budget_limit() {
        let state = get_test_state();
        let budget_id = insert_budget(&state);

        let form = BudgetForm {
            category_id: Some(1),
            month: "2024-01".to_string(),
            amount: 250.0,
        };
        let response = update_budget_endpoint(Path(budget_id), State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        assert_eq!(get_budget(budget_id, &conn).unwrap().amount, 250.0);
    }

    #[tokio::test]
    async fn update_missing_budget_returns_not_found() {
        let state = get_test_state();
        insert_budget(&state);

        let form = BudgetForm {
            category_id: Some(1),
            month: "2024-01".to_string(),
            amount: 250.0,
        };
        let response = update_budget_endpoint(Path(99), State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
