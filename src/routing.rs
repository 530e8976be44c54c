//! Application router configuration.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_page, get_edit_budget_page,
        get_new_budget_page, update_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_edit_category_page, get_new_category_page, update_category_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    logging::logging_middleware,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, export_transactions,
        get_edit_transaction_page, get_new_transaction_page, get_transactions_page,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::EXPORT_TRANSACTIONS, get(export_transactions))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::NEW_BUDGET_VIEW, get(get_new_budget_page))
        .route(endpoints::EDIT_BUDGET_VIEW, get(get_edit_budget_page));

    let api_routes = Router::new()
        .route(
            endpoints::POST_TRANSACTION,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::PUT_TRANSACTION,
            put(update_transaction_endpoint),
        )
        .route(
            endpoints::DELETE_TRANSACTION,
            delete(delete_transaction_endpoint),
        )
        .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
        .route(endpoints::PUT_CATEGORY, put(update_category_endpoint))
        .route(endpoints::DELETE_CATEGORY, delete(delete_category_endpoint))
        .route(endpoints::POST_BUDGET, post(create_budget_endpoint))
        .route(endpoints::PUT_BUDGET, put(update_budget_endpoint))
        .route(endpoints::DELETE_BUDGET, delete(delete_budget_endpoint))
        .layer(middleware::from_fn(logging_middleware));

    page_routes
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod build_router_tests {
    use rusqlite::Connection;

    use crate::{AppState, budget::BudgetThresholds};

    use super::build_router;

    // Axum panics at route-registration time for malformed paths or
    // conflicting routes, so building the router at all is the test.
    #[test]
    fn all_routes_register() {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, "Etc/UTC", BudgetThresholds::default())
            .expect("Could not create app state");

        let _router = build_router(state);
    }
}
