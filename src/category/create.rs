//! Category creation page and endpoint.

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

use crate::{
    AppState, Error, endpoints,
    category::{
        Category, CategoryId, CategoryName, create_category, domain::CategoryFormData,
        get_all_categories,
    },
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page(
    State(state): State<CreateCategoryEndpointState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let parent_options = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    Ok(new_category_view(&parent_options).into_response())
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => {
            return category_form_view(&form.name, form.parent_id, &[], &format!("Error: {error}"))
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_category(name, form.parent_id, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");

            error.into_alert_response()
        }
    }
}

fn new_category_view(parent_options: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW).into_html();
    let form = category_form_view("", None, parent_options, "");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Create Category" }
            (form)
        }
    };

    base("Create Category", &[], &content)
}

/// The shared category form. Used both for the create page and for
/// re-rendering with an error message after a rejected submission.
pub(super) fn category_form_view(
    name: &str,
    selected_parent: Option<CategoryId>,
    parent_options: &[Category],
    error_message: &str,
) -> Markup {
    let create_category_endpoint = endpoints::POST_CATEGORY;

    html! {
        form
            hx-post=(create_category_endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Category Name"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Category Name"
                    required
                    autofocus
                    value=(name)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (parent_select(selected_parent, None, parent_options))

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400"
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Category" }
        }
    }
}

/// A select element for choosing a parent category.
///
/// `exclude` removes a category from the options (the category being edited
/// cannot be its own parent).
pub(super) fn parent_select(
    selected_parent: Option<CategoryId>,
    exclude: Option<CategoryId>,
    parent_options: &[Category],
) -> Markup {
    html! {
        div
        {
            label
                for="parent_id"
                class=(FORM_LABEL_STYLE)
            {
                "Parent Category (optional)"
            }

            select
                id="parent_id"
                name="parent_id"
                class=(FORM_SELECT_STYLE)
            {
                option value="" selected[selected_parent.is_none()] { "None" }

                @for category in parent_options {
                    @if Some(category.id) != exclude {
                        option
                            value=(category.id)
                            selected[selected_parent == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod create_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        category::{
            create_category_table, domain::CategoryFormData, get_category,
        },
        endpoints,
    };

    use super::{CreateCategoryEndpointState, create_category_endpoint};

    fn get_category_state() -> CreateCategoryEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_category_table(&connection).expect("Could not create category table");

        CreateCategoryEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn can_create_category() {
        let state = get_category_state();
        let form = CategoryFormData {
            name: "Groceries".to_string(),
            parent_id: None,
        };

        let response = create_category_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(HX_REDIRECT)
            .expect("expected response to have the header hx-redirect");
        assert_eq!(location, endpoints::CATEGORIES_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let category = get_category(1, &connection).expect("Category should exist");
        assert_eq!(category.name.as_ref(), "Groceries");
    }

    #[tokio::test]
    async fn create_category_fails_on_empty_name() {
        let state = get_category_state();
        let form = CategoryFormData {
            name: "".to_string(),
            parent_id: None,
        };

        let response = create_category_endpoint(State(state), Form(form))
            .await
            .into_response();

        // The form is re-rendered with an error message.
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body).to_string();
        assert!(text.contains("Error: Category name cannot be empty"));
    }

    #[tokio::test]
    async fn create_category_fails_on_duplicate_name() {
        let state = get_category_state();
        let form = CategoryFormData {
            name: "Rent".to_string(),
            parent_id: None,
        };
        create_category_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        let duplicate_form = CategoryFormData {
            name: "Rent".to_string(),
            parent_id: None,
        };
        let response = create_category_endpoint(State(state), Form(duplicate_form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
