//! The 404 page served for unknown routes and missing resources.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// Route handler for unknown routes.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// Build the 404 response without going through a route handler.
pub fn get_404_not_found_response() -> Response {
    let page = error_view(
        "Not Found",
        "404",
        "Sorry, that page does not exist.",
        "Check the address, or head back to the dashboard.",
    );

    (StatusCode::NOT_FOUND, page).into_response()
}
