//! The 500 page served when a request fails unexpectedly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// Render the internal server error page with a description of what went
/// wrong and a hint for fixing it.
pub fn render_internal_server_error(description: &str, fix: &str) -> Response {
    let page = error_view("Internal Server Error", "500", description, fix);

    (StatusCode::INTERNAL_SERVER_ERROR, page).into_response()
}

#[cfg(test)]
mod internal_server_error_tests {
    use axum::http::StatusCode;

    use super::render_internal_server_error;

    #[test]
    fn returns_internal_server_error_status() {
        let response = render_internal_server_error("Sorry, something went wrong.", "Try again");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
