//! Alert fragments for displaying success and error messages to users.
//!
//! Forms point `hx-target-error` at the `#alert-container` element in the
//! base layout; these fragments are what lands there.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// A dismissable message rendered into the page's alert container.
#[derive(Debug, Clone)]
pub struct Alert {
    status_code: StatusCode,
    is_error: bool,
    message: String,
    details: String,
}

impl Alert {
    /// Create a success alert.
    pub fn success(message: &str) -> Self {
        Self {
            status_code: StatusCode::OK,
            is_error: false,
            message: message.to_owned(),
            details: String::new(),
        }
    }

    /// Create an error alert with the given response status.
    pub fn error(status_code: StatusCode, message: &str, details: &str) -> Self {
        Self {
            status_code,
            is_error: true,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    fn into_markup(self) -> Markup {
        let container_style = if self.is_error {
            "flex items-start gap-3 p-4 mb-4 rounded-lg border
            text-red-800 bg-red-50 border-red-300
            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "flex items-start gap-3 p-4 mb-4 rounded-lg border
            text-green-800 bg-green-50 border-green-300
            dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html!(
            div class=(container_style) role="alert"
            {
                div class="flex-1"
                {
                    p class="font-medium" { (self.message) }

                    @if !self.details.is_empty() {
                        p class="mt-1 text-sm" { (self.details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="font-bold bg-transparent border-none cursor-pointer"
                    onclick="this.closest('[role=alert]').remove();
                        document.getElementById('alert-container').classList.add('hidden');"
                {
                    "✕"
                }
            }

            script
            {
                "document.getElementById('alert-container').classList.remove('hidden');"
            }
        )
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        let status_code = self.status_code;

        (status_code, self.into_markup()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Alert;

    #[test]
    fn success_alert_is_ok() {
        let response = Alert::success("Saved").into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn error_alert_keeps_status() {
        let response =
            Alert::error(StatusCode::NOT_FOUND, "Missing", "Nothing here").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn renders_message_and_details() {
        let markup = Alert::error(StatusCode::BAD_REQUEST, "Invalid amount", "Enter a number")
            .into_markup()
            .into_string();

        assert!(markup.contains("Invalid amount"));
        assert!(markup.contains("Enter a number"));
    }
}
