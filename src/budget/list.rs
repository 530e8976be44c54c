//! Budgets listing page for one month.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    budget::{
        BudgetReport, BudgetStatus, BudgetThresholds, YearMonth, evaluator::evaluate_month,
    },
    html::{
        CATEGORY_BADGE_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, edit_delete_action_links,
        format_currency,
    },
    navigation::NavBar,
    timezone::local_date_today,
};

/// The raw query parameters of the budgets page.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetsQueryParams {
    /// The month to display, as `YYYY-MM`. Defaults to the current month.
    pub month: Option<String>,
}

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub budget_thresholds: BudgetThresholds,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            budget_thresholds: state.budget_thresholds,
        }
    }
}

/// Render the budgets of a month with their spending status.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Query(query_params): Query<BudgetsQueryParams>,
) -> Result<Response, Error> {
    let today = local_date_today(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezone(state.local_timezone.clone()))?;
    let current_month = YearMonth::containing(today);

    let (month, month_error) = match query_params.month.as_deref() {
        None => (current_month, None),
        Some(raw) if raw.trim().is_empty() => (current_month, None),
        Some(raw) => match raw.parse() {
            Ok(month) => (month, None),
            Err(error @ Error::InvalidMonth(_)) => (current_month, Some(error.to_string())),
            Err(error) => return Err(error),
        },
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let reports = evaluate_month(month, state.budget_thresholds, &connection)
        .inspect_err(|error| tracing::error!("could not evaluate budgets: {error}"))?;

    Ok(budgets_view(month, &reports, month_error.as_deref()).into_response())
}

fn month_url(month: YearMonth) -> String {
    format!("{}?month={month}", endpoints::BUDGETS_VIEW)
}

fn budgets_view(month: YearMonth, reports: &[BudgetReport], month_error: Option<&str>) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 lg:max-w-5xl lg:w-full lg:mx-auto"
            {
                header class="flex justify-between flex-wrap items-end gap-2"
                {
                    h1 class="text-xl font-bold" { "Budgets" }

                    a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE)
                    {
                        "Create Budget"
                    }
                }

                @if let Some(message) = month_error {
                    p
                        class="p-3 rounded border text-red-800 bg-red-50 border-red-300
                            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
                    {
                        (message) ". Showing the current month instead."
                    }
                }

                (month_navigation(month))

                (budgets_table(reports))
            }
        }
    );

    base("Budgets", &[], &content)
}

fn month_navigation(month: YearMonth) -> Markup {
    html!(
        div class="flex items-center gap-4"
        {
            a href=(month_url(month.previous())) class=(LINK_STYLE) { "← Previous" }

            form method="get" action=(endpoints::BUDGETS_VIEW) class="flex items-center gap-2"
            {
                input
                    type="month"
                    name="month"
                    value=(month)
                    onchange="this.form.submit()"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            a href=(month_url(month.next())) class=(LINK_STYLE) { "Next →" }
        }
    )
}

fn status_badge(status: BudgetStatus) -> Markup {
    let style = match status {
        BudgetStatus::Ok => {
            "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold rounded-full
            text-green-800 bg-green-100 dark:bg-green-900 dark:text-green-300"
        }
        BudgetStatus::Warning => {
            "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold rounded-full
            text-yellow-800 bg-yellow-100 dark:bg-yellow-900 dark:text-yellow-300"
        }
        BudgetStatus::Over => {
            "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold rounded-full
            text-red-800 bg-red-100 dark:bg-red-900 dark:text-red-300"
        }
    };

    html!( span class=(style) { (status.label()) } )
}

/// A bar showing spend as a share of the limit, capped at full width.
pub(super) fn spend_progress_bar(spent: f64, limit: f64, status: BudgetStatus) -> Markup {
    let percentage = if limit > 0.0 {
        (spent / limit * 100.0).clamp(0.0, 100.0)
    } else if spent > 0.0 {
        100.0
    } else {
        0.0
    };

    let bar_color = match status {
        BudgetStatus::Ok => "bg-green-500",
        BudgetStatus::Warning => "bg-yellow-500",
        BudgetStatus::Over => "bg-red-500",
    };

    html! {
        div
            class="w-full bg-gray-200 dark:bg-gray-700 rounded-full h-2.5"
            role="progressbar"
            aria-valuenow=(format!("{percentage:.0}"))
            aria-valuemin="0"
            aria-valuemax="100"
        {
            @if percentage > 0.0 {
                div
                    class=(format!("{bar_color} h-2.5 rounded-full"))
                    style=(format!("width: {percentage:.1}%"))
                {}
            }
        }
    }
}

fn budgets_table(reports: &[BudgetReport]) -> Markup {
    let table_row = |report: &BudgetReport| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, report.budget.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_BUDGET, report.budget.id);
        let confirm_message = format!(
            "Are you sure you want to delete the {} budget for {}?",
            report.category_name, report.budget.month,
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(CATEGORY_BADGE_STYLE) { (report.category_name) }
                }

                td class=(format!("{TABLE_CELL_STYLE} tabular-nums"))
                {
                    (format_currency(report.budget.amount))
                }

                td class=(format!("{TABLE_CELL_STYLE} tabular-nums"))
                {
                    (format_currency(report.spent))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="space-y-2 min-w-32"
                    {
                        (status_badge(report.status))
                        (spend_progress_bar(report.spent, report.budget.amount, report.status))
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                        ))
                    }
                }
            }
        )
    };

    html!(
        section class="dark:bg-gray-800"
        {
            table class="w-full text-sm text-left rtl:text-right
                text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Limit" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for report in reports {
                        (table_row(report))
                    }

                    @if reports.is_empty() {
                        tr
                        {
                            td
                                colspan="5"
                                class="px-6 py-4 text-center
                                    text-gray-500 dark:text-gray-400"
                            {
                                "No budgets for this month. "
                                a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE)
                                {
                                    "Create your first budget"
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}
