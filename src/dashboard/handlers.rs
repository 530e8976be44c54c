//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::{BudgetReport, BudgetThresholds, YearMonth, evaluate_month},
    dashboard::{
        cards::{budget_alerts_view, summary_cards},
        charts::{
            DashboardChart, charts_script, charts_view, expenses_by_category_chart,
            income_expense_chart,
        },
    },
    endpoints,
    html::{HeadElement, base, link},
    navigation::NavBar,
    timezone::local_date_today,
    transaction::{KindFilter, LedgerEntry, LedgerFilter, LedgerTotals, get_ledger,
        get_ledger_totals},
};

/// How many months of history the charts cover, including the current month.
const CHART_MONTHS: usize = 12;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the ledger and budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub budget_thresholds: BudgetThresholds,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            budget_thresholds: state.budget_thresholds,
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    current_month: YearMonth,
    month_totals: LedgerTotals,
    budget_reports: Vec<BudgetReport>,
    charts: [DashboardChart; 2],
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(State(state): State<DashboardState>) -> Result<Response, Error> {
    let today = local_date_today(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezone(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW);

    match build_dashboard_data(today, state.budget_thresholds, &connection)? {
        Some(data) => Ok(dashboard_view(nav_bar, &data).into_response()),
        None => Ok(dashboard_no_data_view(nav_bar).into_response()),
    }
}

/// Fetches and builds all data needed for the dashboard display.
///
/// Returns `None` when the ledger has no transactions in the chart window.
fn build_dashboard_data(
    today: time::Date,
    thresholds: BudgetThresholds,
    connection: &Connection,
) -> Result<Option<DashboardData>, Error> {
    let current_month = YearMonth::containing(today);

    let mut window_start = current_month;
    for _ in 1..CHART_MONTHS {
        window_start = window_start.previous();
    }

    let chart_filter = LedgerFilter {
        date_from: Some(window_start.first_day()),
        date_to: Some(today),
        ..Default::default()
    };
    let entries = get_ledger(&chart_filter, connection)
        .inspect_err(|error| tracing::error!("could not get chart entries: {error}"))?;

    if entries.is_empty() {
        return Ok(None);
    }

    let month_filter = LedgerFilter {
        date_from: Some(current_month.first_day()),
        date_to: Some(current_month.last_day()),
        kind: KindFilter::All,
        ..Default::default()
    };
    let month_totals = get_ledger_totals(&month_filter, connection)
        .inspect_err(|error| tracing::error!("could not get month totals: {error}"))?;

    let budget_reports = evaluate_month(current_month, thresholds, connection)
        .inspect_err(|error| tracing::error!("could not evaluate budgets: {error}"))?;

    let charts = build_dashboard_charts(&entries);

    Ok(Some(DashboardData {
        current_month,
        month_totals,
        budget_reports,
        charts,
    }))
}

/// Creates the array of dashboard charts from ledger data.
fn build_dashboard_charts(entries: &[LedgerEntry]) -> [DashboardChart; 2] {
    [
        DashboardChart {
            id: "income-expense-chart",
            options: income_expense_chart(entries).to_string(),
        },
        DashboardChart {
            id: "expenses-chart",
            options: expenses_by_category_chart(entries).to_string(),
        },
    ]
}

/// Renders the dashboard page when no transaction data exists.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_transaction_link = link(endpoints::NEW_TRANSACTION_VIEW, "add your first transaction");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts and summaries will show up here once you "
                (new_transaction_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the main dashboard page with cards, budget alerts and charts.
fn dashboard_view(nav_bar: NavBar, data: &DashboardData) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (summary_cards(data.current_month, data.month_totals))

            (budget_alerts_view(&data.budget_reports))

            (charts_view(&data.charts))
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(&data.charts),
    ];

    base("Dashboard", &scripts, &content)
}
