//! Summary cards and budget alerts for the dashboard.

use maud::{Markup, html};

use crate::{
    budget::{BudgetReport, BudgetStatus, YearMonth},
    endpoints,
    html::{LINK_STYLE, format_currency},
    transaction::LedgerTotals,
};

/// Renders the income/expense/net cards for the current month.
pub(super) fn summary_cards(month: YearMonth, totals: LedgerTotals) -> Markup {
    let card = |label: &str, amount: f64, amount_style: &str| {
        html!(
            div
                class="bg-white dark:bg-gray-800 border border-gray-200
                    dark:border-gray-700 rounded-lg p-4 shadow-md"
            {
                div class="text-sm text-gray-600 dark:text-gray-400" { (label) }
                div class=(format!("text-3xl font-bold {amount_style}"))
                {
                    (format_currency(amount))
                }
            }
        )
    };

    let net = totals.net();
    let net_style = if net < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-green-600 dark:text-green-400"
    };

    html!(
        section class="w-full mx-auto mb-4" aria-label=(format!("Summary for {month}"))
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "This Month" }
                span class="text-sm text-gray-600 dark:text-gray-400" { (month) }
            }

            div class="grid grid-cols-1 sm:grid-cols-3 gap-4"
            {
                (card("Income", totals.income, "text-green-600 dark:text-green-400"))
                (card("Expenses", totals.expense, "text-red-600 dark:text-red-400"))
                (card("Net", net, net_style))
            }
        }
    )
}

/// Renders the budget alert list for the current month.
///
/// Budgets that are on track are summarized in one line; warning and
/// over-budget categories each get an alert row.
pub(super) fn budget_alerts_view(reports: &[BudgetReport]) -> Markup {
    if reports.is_empty() {
        return html!(
            section class="w-full mx-auto mb-4"
            {
                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "No budgets set for this month. "
                    a href=(endpoints::BUDGETS_VIEW) class=(LINK_STYLE) { "Set up budgets" }
                }
            }
        );
    }

    let alerts: Vec<&BudgetReport> = reports
        .iter()
        .filter(|report| report.status != BudgetStatus::Ok)
        .collect();
    let on_track_count = reports.len() - alerts.len();

    let alert_row = |report: &BudgetReport| {
        let (row_style, text) = match report.status {
            BudgetStatus::Over => (
                "p-3 rounded border text-red-800 bg-red-50 border-red-300
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800",
                format!(
                    "{} is over budget: {} spent of {}",
                    report.category_name,
                    format_currency(report.spent),
                    format_currency(report.budget.amount),
                ),
            ),
            _ => (
                "p-3 rounded border text-yellow-800 bg-yellow-50 border-yellow-300
                dark:bg-gray-800 dark:text-yellow-300 dark:border-yellow-800",
                format!(
                    "{} is nearing its budget: {} spent of {}",
                    report.category_name,
                    format_currency(report.spent),
                    format_currency(report.budget.amount),
                ),
            ),
        };

        html!( p class=(row_style) { (text) } )
    };

    html!(
        section class="w-full mx-auto mb-4" aria-label="Budget alerts"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Budgets" }
                a href=(endpoints::BUDGETS_VIEW) class=(LINK_STYLE) { "Manage budgets" }
            }

            div class="space-y-2"
            {
                @for report in &alerts {
                    (alert_row(report))
                }

                @if on_track_count > 0 {
                    p class="text-sm text-gray-600 dark:text-gray-400"
                    {
                        (on_track_count) " budget(s) on track."
                    }
                }
            }
        }
    )
}
