//! Chart generation and rendering for the dashboard.
//!
//! Two ECharts visualizations are produced:
//! - **Income vs. Expenses**: grouped monthly bars over the last year
//! - **Monthly Expenses**: stacked bars grouped by category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization
//! code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::aggregation::{
        group_monthly_expenses_by_category, month_labels, monthly_totals_by_kind, sorted_months,
    },
    html::HeadElement,
    transaction::LedgerEntry,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// The theme follows the `dark` class on the document element, which
/// `theme.js` flips and announces with a `themechange` event.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const updateTheme = () => {{
                        const isDarkMode = document.documentElement.classList.contains('dark');
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    window.addEventListener('themechange', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

pub(super) fn income_expense_chart(entries: &[LedgerEntry]) -> Chart {
    let months = sorted_months(entries);
    let labels = month_labels(&months);
    let (income, expense) = monthly_totals_by_kind(entries, &months);

    Chart::new()
        .title(
            Title::new()
                .text("Income vs. Expenses")
                .subtext("Last twelve months"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().top("1%").right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(bar::Bar::new().name("Income").data(income))
        .series(bar::Bar::new().name("Expenses").data(expense))
}

pub(super) fn expenses_by_category_chart(entries: &[LedgerEntry]) -> Chart {
    let months = sorted_months(entries);
    let labels = month_labels(&months);
    let series_data = group_monthly_expenses_by_category(entries, &months);

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Monthly Expenses")
                .subtext("Last twelve months, grouped by category")
                .left(20)
                .top("1%"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for (category, data) in series_data {
        chart = chart.series(
            bar::Bar::new()
                .name(category)
                .stack("Expenses")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(data),
        );
    }

    chart
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod charts_tests {
    use time::macros::date;

    use crate::{
        category::CategoryName,
        transaction::{LedgerEntry, Transaction, TransactionKind},
    };

    use super::{expenses_by_category_chart, income_expense_chart};

    fn entry(
        amount: f64,
        kind: TransactionKind,
        date: time::Date,
        category: Option<&str>,
    ) -> LedgerEntry {
        LedgerEntry {
            transaction: Transaction {
                id: 0,
                amount,
                kind,
                date,
                description: String::new(),
                category_id: None,
            },
            category_name: category.map(CategoryName::new_unchecked),
        }
    }

    #[test]
    fn income_expense_chart_contains_both_series() {
        let entries = vec![
            entry(100.0, TransactionKind::Income, date!(2024 - 01 - 15), None),
            entry(40.0, TransactionKind::Expense, date!(2024 - 01 - 20), None),
        ];

        let options = income_expense_chart(&entries).to_string();

        assert!(options.contains("Income"));
        assert!(options.contains("Expenses"));
        assert!(options.contains("Jan"));
    }

    #[test]
    fn category_chart_has_one_series_per_category() {
        let entries = vec![
            entry(100.0, TransactionKind::Expense, date!(2024 - 01 - 15), Some("Food")),
            entry(40.0, TransactionKind::Expense, date!(2024 - 01 - 20), Some("Transport")),
        ];

        let options = expenses_by_category_chart(&entries).to_string();

        assert!(options.contains("Food"));
        assert!(options.contains("Transport"));
    }
}
