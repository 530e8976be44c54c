//! Defines the route handler for the page that displays the filtered ledger.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error, endpoints,
    category::{Category, get_all_categories},
    html::{
        CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_currency, truncate_text,
    },
    navigation::NavBar,
    transaction::{
        KindFilter, LedgerEntry, LedgerFilter, LedgerTotals, TransactionKind, get_ledger,
        get_ledger_totals,
    },
};

/// How many grapheme clusters of a description to show in the table.
const DESCRIPTION_PREVIEW_LENGTH: usize = 50;

/// The raw, user-supplied query parameters of the transactions page.
///
/// Everything arrives as optional text because HTML GET forms submit empty
/// fields as empty strings. [LedgerQueryParams::into_filter] normalizes them.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LedgerQueryParams {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category_id: Option<String>,
    pub search: Option<String>,
}

impl LedgerQueryParams {
    /// Normalize the raw query parameters into a [LedgerFilter].
    ///
    /// Empty fields are treated as absent. Unrecognized type and category
    /// values fall back to matching everything, but a malformed date is an
    /// error so the user finds out their filter did not apply.
    pub fn into_filter(self) -> Result<LedgerFilter, Error> {
        let date_from = parse_optional_date(self.date_from)?;
        let date_to = parse_optional_date(self.date_to)?;

        let kind = match self.kind.as_deref() {
            Some("income") => KindFilter::Income,
            Some("expense") => KindFilter::Expense,
            _ => KindFilter::All,
        };

        let category_id = self
            .category_id
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|&id| id > 0);

        let search = self
            .search
            .map(|raw| raw.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(LedgerFilter {
            date_from,
            date_to,
            kind,
            category_id,
            search,
        })
    }
}

fn parse_optional_date(raw: Option<String>) -> Result<Option<Date>, Error> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| Error::InvalidDate(trimmed.to_string()))
}

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the filtered ledger with its totals.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Query(query_params): Query<LedgerQueryParams>,
) -> Result<Response, Error> {
    // A malformed filter is reported on the page rather than applied; the
    // rest of the page falls back to the unfiltered ledger.
    let (filter, filter_error) = match query_params.into_filter() {
        Ok(filter) => (filter, None),
        Err(error) => (LedgerFilter::default(), Some(error.to_string())),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let entries = get_ledger(&filter, &connection)
        .inspect_err(|error| tracing::error!("could not get ledger entries: {error}"))?;

    let totals = get_ledger_totals(&filter, &connection)
        .inspect_err(|error| tracing::error!("could not get ledger totals: {error}"))?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;

    Ok(
        transactions_view(&entries, totals, &filter, &categories, filter_error.as_deref())
            .into_response(),
    )
}

fn transactions_view(
    entries: &[LedgerEntry],
    totals: LedgerTotals,
    filter: &LedgerFilter,
    categories: &[Category],
    filter_error: Option<&str>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let query_string = filter.to_query_string();
    let export_url = if query_string.is_empty() {
        endpoints::EXPORT_TRANSACTIONS.to_owned()
    } else {
        format!("{}?{query_string}", endpoints::EXPORT_TRANSACTIONS)
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 lg:max-w-5xl lg:w-full lg:mx-auto"
            {
                header class="flex justify-between flex-wrap items-end gap-2"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    div class="flex gap-4"
                    {
                        a href=(export_url) class=(LINK_STYLE) { "Export CSV" }
                        a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                        {
                            "New Transaction"
                        }
                    }
                }

                @if let Some(message) = filter_error {
                    p
                        class="p-3 rounded border text-red-800 bg-red-50 border-red-300
                            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
                    {
                        (message) ". Showing all transactions instead."
                    }
                }

                (filter_form(filter, categories))

                (totals_row(totals))

                (ledger_table(entries))
            }
        }
    );

    base("Transactions", &[], &content)
}

fn filter_form(filter: &LedgerFilter, categories: &[Category]) -> Markup {
    let kind_option = |value: KindFilter, label: &str| {
        html!(
            option
                value=(value.as_query_value())
                selected[filter.kind == value]
            {
                (label)
            }
        )
    };

    html!(
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="grid grid-cols-2 lg:grid-cols-6 gap-3 items-end
                bg-gray-50 dark:bg-gray-800 p-4 rounded-lg"
        {
            div
            {
                label for="date_from" class=(FORM_LABEL_STYLE) { "From" }
                input
                    id="date_from"
                    type="date"
                    name="date_from"
                    value=[filter.date_from]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date_to" class=(FORM_LABEL_STYLE) { "To" }
                input
                    id="date_to"
                    type="date"
                    name="date_to"
                    value=[filter.date_to]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                select id="type" name="type" class=(FORM_SELECT_STYLE)
                {
                    (kind_option(KindFilter::All, "All"))
                    (kind_option(KindFilter::Income, "Income"))
                    (kind_option(KindFilter::Expense, "Expense"))
                }
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }
                select id="category_id" name="category_id" class=(FORM_SELECT_STYLE)
                {
                    option value="" selected[filter.category_id.is_none()] { "All" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[filter.category_id == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="search" class=(FORM_LABEL_STYLE) { "Search" }
                input
                    id="search"
                    type="text"
                    name="search"
                    placeholder="Description contains…"
                    value=[filter.search.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button
                type="submit"
                class="px-4 py-2.5 bg-blue-500 dark:bg-blue-600 hover:bg-blue-600
                    hover:dark:bg-blue-700 text-white rounded text-sm"
            {
                "Apply Filters"
            }
        }
    )
}

fn totals_row(totals: LedgerTotals) -> Markup {
    let card = |label: &str, amount: f64, amount_style: &str| {
        html!(
            div
                class="bg-white dark:bg-gray-800 border border-gray-200
                    dark:border-gray-700 rounded-lg p-4 shadow-sm"
            {
                div class="text-sm text-gray-600 dark:text-gray-400" { (label) }
                div class=(format!("text-2xl font-bold {amount_style}")) { (format_currency(amount)) }
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
        section class="grid grid-cols-1 sm:grid-cols-3 gap-4" aria-label="Totals"
        {
            (card("Income", totals.income, "text-green-600 dark:text-green-400"))
            (card("Expenses", totals.expense, "text-red-600 dark:text-red-400"))
            (card("Net", net, net_style))
        }
    )
}

fn ledger_table(entries: &[LedgerEntry]) -> Markup {
    let table_row = |entry: &LedgerEntry| {
        let transaction = &entry.transaction;
        let edit_url =
            endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_TRANSACTION, transaction.id);
        let confirm_message = format!(
            "Are you sure you want to delete the {} transaction of {} on {}?",
            transaction.kind.as_str(),
            format_currency(transaction.amount),
            transaction.date,
        );

        let kind_style = match transaction.kind {
            TransactionKind::Income => "text-green-600 dark:text-green-400",
            TransactionKind::Expense => "text-red-600 dark:text-red-400",
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }

                td class=(format!("{TABLE_CELL_STYLE} {kind_style}"))
                {
                    (transaction.kind.label())
                }

                td class=(TABLE_CELL_STYLE)
                {
                    @if let Some(category_name) = &entry.category_name {
                        span class=(CATEGORY_BADGE_STYLE) { (category_name) }
                    } @else {
                        "—"
                    }
                }

                td class=(format!("{TABLE_CELL_STYLE} tabular-nums"))
                {
                    (format_currency(transaction.amount))
                }

                td class=(TABLE_CELL_STYLE) title=(transaction.description)
                {
                    (truncate_text(&transaction.description, DESCRIPTION_PREVIEW_LENGTH))
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
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for entry in entries {
                        (table_row(entry))
                    }

                    @if entries.is_empty() {
                        tr
                        {
                            td
                                colspan="6"
                                class="px-6 py-4 text-center
                                    text-gray-500 dark:text-gray-400"
                            {
                                "No transactions match the current filters. "
                                a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                                {
                                    "Add a transaction"
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}
