//! The ledger query engine: filtered, sorted transaction listings and the
//! aggregate totals computed over the same filtered set.

use rusqlite::{Connection, params_from_iter, types::ToSql};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    category::{CategoryId, CategoryName},
    transaction::core::{Transaction, map_transaction_row},
};

/// Which transaction kinds a ledger query matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    /// Match income and expense transactions alike.
    #[default]
    All,
    Income,
    Expense,
}

impl KindFilter {
    /// The value used in query strings.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// The recognized options for filtering the ledger.
///
/// Every field is optional; the default filter matches the whole ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerFilter {
    /// Match transactions on or after this date.
    pub date_from: Option<Date>,
    /// Match transactions on or before this date.
    pub date_to: Option<Date>,
    /// Match only income, only expenses, or both.
    pub kind: KindFilter,
    /// Match only transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Match transactions whose description contains this text,
    /// case-insensitively.
    pub search: Option<String>,
}

impl LedgerFilter {
    /// The query string encoding of this filter, used to build the CSV export
    /// link and keep the filter form stable across navigation.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();

        if let Some(date_from) = self.date_from {
            pairs.push(format!("date_from={date_from}"));
        }

        if let Some(date_to) = self.date_to {
            pairs.push(format!("date_to={date_to}"));
        }

        if self.kind != KindFilter::All {
            pairs.push(format!("type={}", self.kind.as_query_value()));
        }

        if let Some(category_id) = self.category_id {
            pairs.push(format!("category_id={category_id}"));
        }

        if let Some(search) = &self.search {
            let encoded: String = search
                .bytes()
                .map(|byte| match byte {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                        (byte as char).to_string()
                    }
                    b' ' => "+".to_string(),
                    other => format!("%{other:02X}"),
                })
                .collect();
            pairs.push(format!("search={encoded}"));
        }

        pairs.join("&")
    }
}

/// A transaction together with the name of its category, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub category_name: Option<CategoryName>,
}

/// The three aggregate sums over a filtered ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    /// The sum of income amounts in the filtered set.
    pub income: f64,
    /// The sum of expense amounts in the filtered set.
    pub expense: f64,
}

impl LedgerTotals {
    /// Income minus expenses.
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// The WHERE clause and its bound parameters for a [LedgerFilter].
struct FilterSql {
    clause: String,
    params: Vec<Box<dyn ToSql>>,
}

fn build_filter_sql(filter: &LedgerFilter) -> FilterSql {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(date_from) = filter.date_from {
        params.push(Box::new(date_from));
        conditions.push(format!("\"transaction\".date >= ?{}", params.len()));
    }

    if let Some(date_to) = filter.date_to {
        params.push(Box::new(date_to));
        conditions.push(format!("\"transaction\".date <= ?{}", params.len()));
    }

    match filter.kind {
        KindFilter::All => {}
        kind => {
            params.push(Box::new(kind.as_query_value()));
            conditions.push(format!("\"transaction\".kind = ?{}", params.len()));
        }
    }

    if let Some(category_id) = filter.category_id {
        params.push(Box::new(category_id));
        conditions.push(format!("\"transaction\".category_id = ?{}", params.len()));
    }

    if let Some(search) = &filter.search {
        params.push(Box::new(search.clone()));
        // instr does plain substring containment, so wildcard characters in
        // the search text are matched literally. SQLite's lower() only folds
        // ASCII.
        conditions.push(format!(
            "instr(lower(\"transaction\".description), lower(?{})) > 0",
            params.len()
        ));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    FilterSql { clause, params }
}

/// Get the transactions matching `filter`, most recent first.
///
/// Results are sorted by date and then by ID so the order stays stable after
/// edits. Each entry carries its category name for display.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_ledger(filter: &LedgerFilter, connection: &Connection) -> Result<Vec<LedgerEntry>, Error> {
    let filter_sql = build_filter_sql(filter);

    let query = format!(
        "SELECT \"transaction\".id, amount, kind, \"transaction\".date, description, \
            \"transaction\".category_id, category.name \
        FROM \"transaction\" \
        LEFT JOIN category ON \"transaction\".category_id = category.id\
        {} \
        ORDER BY \"transaction\".date DESC, \"transaction\".id DESC",
        filter_sql.clause
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(filter_sql.params.iter()), |row| {
            let transaction = map_transaction_row(row)?;
            let category_name = row
                .get::<usize, Option<String>>(6)?
                .map(|name| CategoryName::new_unchecked(&name));

            Ok(LedgerEntry {
                transaction,
                category_name,
            })
        })?
        .map(|entry_result| entry_result.map_err(Error::SqlError))
        .collect()
}

/// Compute the income, expense and net sums over exactly the set of
/// transactions matching `filter`.
///
/// Sums over an empty result set are zero.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_ledger_totals(
    filter: &LedgerFilter,
    connection: &Connection,
) -> Result<LedgerTotals, Error> {
    let filter_sql = build_filter_sql(filter);

    let query = format!(
        "SELECT \
            COALESCE(SUM(CASE WHEN kind = 'income' THEN amount END), 0.0), \
            COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount END), 0.0) \
        FROM \"transaction\"{}",
        filter_sql.clause
    );

    let totals = connection.prepare(&query)?.query_row(
        params_from_iter(filter_sql.params.iter()),
        |row| {
            Ok(LedgerTotals {
                income: row.get(0)?,
                expense: row.get(1)?,
            })
        },
    )?;

    Ok(totals)
}
