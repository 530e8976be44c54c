//! Ledger aggregation and transformation for the dashboard charts.

use std::collections::{BTreeSet, HashMap};

use crate::{
    budget::YearMonth,
    transaction::{LedgerEntry, TransactionKind},
};

/// The series label used for expenses without a category.
pub(super) const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// The unique months covered by `entries`, in chronological order.
pub(super) fn sorted_months(entries: &[LedgerEntry]) -> Vec<YearMonth> {
    entries
        .iter()
        .map(|entry| YearMonth::containing(entry.transaction.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Three-letter labels for the chart x-axis, e.g. "Jan".
pub(super) fn month_labels(months: &[YearMonth]) -> Vec<String> {
    use time::Month;

    months
        .iter()
        .map(|month| {
            match month.first_day().month() {
                Month::January => "Jan",
                Month::February => "Feb",
                Month::March => "Mar",
                Month::April => "Apr",
                Month::May => "May",
                Month::June => "Jun",
                Month::July => "Jul",
                Month::August => "Aug",
                Month::September => "Sep",
                Month::October => "Oct",
                Month::November => "Nov",
                Month::December => "Dec",
            }
            .to_string()
        })
        .collect()
}

/// Per-month income and expense totals, one entry per month in `months`.
///
/// Months without transactions of a kind contribute zero.
pub(super) fn monthly_totals_by_kind(
    entries: &[LedgerEntry],
    months: &[YearMonth],
) -> (Vec<f64>, Vec<f64>) {
    let mut income_by_month: HashMap<YearMonth, f64> = HashMap::new();
    let mut expense_by_month: HashMap<YearMonth, f64> = HashMap::new();

    for entry in entries {
        let month = YearMonth::containing(entry.transaction.date);
        let totals = match entry.transaction.kind {
            TransactionKind::Income => &mut income_by_month,
            TransactionKind::Expense => &mut expense_by_month,
        };

        *totals.entry(month).or_insert(0.0) += entry.transaction.amount;
    }

    let income = months
        .iter()
        .map(|month| income_by_month.get(month).copied().unwrap_or(0.0))
        .collect();
    let expense = months
        .iter()
        .map(|month| expense_by_month.get(month).copied().unwrap_or(0.0))
        .collect();

    (income, expense)
}

/// Groups expense entries by category and calculates monthly totals.
///
/// Only expenses are included. Returns data in a format suitable for ECharts
/// stacked bar charts, with the uncategorized series sorted last and `None`
/// for months without expenses in a category.
pub(super) fn group_monthly_expenses_by_category(
    entries: &[LedgerEntry],
    months: &[YearMonth],
) -> Vec<(String, Vec<Option<f64>>)> {
    let mut totals_by_category: HashMap<&str, HashMap<YearMonth, f64>> = HashMap::new();

    for entry in entries
        .iter()
        .filter(|entry| entry.transaction.kind == TransactionKind::Expense)
    {
        let category = entry
            .category_name
            .as_ref()
            .map(|name| name.as_ref())
            .unwrap_or(UNCATEGORIZED_LABEL);
        let month = YearMonth::containing(entry.transaction.date);

        *totals_by_category
            .entry(category)
            .or_default()
            .entry(month)
            .or_insert(0.0) += entry.transaction.amount;
    }

    let mut category_names: Vec<&str> = totals_by_category
        .keys()
        .copied()
        .filter(|&name| name != UNCATEGORIZED_LABEL)
        .collect();
    category_names.sort();

    if totals_by_category.contains_key(UNCATEGORIZED_LABEL) {
        category_names.push(UNCATEGORIZED_LABEL);
    }

    category_names
        .into_iter()
        .map(|name| {
            let totals = &totals_by_category[name];
            let monthly_data = months
                .iter()
                .map(|month| totals.get(month).copied())
                .collect();

            (name.to_owned(), monthly_data)
        })
        .collect()
}

#[cfg(test)]
mod aggregation_tests {
    use time::macros::date;

    use crate::{
        budget::YearMonth,
        category::CategoryName,
        transaction::{LedgerEntry, Transaction, TransactionKind},
    };

    use super::{
        UNCATEGORIZED_LABEL, group_monthly_expenses_by_category, month_labels,
        monthly_totals_by_kind, sorted_months,
    };

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
    fn sorted_months_are_unique_and_chronological() {
        let entries = vec![
            entry(1.0, TransactionKind::Expense, date!(2024 - 03 - 15), None),
            entry(1.0, TransactionKind::Income, date!(2024 - 01 - 20), None),
            entry(1.0, TransactionKind::Expense, date!(2024 - 02 - 10), None),
            entry(1.0, TransactionKind::Expense, date!(2024 - 01 - 25), None),
        ];

        let months = sorted_months(&entries);

        assert_eq!(
            months,
            vec![
                "2024-01".parse::<YearMonth>().unwrap(),
                "2024-02".parse().unwrap(),
                "2024-03".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn month_labels_are_three_letter_abbreviations() {
        let months = vec![
            "2023-12".parse::<YearMonth>().unwrap(),
            "2024-01".parse().unwrap(),
        ];

        assert_eq!(month_labels(&months), vec!["Dec", "Jan"]);
    }

    #[test]
    fn totals_by_kind_split_income_and_expense() {
        let entries = vec![
            entry(100.0, TransactionKind::Income, date!(2024 - 01 - 15), None),
            entry(40.0, TransactionKind::Expense, date!(2024 - 01 - 20), None),
            entry(10.0, TransactionKind::Expense, date!(2024 - 01 - 21), None),
            entry(30.0, TransactionKind::Expense, date!(2024 - 02 - 10), None),
        ];
        let months = sorted_months(&entries);

        let (income, expense) = monthly_totals_by_kind(&entries, &months);

        assert_eq!(income, vec![100.0, 0.0]);
        assert_eq!(expense, vec![50.0, 30.0]);
    }

    #[test]
    fn expenses_are_grouped_by_category() {
        let entries = vec![
            entry(100.0, TransactionKind::Expense, date!(2024 - 01 - 15), Some("Food")),
            entry(50.0, TransactionKind::Expense, date!(2024 - 01 - 20), Some("Transport")),
            entry(30.0, TransactionKind::Expense, date!(2024 - 02 - 10), Some("Food")),
            // Income is ignored even when categorized.
            entry(200.0, TransactionKind::Income, date!(2024 - 01 - 10), Some("Food")),
        ];
        let months = vec![
            "2024-01".parse::<YearMonth>().unwrap(),
            "2024-02".parse().unwrap(),
        ];

        let result = group_monthly_expenses_by_category(&entries, &months);

        assert_eq!(result.len(), 2);

        let food = result.iter().find(|(name, _)| name == "Food").unwrap();
        assert_eq!(food.1, vec![Some(100.0), Some(30.0)]);

        let transport = result.iter().find(|(name, _)| name == "Transport").unwrap();
        assert_eq!(transport.1, vec![Some(50.0), None]);
    }

    #[test]
    fn uncategorized_expenses_are_sorted_last() {
        let entries = vec![
            entry(100.0, TransactionKind::Expense, date!(2024 - 01 - 15), Some("Zebra")),
            entry(50.0, TransactionKind::Expense, date!(2024 - 01 - 20), None),
            entry(30.0, TransactionKind::Expense, date!(2024 - 01 - 10), Some("Alpha")),
        ];
        let months = vec!["2024-01".parse::<YearMonth>().unwrap()];

        let result = group_monthly_expenses_by_category(&entries, &months);

        let names: Vec<&str> = result.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zebra", UNCATEGORIZED_LABEL]);
    }
}
