//! The budget evaluator: compares summed monthly expenses against configured
//! limits and classifies the result.

use rusqlite::Connection;

use crate::{
    Error,
    budget::{Budget, YearMonth, get_budget_for, get_budgets_for_month},
    category::{CategoryId, CategoryName, get_category},
    transaction::{KindFilter, LedgerFilter, get_ledger_totals},
};

/// The thresholds used to classify spending against a budget limit.
///
/// The exact warning point is a configuration concern, not an invariant; the
/// only rule is that the bands stay monotonic, which [BudgetThresholds::new]
/// enforces by requiring the ratio to lie in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetThresholds {
    warning_ratio: f64,
}

impl BudgetThresholds {
    /// The fraction of the limit at which spending starts to warn by default.
    pub const DEFAULT_WARNING_RATIO: f64 = 0.8;

    /// Create thresholds with the given warning ratio.
    ///
    /// # Errors
    /// Returns an [Error::InvalidWarningRatio] unless `0 < warning_ratio <= 1`.
    pub fn new(warning_ratio: f64) -> Result<Self, Error> {
        if warning_ratio > 0.0 && warning_ratio <= 1.0 {
            Ok(Self { warning_ratio })
        } else {
            Err(Error::InvalidWarningRatio(warning_ratio))
        }
    }
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            warning_ratio: Self::DEFAULT_WARNING_RATIO,
        }
    }
}

/// How a month's spending compares to its budget limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Spending is comfortably under the limit.
    Ok,
    /// Spending has reached the warning band but not exceeded the limit.
    Warning,
    /// Spending exceeds the limit.
    Over,
}

impl BudgetStatus {
    /// The label shown in status badges.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "On track",
            Self::Warning => "Near limit",
            Self::Over => "Over budget",
        }
    }
}

/// The outcome of evaluating one budget: how much was spent against the
/// limit, and the resulting classification.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    pub budget: Budget,
    pub category_name: CategoryName,
    /// The summed expense transactions for the category within the month.
    pub spent: f64,
    pub status: BudgetStatus,
}

/// Classify `spent` dollars against a `limit` of dollars.
///
/// Spending strictly above the limit is always `Over`, regardless of the
/// warning ratio.
pub fn classify(spent: f64, limit: f64, thresholds: BudgetThresholds) -> BudgetStatus {
    if spent > limit {
        BudgetStatus::Over
    } else if spent >= thresholds.warning_ratio * limit {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Ok
    }
}

/// Sum the expense transactions for `category_id` within `month`.
fn month_expense_total(
    category_id: CategoryId,
    month: YearMonth,
    connection: &Connection,
) -> Result<f64, Error> {
    let filter = LedgerFilter {
        date_from: Some(month.first_day()),
        date_to: Some(month.last_day()),
        kind: KindFilter::Expense,
        category_id: Some(category_id),
        search: None,
    };

    Ok(get_ledger_totals(&filter, connection)?.expense)
}

/// Evaluate the budget for a category and month.
///
/// Returns `None` when no budget is configured for the pair; in that case no
/// alert is ever raised.
///
/// # Errors
/// Returns an [Error::SqlError] if a query fails.
pub fn evaluate_budget(
    category_id: CategoryId,
    month: YearMonth,
    thresholds: BudgetThresholds,
    connection: &Connection,
) -> Result<Option<BudgetReport>, Error> {
    let Some(budget) = get_budget_for(category_id, month, connection)? else {
        return Ok(None);
    };

    let category_name = get_category(category_id, connection)?.name;
    let spent = month_expense_total(category_id, month, connection)?;
    let status = classify(spent, budget.amount, thresholds);

    Ok(Some(BudgetReport {
        budget,
        category_name,
        spent,
        status,
    }))
}

/// Evaluate every budget configured for `month`, ordered by category name.
///
/// # Errors
/// Returns an [Error::SqlError] if a query fails.
pub fn evaluate_month(
    month: YearMonth,
    thresholds: BudgetThresholds,
    connection: &Connection,
) -> Result<Vec<BudgetReport>, Error> {
    get_budgets_for_month(month, connection)?
        .into_iter()
        .map(|(budget, category_name)| {
            let spent = month_expense_total(budget.category_id, month, connection)?;
            let status = classify(spent, budget.amount, thresholds);

            Ok(BudgetReport {
                budget,
                category_name,
                spent,
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod classify_tests {
    use crate::Error;

    use super::{BudgetStatus, BudgetThresholds, classify};

    #[test]
    fn thresholds_reject_out_of_range_ratios() {
        assert_eq!(
            BudgetThresholds::new(0.0),
            Err(Error::InvalidWarningRatio(0.0))
        );
        assert_eq!(
            BudgetThresholds::new(1.5),
            Err(Error::InvalidWarningRatio(1.5))
        );
        assert!(BudgetThresholds::new(0.8).is_ok());
        assert!(BudgetThresholds::new(1.0).is_ok());
    }

    #[test]
    fn under_the_warning_band_is_ok() {
        let thresholds = BudgetThresholds::default();

        assert_eq!(classify(0.0, 100.0, thresholds), BudgetStatus::Ok);
        assert_eq!(classify(79.99, 100.0, thresholds), BudgetStatus::Ok);
    }

    #[test]
    fn warning_band_starts_at_the_ratio() {
        let thresholds = BudgetThresholds::default();

        assert_eq!(classify(80.0, 100.0, thresholds), BudgetStatus::Warning);
        assert_eq!(classify(100.0, 100.0, thresholds), BudgetStatus::Warning);
    }

    #[test]
    fn anything_above_the_limit_is_over() {
        let thresholds = BudgetThresholds::default();

        assert_eq!(classify(100.01, 100.0, thresholds), BudgetStatus::Over);
        assert_eq!(classify(250.0, 100.0, thresholds), BudgetStatus::Over);
    }

    #[test]
    fn bands_are_monotonic_in_spend() {
        let thresholds = BudgetThresholds::new(0.5).unwrap();
        let limit = 200.0;
        let mut last_rank = 0;

        for spent in [0.0, 50.0, 99.9, 100.0, 150.0, 200.0, 200.1, 500.0] {
            let rank = match classify(spent, limit, thresholds) {
                BudgetStatus::Ok => 0,
                BudgetStatus::Warning => 1,
                BudgetStatus::Over => 2,
            };

            assert!(
                rank >= last_rank,
                "classification regressed at spend {spent}"
            );
            last_rank = rank;
        }
    }
}

#[cfg(test)]
mod evaluator_tests {
    use rusqlite::Connection;
    use time::{Month, macros::date};

    use crate::{
        budget::{YearMonth, create_budget},
        category::{CategoryName, create_category},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{BudgetStatus, BudgetThresholds, evaluate_budget, evaluate_month};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn january() -> YearMonth {
        YearMonth::new(2024, Month::January)
    }

    #[test]
    fn no_configured_budget_means_no_alert() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        create_transaction(
            Transaction::build(9999.0, TransactionKind::Expense, date!(2024 - 01 - 05), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();

        let report = evaluate_budget(food.id, january(), BudgetThresholds::default(), &conn)
            .expect("Could not evaluate budget");

        assert_eq!(report, None);
    }

    #[test]
    fn overspent_month_classifies_over() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        create_budget(food.id, january(), 100.0, &conn).unwrap();
        create_transaction(
            Transaction::build(20.0, TransactionKind::Expense, date!(2024 - 01 - 05), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(90.0, TransactionKind::Expense, date!(2024 - 01 - 20), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();

        let report = evaluate_budget(food.id, january(), BudgetThresholds::default(), &conn)
            .expect("Could not evaluate budget")
            .expect("A budget is configured, so a report is expected");

        assert_eq!(report.spent, 110.0);
        assert_eq!(report.status, BudgetStatus::Over);
    }

    #[test]
    fn only_expenses_in_the_month_and_category_count() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let transport =
            create_category(CategoryName::new_unchecked("Transport"), None, &conn).unwrap();
        create_budget(food.id, january(), 100.0, &conn).unwrap();

        // Counted: an expense in the category and month.
        create_transaction(
            Transaction::build(30.0, TransactionKind::Expense, date!(2024 - 01 - 31), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        // Not counted: income, another category, another month, uncategorized.
        create_transaction(
            Transaction::build(500.0, TransactionKind::Income, date!(2024 - 01 - 10), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(40.0, TransactionKind::Expense, date!(2024 - 01 - 10), "")
                .category_id(Some(transport.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(50.0, TransactionKind::Expense, date!(2024 - 02 - 01), "")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(60.0, TransactionKind::Expense, date!(2024 - 01 - 10), ""),
            &conn,
        )
        .unwrap();

        let report = evaluate_budget(food.id, january(), BudgetThresholds::default(), &conn)
            .unwrap()
            .unwrap();

        assert_eq!(report.spent, 30.0);
        assert_eq!(report.status, BudgetStatus::Ok);
    }

    #[test]
    fn evaluate_month_reports_every_configured_budget() {
        let conn = get_test_connection();
        let food = create_category(CategoryName::new_unchecked("Food"), None, &conn).unwrap();
        let rent = create_category(CategoryName::new_unchecked("Rent"), None, &conn).unwrap();
        create_budget(food.id, january(), 100.0, &conn).unwrap();
        create_budget(rent.id, january(), 500.0, &conn).unwrap();
        create_transaction(
            Transaction::build(450.0, TransactionKind::Expense, date!(2024 - 01 - 01), "Rent")
                .category_id(Some(rent.id)),
            &conn,
        )
        .unwrap();

        let reports = evaluate_month(january(), BudgetThresholds::default(), &conn)
            .expect("Could not evaluate month");

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].category_name.as_ref(), "Food");
        assert_eq!(reports[0].status, BudgetStatus::Ok);
        assert_eq!(reports[1].category_name.as_ref(), "Rent");
        assert_eq!(reports[1].spent, 450.0);
        assert_eq!(reports[1].status, BudgetStatus::Warning);
    }
}
