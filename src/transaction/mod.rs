//! Transactions are the ledger entries of the application: money earned or
//! spent on a date, optionally grouped under a category.

mod core;
mod create;
mod delete;
mod edit;
mod export;
mod list;
mod query;

pub use core::{
    Transaction, TransactionBuilder, TransactionId, TransactionKind, count_transactions,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    update_transaction,
};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use delete::delete_transaction_endpoint;
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use export::export_transactions;
pub use list::{LedgerQueryParams, get_transactions_page};
pub use query::{KindFilter, LedgerEntry, LedgerFilter, LedgerTotals, get_ledger, get_ledger_totals};
