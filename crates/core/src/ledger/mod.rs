//! Community balance ledger.
//!
//! Balances are derived on read from billing records and approved
//! expenses; nothing here writes.

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod service;
pub mod types;


pub use aggregator::{LedgerAggregator, Partition};
pub use cache::{LedgerCache, LedgerCacheKey};
pub use error::LedgerError;
pub use service::{LedgerService, MAX_STATEMENT_MONTHS, parse_target_month};
pub use types::{ExpenseRecord, ExpenseStatus, LedgerStatement, LedgerSummary};
