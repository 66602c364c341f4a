//! Ledger error types.

use residia_shared::types::CommunityId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by ledger queries.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Community does not exist.
    #[error("Community not found: {0}")]
    CommunityNotFound(CommunityId),

    /// A month could not be parsed or a range is inverted.
    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    /// A statement spans more months than allowed.
    #[error("Statement spans {months} months, maximum is {max}")]
    RangeTooLarge {
        /// Months requested.
        months: i64,
        /// Months allowed.
        max: i64,
    },

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
