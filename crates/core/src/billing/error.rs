//! Billing error types.

use std::time::Duration;

use chrono::NaiveDate;
use residia_shared::types::{CommunityId, UnitId};
use thiserror::Error;

use crate::store::StoreError;

/// Billing-related errors.
///
/// Only [`BillingError::StoreUnavailable`], [`BillingError::CommunityNotFound`],
/// [`BillingError::UnitNotFound`] and [`BillingError::HorizonInFuture`] reach
/// the caller of a run. The rest are recorded against the unit or community
/// they concern.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Neither a rate configuration nor a legacy rate exists.
    #[error("No rate configured for community {0}")]
    ConfigurationMissing(CommunityId),

    /// A date could not be used to enumerate billing periods.
    #[error("Malformed date for unit {unit_id}: {detail}")]
    MalformedDate {
        /// Unit whose schedule could not be built.
        unit_id: UnitId,
        /// What was wrong with the date.
        detail: String,
    },

    /// Unit data cannot be billed.
    #[error("Unit {unit_id} cannot be billed: {reason}")]
    InvalidUnit {
        /// Offending unit.
        unit_id: UnitId,
        /// Why it was rejected.
        reason: String,
    },

    /// A store call for one community failed.
    #[error("Persistence failure for community {community_id}: {source}")]
    PersistenceFailure {
        /// Community being processed.
        community_id: CommunityId,
        /// Underlying store error.
        source: StoreError,
    },

    /// A store call for one community exceeded its time budget.
    #[error("Store call for community {community_id} timed out after {timeout:?}")]
    PersistenceTimeout {
        /// Community being processed.
        community_id: CommunityId,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// The store could not be reached at all; the run cannot start.
    #[error("Billing store unavailable: {0}")]
    StoreUnavailable(String),

    /// Community not found or not active.
    #[error("Community not found: {0}")]
    CommunityNotFound(CommunityId),

    /// A run was asked to bill past the current month.
    #[error("Cannot bill through {as_of}: the latest billable month is {latest}")]
    HorizonInFuture {
        /// Requested horizon.
        as_of: NaiveDate,
        /// First day of the current month.
        latest: NaiveDate,
    },

    /// Unit not found among the community's billable units.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),
}
