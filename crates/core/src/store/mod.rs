//! Persistence seam for the billing engine and the ledger.
//!
//! The engine never talks to a database directly. `residia-db` implements
//! these traits over PostgreSQL; [`MemoryStore`] implements them in memory.

mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use residia_shared::types::CommunityId;
use thiserror::Error;

use crate::billing::{BillingKey, BillingRecord, NewBillingRecord};
use crate::community::{Community, RateConfiguration, Unit};
use crate::ledger::ExpenseRecord;

pub use memory::MemoryStore;

/// Errors raised by a store implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query or write was rejected.
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored row could not be mapped to a domain type.
    #[error("Invalid stored row: {0}")]
    Mapping(String),
}

/// Counts returned by a batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Rows written.
    pub inserted: u64,
    /// Rows rejected because their `(unit_id, period_date)` already existed.
    pub duplicates: u64,
}

/// Community lookups shared by billing and ledger.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Finds a community by id, active or not.
    async fn find_community(&self, id: CommunityId) -> Result<Option<Community>, StoreError>;
}

/// Reads and writes needed by the billing generator.
#[async_trait]
pub trait BillingStore: CommunityStore {
    /// Lists communities with active status.
    async fn active_communities(&self) -> Result<Vec<Community>, StoreError>;

    /// Lists a community's rate configurations, newest `effective_date` first.
    async fn rate_configurations(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<RateConfiguration>, StoreError>;

    /// Lists a community's units that have a maintenance start date.
    async fn billable_units(&self, community_id: CommunityId) -> Result<Vec<Unit>, StoreError>;

    /// Keys of every billing record already stored for the community.
    async fn billed_keys(&self, community_id: CommunityId)
    -> Result<HashSet<BillingKey>, StoreError>;

    /// Inserts records in one batch.
    ///
    /// Records whose key already exists must be skipped and counted in
    /// [`InsertOutcome::duplicates`], never reported as an error.
    async fn insert_records(&self, records: &[NewBillingRecord])
    -> Result<InsertOutcome, StoreError>;
}

/// Reads needed by the ledger.
#[async_trait]
pub trait LedgerStore: CommunityStore {
    /// Billing records of a community with `period_date < before`.
    async fn billing_records_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<BillingRecord>, StoreError>;

    /// Approved expenses of a community dated before `before`.
    async fn approved_expenses_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>, StoreError>;
}
