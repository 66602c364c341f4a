//! In-memory store.
//!
//! Enforces the same `(unit_id, period_date)` uniqueness as the database,
//! atomically per batch, so overlapping generator runs behave as they do
//! against PostgreSQL. Used for dry runs in tests and local tooling.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use residia_shared::types::{BillingRecordId, CommunityId};

use super::{BillingStore, CommunityStore, InsertOutcome, LedgerStore, StoreError};
use crate::billing::{BillingKey, BillingRecord, NewBillingRecord};
use crate::community::{Community, RateConfiguration, Unit};
use crate::ledger::{ExpenseRecord, ExpenseStatus};

#[derive(Debug, Default)]
struct MemoryState {
    communities: Vec<Community>,
    rates: Vec<RateConfiguration>,
    units: Vec<Unit>,
    records: Vec<BillingRecord>,
    expenses: Vec<ExpenseRecord>,
    failing_inserts: HashSet<CommunityId>,
    failing_loads: HashSet<CommunityId>,
    unavailable: bool,
    insert_delay: Option<Duration>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a community.
    pub fn add_community(&self, community: Community) {
        self.state().communities.push(community);
    }

    /// Adds a rate configuration.
    pub fn add_rate(&self, rate: RateConfiguration) {
        self.state().rates.push(rate);
    }

    /// Adds a unit.
    pub fn add_unit(&self, unit: Unit) {
        self.state().units.push(unit);
    }

    /// Adds an existing billing record as-is, bypassing the uniqueness check.
    pub fn add_record(&self, record: BillingRecord) {
        self.state().records.push(record);
    }

    /// Adds an expense.
    pub fn add_expense(&self, expense: ExpenseRecord) {
        self.state().expenses.push(expense);
    }

    /// Snapshot of every stored billing record, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<BillingRecord> {
        self.state().records.clone()
    }

    /// Makes every insert for `community_id` fail.
    pub fn fail_inserts_for(&self, community_id: CommunityId) {
        self.state().failing_inserts.insert(community_id);
    }

    /// Makes every per-community read for `community_id` fail.
    pub fn fail_loads_for(&self, community_id: CommunityId) {
        self.state().failing_loads.insert(community_id);
    }

    /// Simulates losing the connection to the store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Delays every insert, for exercising timeouts.
    pub fn set_insert_delay(&self, delay: Option<Duration>) {
        self.state().insert_delay = delay;
    }

    fn check_load(
        &self,
        community_id: CommunityId,
    ) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        let state = self.state();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        if state.failing_loads.contains(&community_id) {
            return Err(StoreError::Query(format!("load rejected for community {community_id}")));
        }
        Ok(state)
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn find_community(&self, id: CommunityId) -> Result<Option<Community>, StoreError> {
        let state = self.check_load(id)?;
        Ok(state.communities.iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn active_communities(&self) -> Result<Vec<Community>, StoreError> {
        let state = self.state();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(state
            .communities
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn rate_configurations(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<RateConfiguration>, StoreError> {
        let state = self.check_load(community_id)?;
        let mut rates: Vec<RateConfiguration> = state
            .rates
            .iter()
            .filter(|r| r.community_id == community_id)
            .cloned()
            .collect();
        rates.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(rates)
    }

    async fn billable_units(&self, community_id: CommunityId) -> Result<Vec<Unit>, StoreError> {
        let state = self.check_load(community_id)?;
        Ok(state
            .units
            .iter()
            .filter(|u| u.community_id == community_id && u.maintenance_start_date.is_some())
            .cloned()
            .collect())
    }

    async fn billed_keys(
        &self,
        community_id: CommunityId,
    ) -> Result<HashSet<BillingKey>, StoreError> {
        let state = self.check_load(community_id)?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.community_id == community_id)
            .map(BillingRecord::key)
            .collect())
    }

    async fn insert_records(
        &self,
        records: &[NewBillingRecord],
    ) -> Result<InsertOutcome, StoreError> {
        let delay = self.state().insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        if let Some(record) = records
            .iter()
            .find(|r| state.failing_inserts.contains(&r.community_id))
        {
            return Err(StoreError::Query(format!(
                "insert rejected for community {}",
                record.community_id
            )));
        }

        let mut existing: HashSet<BillingKey> =
            state.records.iter().map(BillingRecord::key).collect();
        let mut outcome = InsertOutcome::default();
        for record in records {
            if !existing.insert(record.key()) {
                outcome.duplicates += 1;
                continue;
            }
            state.records.push(BillingRecord {
                id: BillingRecordId::new(),
                unit_id: record.unit_id,
                user_id: record.user_id,
                community_id: record.community_id,
                period_date: record.period_date,
                amount: Some(record.amount),
                status: record.status,
            });
            outcome.inserted += 1;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn billing_records_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<BillingRecord>, StoreError> {
        let state = self.check_load(community_id)?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.community_id == community_id && r.period_date < before)
            .cloned()
            .collect())
    }

    async fn approved_expenses_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>, StoreError> {
        let state = self.check_load(community_id)?;
        Ok(state
            .expenses
            .iter()
            .filter(|e| {
                e.community_id == community_id
                    && e.status == ExpenseStatus::Approved
                    && e.date < before
            })
            .cloned()
            .collect())
    }
}
