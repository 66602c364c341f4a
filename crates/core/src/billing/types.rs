//! Billing record and run report types.

use chrono::NaiveDate;
use residia_shared::types::{BillingRecordId, CommunityId, UnitId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::first_of_month;

/// Payment state of a billing record.
///
/// The engine only ever creates `Pending` records; later transitions belong
/// to the payment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingStatus {
    /// Billed, not yet paid.
    Pending,
    /// Resident submitted a payment awaiting confirmation.
    Submitted,
    /// Payment confirmed.
    Paid,
}

/// An existing monthly maintenance charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Unique identifier.
    pub id: BillingRecordId,
    /// Unit billed.
    pub unit_id: UnitId,
    /// Resident billed.
    pub user_id: UserId,
    /// Community the unit belongs to.
    pub community_id: CommunityId,
    /// First day of the billed month.
    pub period_date: NaiveDate,
    /// Charged amount. Historical rows may lack one.
    pub amount: Option<Decimal>,
    /// Payment state.
    pub status: BillingStatus,
}

impl BillingRecord {
    /// Idempotency key of this record.
    #[must_use]
    pub fn key(&self) -> BillingKey {
        BillingKey::new(self.unit_id, self.period_date)
    }
}

/// A record staged by the generator, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBillingRecord {
    /// Resident billed.
    pub user_id: UserId,
    /// Unit billed.
    pub unit_id: UnitId,
    /// Community the unit belongs to.
    pub community_id: CommunityId,
    /// Whole-unit amount, always positive.
    pub amount: Decimal,
    /// First day of the billed month.
    pub period_date: NaiveDate,
    /// Always `Pending` for generated records.
    pub status: BillingStatus,
}

impl NewBillingRecord {
    /// Idempotency key of this record.
    #[must_use]
    pub fn key(&self) -> BillingKey {
        BillingKey::new(self.unit_id, self.period_date)
    }
}

/// At most one billing record exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingKey {
    /// Unit billed.
    pub unit_id: UnitId,
    /// First day of the billed month.
    pub period_date: NaiveDate,
}

impl BillingKey {
    /// Builds a key, normalizing the date to the first of its month.
    #[must_use]
    pub fn new(unit_id: UnitId, period_date: NaiveDate) -> Self {
        Self {
            unit_id,
            period_date: first_of_month(period_date),
        }
    }
}

/// Final state of one community within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityStatus {
    /// Planned and persisted (or planned only, in a dry run).
    Completed,
    /// A store call failed or timed out; nothing from this community was persisted.
    Failed,
    /// The run was cancelled before this community started.
    Cancelled,
}

/// Per-community counters for one generator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityOutcome {
    /// Community processed.
    pub community_id: CommunityId,
    /// Final state.
    pub status: CommunityStatus,
    /// Records staged by the planner.
    pub records_planned: u64,
    /// Records the store actually inserted.
    pub records_created: u64,
    /// Staged records the store rejected as already present.
    pub duplicates_skipped: u64,
    /// Units skipped because their data could not be billed.
    pub units_skipped: u64,
    /// Periods that already had a record before this run.
    pub periods_already_billed: u64,
    /// Periods that resolved to no charge.
    pub periods_without_charge: u64,
    /// Failure description when `status` is `Failed`.
    pub error: Option<String>,
}

impl CommunityOutcome {
    /// An outcome with all counters at zero.
    #[must_use]
    pub fn empty(community_id: CommunityId, status: CommunityStatus) -> Self {
        Self {
            community_id,
            status,
            records_planned: 0,
            records_created: 0,
            duplicates_skipped: 0,
            units_skipped: 0,
            periods_already_billed: 0,
            periods_without_charge: 0,
            error: None,
        }
    }
}

/// Result of a generator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Date the run billed through (its month is the last billed period).
    pub as_of: NaiveDate,
    /// True when nothing was written.
    pub dry_run: bool,
    /// Communities that completed.
    pub communities_processed: u64,
    /// Communities that failed.
    pub communities_failed: u64,
    /// Communities never started because the run was cancelled.
    pub communities_cancelled: u64,
    /// Records staged across all communities.
    pub records_planned: u64,
    /// Records inserted across all communities.
    pub records_created: u64,
    /// Staged records rejected by the store as duplicates.
    pub duplicates_skipped: u64,
    /// Units skipped across all communities.
    pub units_skipped: u64,
    /// Periods that already had a record.
    pub periods_already_billed: u64,
    /// Periods that resolved to no charge.
    pub periods_without_charge: u64,
    /// Per-community detail, ordered by community id.
    pub outcomes: Vec<CommunityOutcome>,
}

impl GenerationReport {
    /// Folds per-community outcomes into run totals.
    #[must_use]
    pub fn from_outcomes(
        as_of: NaiveDate,
        dry_run: bool,
        mut outcomes: Vec<CommunityOutcome>,
    ) -> Self {
        outcomes.sort_by_key(|outcome| outcome.community_id);

        let mut report = Self {
            as_of,
            dry_run,
            communities_processed: 0,
            communities_failed: 0,
            communities_cancelled: 0,
            records_planned: 0,
            records_created: 0,
            duplicates_skipped: 0,
            units_skipped: 0,
            periods_already_billed: 0,
            periods_without_charge: 0,
            outcomes: Vec::new(),
        };

        for outcome in &outcomes {
            match outcome.status {
                CommunityStatus::Completed => report.communities_processed += 1,
                CommunityStatus::Failed => report.communities_failed += 1,
                CommunityStatus::Cancelled => report.communities_cancelled += 1,
            }
            report.records_planned += outcome.records_planned;
            report.records_created += outcome.records_created;
            report.duplicates_skipped += outcome.duplicates_skipped;
            report.units_skipped += outcome.units_skipped;
            report.periods_already_billed += outcome.periods_already_billed;
            report.periods_without_charge += outcome.periods_without_charge;
        }

        report.outcomes = outcomes;
        report
    }

    /// True if any community failed or was cancelled.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.communities_failed > 0 || self.communities_cancelled > 0
    }
}
