//! Billing generation runs.
//!
//! A run loads every active community, plans the records each one is
//! missing through the month of `as_of`, and persists them in one batch
//! per community. Communities are independent: a failure in one is
//! recorded in the report and the run moves on.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use residia_shared::BillingConfig;
use residia_shared::types::{CommunityId, UnitId};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::BillingError;
use super::planner::{BillingPlanner, PlannedPeriod};
use super::types::{BillingKey, CommunityOutcome, CommunityStatus, GenerationReport};
use crate::community::{Community, RateConfiguration, Unit};
use crate::store::{BillingStore, StoreError};

/// Tuning for a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Communities processed at once.
    pub concurrency: usize,
    /// Budget for each store call.
    pub store_timeout: Duration,
    /// Plan and report without writing.
    pub dry_run: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            store_timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

impl From<&BillingConfig> for GeneratorOptions {
    fn from(config: &BillingConfig) -> Self {
        Self {
            concurrency: config.worker_concurrency.max(1),
            store_timeout: config.persist_timeout(),
            dry_run: false,
        }
    }
}

/// Creates missing monthly billing records.
///
/// Safe to run repeatedly and concurrently: existing records are never
/// touched, and the store rejects keys that appear between planning and
/// insert.
pub struct BillingGenerator<S: BillingStore + ?Sized> {
    store: Arc<S>,
    options: GeneratorOptions,
}

impl<S: BillingStore + ?Sized> BillingGenerator<S> {
    /// Creates a generator over a store.
    #[must_use]
    pub const fn new(store: Arc<S>, options: GeneratorOptions) -> Self {
        Self { store, options }
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Bills every active community through the month of `as_of`.
    ///
    /// Returns `Err` only when the communities cannot be listed. Cancelling
    /// `cancel` stops communities that have not started yet; records already
    /// inserted are kept.
    pub async fn generate(
        &self,
        as_of: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<GenerationReport, BillingError> {
        let communities = match tokio::time::timeout(
            self.options.store_timeout,
            self.store.active_communities(),
        )
        .await
        {
            Ok(Ok(communities)) => communities,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to list active communities");
                return Err(BillingError::StoreUnavailable(e.to_string()));
            }
            Err(_) => {
                error!(
                    timeout = ?self.options.store_timeout,
                    "Listing active communities timed out"
                );
                return Err(BillingError::StoreUnavailable(format!(
                    "listing communities timed out after {:?}",
                    self.options.store_timeout
                )));
            }
        };

        info!(
            as_of = %as_of,
            communities = communities.len(),
            dry_run = self.options.dry_run,
            "Starting billing run"
        );

        let outcomes: Vec<CommunityOutcome> = stream::iter(communities)
            .map(|community| async move {
                if cancel.is_cancelled() {
                    return CommunityOutcome::empty(community.id, CommunityStatus::Cancelled);
                }
                self.process_community(&community, as_of).await
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let report = GenerationReport::from_outcomes(as_of, self.options.dry_run, outcomes);

        info!(
            as_of = %as_of,
            processed = report.communities_processed,
            failed = report.communities_failed,
            cancelled = report.communities_cancelled,
            created = report.records_created,
            duplicates = report.duplicates_skipped,
            units_skipped = report.units_skipped,
            "Billing run finished"
        );

        Ok(report)
    }

    /// Bills a single active community through the month of `as_of`.
    pub async fn generate_for_community(
        &self,
        community_id: CommunityId,
        as_of: NaiveDate,
    ) -> Result<GenerationReport, BillingError> {
        let community = self.load_active_community(community_id).await?;
        let outcome = self.process_community(&community, as_of).await;
        Ok(GenerationReport::from_outcomes(
            as_of,
            self.options.dry_run,
            vec![outcome],
        ))
    }

    /// Schedule of one unit through the month of `as_of`, without writing.
    pub async fn preview_unit(
        &self,
        community_id: CommunityId,
        unit_id: UnitId,
        as_of: NaiveDate,
    ) -> Result<Vec<PlannedPeriod>, BillingError> {
        let community = self.load_active_community(community_id).await?;
        let rates = self
            .guarded(community_id, self.store.rate_configurations(community_id))
            .await?;
        let units = self
            .guarded(community_id, self.store.billable_units(community_id))
            .await?;
        let unit = units
            .into_iter()
            .find(|unit| unit.id == unit_id)
            .ok_or(BillingError::UnitNotFound(unit_id))?;
        let billed = self
            .guarded(community_id, self.store.billed_keys(community_id))
            .await?;

        BillingPlanner::new(&community, &rates, as_of).preview_unit(&unit, &billed)
    }

    async fn load_active_community(
        &self,
        community_id: CommunityId,
    ) -> Result<Community, BillingError> {
        let found = match tokio::time::timeout(
            self.options.store_timeout,
            self.store.find_community(community_id),
        )
        .await
        {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => return Err(BillingError::StoreUnavailable(e.to_string())),
            Err(_) => {
                return Err(BillingError::PersistenceTimeout {
                    community_id,
                    timeout: self.options.store_timeout,
                });
            }
        };

        found
            .filter(|community| community.is_active)
            .ok_or(BillingError::CommunityNotFound(community_id))
    }

    async fn process_community(&self, community: &Community, as_of: NaiveDate) -> CommunityOutcome {
        let community_id = community.id;

        let (rates, units, billed) = match self.load_snapshot(community_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    error = %e,
                    community_id = %community_id,
                    "Failed to load community snapshot"
                );
                return failed(community_id, &e);
            }
        };

        if rates.is_empty() && community.flat_amount.is_none() && community.fixed_amount.is_none() {
            let e = BillingError::ConfigurationMissing(community_id);
            warn!(error = %e, "Community has no rate; periods will not be charged");
        }

        let planner = BillingPlanner::new(community, &rates, as_of);
        let plan = planner.plan_community(&units, &billed);

        for skipped in &plan.skipped_units {
            warn!(error = %skipped, community_id = %community_id, "Skipping unit");
        }

        let mut outcome = CommunityOutcome::empty(community_id, CommunityStatus::Completed);
        outcome.records_planned = plan.records.len() as u64;
        outcome.units_skipped = plan.skipped_units.len() as u64;
        outcome.periods_already_billed = plan.periods_already_billed;
        outcome.periods_without_charge = plan.periods_without_charge;

        if !self.options.dry_run && !plan.records.is_empty() {
            match self
                .guarded(community_id, self.store.insert_records(&plan.records))
                .await
            {
                Ok(inserted) => {
                    outcome.records_created = inserted.inserted;
                    outcome.duplicates_skipped = inserted.duplicates;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        community_id = %community_id,
                        "Failed to persist billing records"
                    );
                    outcome.status = CommunityStatus::Failed;
                    outcome.error = Some(e.to_string());
                    return outcome;
                }
            }
        }

        info!(
            community_id = %community_id,
            planned = outcome.records_planned,
            created = outcome.records_created,
            duplicates = outcome.duplicates_skipped,
            units_skipped = outcome.units_skipped,
            "Community billed"
        );

        outcome
    }

    async fn load_snapshot(
        &self,
        community_id: CommunityId,
    ) -> Result<(Vec<RateConfiguration>, Vec<Unit>, HashSet<BillingKey>), BillingError> {
        let rates = self
            .guarded(community_id, self.store.rate_configurations(community_id))
            .await?;
        let units = self
            .guarded(community_id, self.store.billable_units(community_id))
            .await?;
        let billed = self
            .guarded(community_id, self.store.billed_keys(community_id))
            .await?;
        Ok((rates, units, billed))
    }

    async fn guarded<T, F>(&self, community_id: CommunityId, call: F) -> Result<T, BillingError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.options.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(BillingError::PersistenceFailure {
                community_id,
                source,
            }),
            Err(_) => Err(BillingError::PersistenceTimeout {
                community_id,
                timeout: self.options.store_timeout,
            }),
        }
    }
}

fn failed(community_id: CommunityId, error: &BillingError) -> CommunityOutcome {
    let mut outcome = CommunityOutcome::empty(community_id, CommunityStatus::Failed);
    outcome.error = Some(error.to_string());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{BillingStatus, PeriodDisposition};
    use crate::community::CommunityKind;
    use crate::store::MemoryStore;
    use residia_shared::types::{RateConfigurationId, UserId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options() -> GeneratorOptions {
        GeneratorOptions {
            concurrency: 2,
            store_timeout: Duration::from_secs(5),
            dry_run: false,
        }
    }

    /// Adds a rate-based community at 2 per area unit and returns its id.
    fn seed_community(store: &MemoryStore) -> CommunityId {
        let community = Community {
            id: CommunityId::new(),
            name: "Cedar Heights".to_string(),
            kind: CommunityKind::RateBased,
            flat_amount: None,
            fixed_amount: None,
            opening_balance: None,
            is_active: true,
        };
        let id = community.id;
        store.add_community(community);
        store.add_rate(RateConfiguration {
            id: RateConfigurationId::new(),
            community_id: id,
            effective_date: date(2020, 1, 1),
            rate_per_area: dec!(2),
            fixed_amount: dec!(0),
        });
        id
    }

    fn seed_unit(store: &MemoryStore, community_id: CommunityId, start: NaiveDate) -> UnitId {
        let unit = Unit {
            id: UnitId::new(),
            community_id,
            user_id: UserId::new(),
            flat_size: Some(dec!(500)),
            maintenance_start_date: Some(start),
        };
        let id = unit.id;
        store.add_unit(unit);
        id
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        seed_unit(&store, community_id, date(2024, 1, 1));
        let generator = BillingGenerator::new(Arc::clone(&store), options());
        let cancel = CancellationToken::new();

        let first = generator.generate(date(2024, 3, 10), &cancel).await.unwrap();
        let before = store.records();
        let second = generator.generate(date(2024, 3, 10), &cancel).await.unwrap();

        assert_eq!(first.records_created, 3);
        assert_eq!(second.records_created, 0);
        assert_eq!(second.periods_already_billed, 3);
        let after = store.records();
        assert_eq!(before.len(), after.len());
        assert!(
            before
                .iter()
                .zip(&after)
                .all(|(a, b)| a.id == b.id && a.amount == b.amount)
        );
    }

    #[tokio::test]
    async fn test_later_run_backfills_only_new_month() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        let unit_id = seed_unit(&store, community_id, date(2024, 1, 1));
        let generator = BillingGenerator::new(Arc::clone(&store), options());
        let cancel = CancellationToken::new();

        generator.generate(date(2024, 3, 1), &cancel).await.unwrap();
        let report = generator.generate(date(2024, 4, 1), &cancel).await.unwrap();

        assert_eq!(report.records_created, 1);
        let mut periods: Vec<_> = store
            .records()
            .into_iter()
            .filter(|r| r.unit_id == unit_id)
            .map(|r| r.period_date)
            .collect();
        periods.sort();
        assert_eq!(
            periods,
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
        );
        assert!(
            store
                .records()
                .iter()
                .all(|r| r.status == BillingStatus::Pending && r.amount == Some(dec!(1000)))
        );
    }

    #[tokio::test]
    async fn test_concurrent_runs_never_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        for _ in 0..5 {
            seed_unit(&store, community_id, date(2023, 7, 1));
        }
        let a = BillingGenerator::new(Arc::clone(&store), options());
        let b = BillingGenerator::new(Arc::clone(&store), options());
        let cancel = CancellationToken::new();

        let (ra, rb) = tokio::join!(
            a.generate(date(2024, 6, 1), &cancel),
            b.generate(date(2024, 6, 1), &cancel)
        );
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        // 5 units x 12 months
        assert_eq!(store.records().len(), 60);
        assert_eq!(ra.records_created + rb.records_created, 60);
        // Every staged record is either inserted or rejected as a duplicate.
        assert_eq!(
            ra.records_planned + rb.records_planned,
            60 + ra.duplicates_skipped + rb.duplicates_skipped
        );
    }

    #[tokio::test]
    async fn test_failing_community_does_not_stop_others() {
        let store = Arc::new(MemoryStore::new());
        let healthy = seed_community(&store);
        let broken = seed_community(&store);
        let unreadable = seed_community(&store);
        seed_unit(&store, healthy, date(2024, 1, 1));
        seed_unit(&store, broken, date(2024, 1, 1));
        seed_unit(&store, unreadable, date(2024, 1, 1));
        store.fail_inserts_for(broken);
        store.fail_loads_for(unreadable);
        let generator = BillingGenerator::new(Arc::clone(&store), options());

        let report = generator
            .generate(date(2024, 2, 1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.communities_processed, 1);
        assert_eq!(report.communities_failed, 2);
        assert!(report.is_partial());
        assert_eq!(report.records_created, 2);
        let broken_outcome = report
            .outcomes
            .iter()
            .find(|o| o.community_id == broken)
            .unwrap();
        assert_eq!(broken_outcome.status, CommunityStatus::Failed);
        assert_eq!(broken_outcome.records_planned, 2);
        assert!(broken_outcome.error.is_some());
        assert!(store.records().iter().all(|r| r.community_id == healthy));
    }

    #[tokio::test]
    async fn test_slow_insert_times_out() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        seed_unit(&store, community_id, date(2024, 1, 1));
        store.set_insert_delay(Some(Duration::from_millis(500)));
        let generator = BillingGenerator::new(
            Arc::clone(&store),
            GeneratorOptions {
                store_timeout: Duration::from_millis(20),
                ..options()
            },
        );

        let report = generator
            .generate(date(2024, 1, 1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.communities_failed, 1);
        assert!(
            report.outcomes[0]
                .error
                .as_deref()
                .is_some_and(|e| e.contains("timed out"))
        );
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        seed_community(&store);
        store.set_unavailable(true);
        let generator = BillingGenerator::new(store, options());

        let result = generator
            .generate(date(2024, 1, 1), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(BillingError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_no_community() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            let id = seed_community(&store);
            seed_unit(&store, id, date(2024, 1, 1));
        }
        let generator = BillingGenerator::new(Arc::clone(&store), options());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = generator.generate(date(2024, 1, 1), &cancel).await.unwrap();

        assert_eq!(report.communities_cancelled, 3);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        seed_unit(&store, community_id, date(2024, 1, 1));
        let generator = BillingGenerator::new(
            Arc::clone(&store),
            GeneratorOptions {
                dry_run: true,
                ..options()
            },
        );

        let report = generator
            .generate(date(2024, 2, 1), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.records_planned, 2);
        assert_eq!(report.records_created, 0);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_community_creates_no_records() {
        let store = Arc::new(MemoryStore::new());
        let community = Community {
            id: CommunityId::new(),
            name: "Unpriced".to_string(),
            kind: CommunityKind::RateBased,
            flat_amount: None,
            fixed_amount: None,
            opening_balance: None,
            is_active: true,
        };
        let id = community.id;
        store.add_community(community);
        seed_unit(&store, id, date(2024, 1, 1));
        let generator = BillingGenerator::new(Arc::clone(&store), options());

        let report = generator
            .generate(date(2024, 3, 1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.communities_processed, 1);
        assert_eq!(report.periods_without_charge, 3);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_single_community_run() {
        let store = Arc::new(MemoryStore::new());
        let target = seed_community(&store);
        let other = seed_community(&store);
        seed_unit(&store, target, date(2024, 1, 1));
        seed_unit(&store, other, date(2024, 1, 1));
        let generator = BillingGenerator::new(Arc::clone(&store), options());

        let report = generator
            .generate_for_community(target, date(2024, 1, 1))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.records_created, 1);
        assert!(store.records().iter().all(|r| r.community_id == target));

        let missing = generator
            .generate_for_community(CommunityId::new(), date(2024, 1, 1))
            .await;
        assert!(matches!(missing, Err(BillingError::CommunityNotFound(_))));
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let store = Arc::new(MemoryStore::new());
        let community_id = seed_community(&store);
        let unit_id = seed_unit(&store, community_id, date(2024, 1, 16));
        let generator = BillingGenerator::new(Arc::clone(&store), options());

        let schedule = generator
            .preview_unit(community_id, unit_id, date(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(schedule.len(), 2);
        assert!(schedule.iter().all(|p| p.disposition == PeriodDisposition::Billable));
        // 1000 * 16 / 31 = 516.13
        assert_eq!(schedule[0].amount, Some(dec!(516)));
        assert!(schedule[0].prorated);
        assert_eq!(schedule[1].amount, Some(Decimal::from(1000)));
        assert!(store.records().is_empty());

        let missing = generator
            .preview_unit(community_id, UnitId::new(), date(2024, 2, 1))
            .await;
        assert!(matches!(missing, Err(BillingError::UnitNotFound(_))));
    }
}
