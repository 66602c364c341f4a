//! Ledger queries over a [`LedgerStore`].

use std::sync::Arc;

use chrono::NaiveDate;
use residia_shared::types::CommunityId;
use rust_decimal::Decimal;

use super::aggregator::LedgerAggregator;
use super::cache::{LedgerCache, LedgerCacheKey};
use super::error::LedgerError;
use super::types::{LedgerStatement, LedgerSummary};
use crate::calendar::{first_of_month, months_between, next_month_start, parse_month};
use crate::community::Community;
use crate::store::LedgerStore;

/// Longest statement served, in months.
pub const MAX_STATEMENT_MONTHS: i64 = 60;

/// Read-only ledger service.
pub struct LedgerService<S: LedgerStore + ?Sized> {
    store: Arc<S>,
    cache: Option<LedgerCache>,
}

impl<S: LedgerStore + ?Sized> LedgerService<S> {
    /// Creates a service without caching.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store, cache: None }
    }

    /// Serves summaries through `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: LedgerCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Summarizes the month containing `month`.
    ///
    /// Uses the community's opening balance unless `opening_override` is set.
    pub async fn summarize(
        &self,
        community_id: CommunityId,
        month: NaiveDate,
        opening_override: Option<Decimal>,
    ) -> Result<LedgerSummary, LedgerError> {
        let key = LedgerCacheKey {
            community_id,
            month: first_of_month(month),
            opening_override,
        };
        if let Some(summary) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok(summary);
        }

        let community = self.community(community_id).await?;
        let opening = opening_override.unwrap_or_else(|| community.opening_balance_or_zero());
        let before = end_of_window(key.month)?;

        let billing = self.store.billing_records_before(community_id, before).await?;
        let expenses = self
            .store
            .approved_expenses_before(community_id, before)
            .await?;

        let summary =
            LedgerAggregator::summarize(community_id, key.month, opening, &billing, &expenses);

        if let Some(cache) = &self.cache {
            cache.insert(key, summary.clone());
        }
        Ok(summary)
    }

    /// Monthly summaries from `from` through `to`, inclusive.
    pub async fn statement(
        &self,
        community_id: CommunityId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<LedgerStatement, LedgerError> {
        let from = first_of_month(from);
        let to = first_of_month(to);
        if from > to {
            return Err(LedgerError::InvalidMonth(format!(
                "range starts at {from} after it ends at {to}"
            )));
        }
        let months = months_between(from, to) + 1;
        if months > MAX_STATEMENT_MONTHS {
            return Err(LedgerError::RangeTooLarge {
                months,
                max: MAX_STATEMENT_MONTHS,
            });
        }

        let community = self.community(community_id).await?;
        let before = end_of_window(to)?;
        let billing = self.store.billing_records_before(community_id, before).await?;
        let expenses = self
            .store
            .approved_expenses_before(community_id, before)
            .await?;

        Ok(LedgerStatement {
            community_id,
            from,
            to,
            months: LedgerAggregator::statement(
                community_id,
                from,
                to,
                community.opening_balance_or_zero(),
                &billing,
                &expenses,
            ),
        })
    }

    async fn community(&self, community_id: CommunityId) -> Result<Community, LedgerError> {
        self.store
            .find_community(community_id)
            .await?
            .ok_or(LedgerError::CommunityNotFound(community_id))
    }
}

/// Parses a `YYYY-MM` (or full date) month parameter.
pub fn parse_target_month(raw: &str) -> Result<NaiveDate, LedgerError> {
    parse_month(raw).ok_or_else(|| LedgerError::InvalidMonth(raw.to_string()))
}

fn end_of_window(month: NaiveDate) -> Result<NaiveDate, LedgerError> {
    next_month_start(month)
        .ok_or_else(|| LedgerError::InvalidMonth(format!("{month} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{BillingRecord, BillingStatus};
    use crate::community::CommunityKind;
    use crate::ledger::{ExpenseRecord, ExpenseStatus};
    use crate::store::{MemoryStore, StoreError};
    use residia_shared::types::{BillingRecordId, ExpenseId, UnitId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_store() -> (Arc<MemoryStore>, CommunityId) {
        let store = Arc::new(MemoryStore::new());
        let community = Community {
            id: CommunityId::new(),
            name: "Riverside".to_string(),
            kind: CommunityKind::Standalone,
            flat_amount: None,
            fixed_amount: Some(dec!(1000)),
            opening_balance: Some(dec!(250)),
            is_active: true,
        };
        let id = community.id;
        store.add_community(community);
        for (period, status) in [
            (date(2024, 1, 1), BillingStatus::Paid),
            (date(2024, 2, 1), BillingStatus::Paid),
            (date(2024, 2, 1), BillingStatus::Pending),
            (date(2024, 3, 1), BillingStatus::Paid),
        ] {
            store.add_record(BillingRecord {
                id: BillingRecordId::new(),
                unit_id: UnitId::new(),
                user_id: UserId::new(),
                community_id: id,
                period_date: period,
                amount: Some(dec!(1000)),
                status,
            });
        }
        store.add_expense(ExpenseRecord {
            id: ExpenseId::new(),
            community_id: id,
            amount: Some(dec!(400)),
            date: date(2024, 2, 14),
            status: ExpenseStatus::Approved,
        });
        (store, id)
    }

    #[tokio::test]
    async fn test_summarize_uses_stored_opening_balance() {
        let (store, id) = seeded_store();
        let service = LedgerService::new(store);

        let summary = service.summarize(id, date(2024, 2, 1), None).await.unwrap();

        assert_eq!(summary.opening_balance, dec!(250));
        assert_eq!(summary.previous_balance, dec!(1250));
        assert_eq!(summary.collected_this_month, dec!(1000));
        assert_eq!(summary.pending_this_month, dec!(1000));
        assert_eq!(summary.expenses_this_month, dec!(400));
        assert_eq!(summary.closing_balance, dec!(1850));
    }

    #[tokio::test]
    async fn test_summarize_with_override() {
        let (store, id) = seeded_store();
        let service = LedgerService::new(store);

        let summary = service
            .summarize(id, date(2024, 2, 1), Some(dec!(0)))
            .await
            .unwrap();

        assert_eq!(summary.previous_balance, dec!(1000));
    }

    #[tokio::test]
    async fn test_unknown_community() {
        let (store, _) = seeded_store();
        let service = LedgerService::new(store);

        let result = service.summarize(CommunityId::new(), date(2024, 2, 1), None).await;
        assert!(matches!(result, Err(LedgerError::CommunityNotFound(_))));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let (store, id) = seeded_store();
        store.fail_loads_for(id);
        let service = LedgerService::new(store);

        let result = service.summarize(id, date(2024, 2, 1), None).await;
        assert!(matches!(result, Err(LedgerError::Store(StoreError::Query(_)))));
    }

    #[tokio::test]
    async fn test_cached_summary_is_reused() {
        let (store, id) = seeded_store();
        let service = LedgerService::new(Arc::clone(&store)).with_cache(LedgerCache::new());

        let first = service.summarize(id, date(2024, 2, 1), None).await.unwrap();
        // Reads would now fail; the cached value is served instead.
        store.fail_loads_for(id);
        let second = service.summarize(id, date(2024, 2, 20), None).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_statement_is_continuous() {
        let (store, id) = seeded_store();
        let service = LedgerService::new(store);

        let statement = service
            .statement(id, date(2023, 12, 1), date(2024, 4, 1))
            .await
            .unwrap();

        assert_eq!(statement.months.len(), 5);
        assert!(
            statement
                .months
                .windows(2)
                .all(|w| w[0].closing_balance == w[1].previous_balance)
        );
        assert_eq!(statement.months[4].closing_balance, dec!(2850));
    }

    #[tokio::test]
    async fn test_statement_range_limits() {
        let (store, id) = seeded_store();
        let service = LedgerService::new(store);

        let inverted = service.statement(id, date(2024, 5, 1), date(2024, 1, 1)).await;
        assert!(matches!(inverted, Err(LedgerError::InvalidMonth(_))));

        let too_long = service.statement(id, date(2015, 1, 1), date(2024, 1, 1)).await;
        assert!(matches!(too_long, Err(LedgerError::RangeTooLarge { .. })));
    }

    #[test]
    fn test_parse_target_month() {
        assert_eq!(parse_target_month("2024-02").unwrap(), date(2024, 2, 1));
        assert_eq!(parse_target_month("2024-02-19").unwrap(), date(2024, 2, 1));
        assert!(matches!(
            parse_target_month("February"),
            Err(LedgerError::InvalidMonth(_))
        ));
    }
}
