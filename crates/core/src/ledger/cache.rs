//! Short-lived cache for ledger summaries.
//!
//! Summaries are cheap to recompute but dashboards poll them; a small TTL
//! absorbs repeated reads while keeping newly paid charges visible quickly.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::sync::Cache;
use residia_shared::types::CommunityId;
use rust_decimal::Decimal;

use super::types::LedgerSummary;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Default time-to-live for cache entries (20 seconds).
const DEFAULT_TTL_SECS: u64 = 20;

/// Identifies one summary request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerCacheKey {
    /// Community summarized.
    pub community_id: CommunityId,
    /// First day of the month.
    pub month: NaiveDate,
    /// Opening balance override, if any.
    pub opening_override: Option<Decimal>,
}

/// Cache of ledger summaries. Cloning shares the underlying cache.
#[derive(Clone)]
pub struct LedgerCache {
    cache: Cache<LedgerCacheKey, Arc<LedgerSummary>>,
}

impl LedgerCache {
    /// Creates a cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache holding at most `max_capacity` entries for `ttl_secs` each.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Cached summary for `key`, if still fresh.
    #[must_use]
    pub fn get(&self, key: &LedgerCacheKey) -> Option<LedgerSummary> {
        self.cache.get(key).map(|summary| (*summary).clone())
    }

    /// Stores a summary.
    pub fn insert(&self, key: LedgerCacheKey, summary: LedgerSummary) {
        self.cache.insert(key, Arc::new(summary));
    }

    /// Drops every cached summary, e.g. after a billing run.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance so `entry_count` is accurate.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new()
    }
}
