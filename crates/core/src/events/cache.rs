//! Customer summary caching using Moka.
//!
//! Summaries are precomputed listings for read paths. The balance engine
//! never reads from this cache.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use ledgerbook_shared::config::LedgerSettings;
use ledgerbook_shared::types::CustomerId;

use super::notifier::CacheInvalidator;
use crate::ledger::CustomerSummary;

/// TTL cache of customer summaries, invalidated on every ledger change.
#[derive(Clone)]
pub struct SummaryCache {
    cache: Cache<CustomerId, Arc<CustomerSummary>>,
}

impl SummaryCache {
    /// Creates a cache holding at most `max_capacity` summaries for `ttl_secs`.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Creates a cache from ledger settings.
    #[must_use]
    pub fn from_settings(settings: &LedgerSettings) -> Self {
        Self::with_config(
            settings.summary_cache_capacity,
            settings.summary_cache_ttl_secs,
        )
    }

    /// Returns the cached summary, if any.
    #[must_use]
    pub fn get(&self, customer_id: CustomerId) -> Option<CustomerSummary> {
        self.cache.get(&customer_id).map(|s| (*s).clone())
    }

    /// Stores a summary.
    pub fn insert(&self, summary: CustomerSummary) {
        self.cache.insert(summary.customer_id, Arc::new(summary));
    }

    /// Invalidates one customer's summary.
    pub fn invalidate(&self, customer_id: CustomerId) {
        self.cache.invalidate(&customer_id);
    }

    /// Invalidates all cached summaries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl CacheInvalidator for SummaryCache {
    fn ledger_changed(&self, customer_id: CustomerId) {
        self.invalidate(customer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary(customer_id: CustomerId) -> CustomerSummary {
        CustomerSummary {
            customer_id,
            invoice_total: dec!(100),
            payment_total: dec!(40),
            return_total: dec!(0),
            balance: dec!(60),
            entry_count: 2,
            pending_count: 0,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = SummaryCache::with_config(10, 60);
        let customer = CustomerId::new();
        assert!(cache.get(customer).is_none());

        cache.insert(summary(customer));
        assert_eq!(cache.get(customer), Some(summary(customer)));
    }

    #[test]
    fn test_ledger_change_invalidates_only_that_customer() {
        let cache = SummaryCache::with_config(10, 60);
        let changed = CustomerId::new();
        let untouched = CustomerId::new();
        cache.insert(summary(changed));
        cache.insert(summary(untouched));

        cache.ledger_changed(changed);

        assert!(cache.get(changed).is_none());
        assert!(cache.get(untouched).is_some());
    }

    #[test]
    fn test_entry_count() {
        let cache = SummaryCache::from_settings(&LedgerSettings::default());
        cache.insert(summary(CustomerId::new()));
        cache.insert(summary(CustomerId::new()));
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 2);

        cache.invalidate_all();
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 0);
    }
}
