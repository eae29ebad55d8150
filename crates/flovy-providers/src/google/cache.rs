//! Per-account calendar data cache.
//!
//! Fetched listings and event data are cached per Google account with a
//! TTL. Switching or disconnecting accounts clears the cache wholesale so
//! data from one account can never be served while another is active.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use flovy_core::CalendarData;
use tracing::debug;

use super::client::CalendarListing;

/// Default time-to-live for cached data.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct CacheEntry {
    listing: Option<CalendarListing>,
    data: Option<CalendarData>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(ttl: Duration) -> Self {
        Self {
            listing: None,
            data: None,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TTL cache of calendar listings and data, keyed by account id.
#[derive(Debug)]
pub struct DataCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DataCache {
    /// Creates a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached listing for an account, if fresh.
    pub fn listing(&self, account_id: &str) -> Option<CalendarListing> {
        self.entries
            .get(account_id)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.listing.clone())
    }

    /// Returns the cached data for an account, if fresh.
    pub fn data(&self, account_id: &str) -> Option<CalendarData> {
        self.entries
            .get(account_id)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.data.clone())
    }

    /// Stores a listing for an account, resetting the TTL.
    pub fn put_listing(&mut self, account_id: &str, listing: CalendarListing) {
        let entry = self.fresh_entry(account_id);
        entry.listing = Some(listing);
        debug!(account = %account_id, "cached calendar listing");
    }

    /// Stores data for an account, resetting the TTL.
    pub fn put_data(&mut self, account_id: &str, data: CalendarData) {
        let entry = self.fresh_entry(account_id);
        entry.data = Some(data);
        debug!(account = %account_id, "cached calendar data");
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            debug!(entries = count, "cleared calendar cache");
        }
    }

    /// Returns the entry for the account with its TTL reset, replacing an
    /// expired one entirely.
    fn fresh_entry(&mut self, account_id: &str) -> &mut CacheEntry {
        let ttl = self.ttl;
        let entry = self
            .entries
            .entry(account_id.to_string())
            .or_insert_with(|| CacheEntry::new(ttl));
        if entry.is_expired() {
            *entry = CacheEntry::new(ttl);
        } else {
            entry.expires_at = Instant::now() + ttl;
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flovy_core::DateRange;

    fn sample_data() -> CalendarData {
        CalendarData::new(vec![], DateRange::last_days(7), vec!["primary".into()])
    }

    fn sample_listing() -> CalendarListing {
        CalendarListing::from_entries(vec![])
    }

    #[test]
    fn cache_roundtrip() {
        let mut cache = DataCache::new(Duration::from_secs(60));

        assert!(cache.data("A").is_none());
        cache.put_data("A", sample_data());
        cache.put_listing("A", sample_listing());

        assert!(cache.data("A").is_some());
        assert!(cache.listing("A").is_some());
        assert!(cache.data("B").is_none());
    }

    #[test]
    fn entries_expire() {
        let mut cache = DataCache::new(Duration::from_millis(30));
        cache.put_data("A", sample_data());
        assert!(cache.data("A").is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.data("A").is_none());
    }

    #[test]
    fn clear_removes_all_accounts() {
        let mut cache = DataCache::new(Duration::from_secs(60));
        cache.put_data("A", sample_data());
        cache.put_data("B", sample_data());

        cache.clear();
        assert!(cache.data("A").is_none());
        assert!(cache.data("B").is_none());
    }

    #[test]
    fn expired_entry_is_replaced_not_revived() {
        let mut cache = DataCache::new(Duration::from_millis(30));
        cache.put_data("A", sample_data());
        std::thread::sleep(Duration::from_millis(40));

        // Writing the listing after expiry must not bring the stale data back.
        cache.put_listing("A", sample_listing());
        assert!(cache.data("A").is_none());
        assert!(cache.listing("A").is_some());
    }
}
