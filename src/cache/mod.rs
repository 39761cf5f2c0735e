//! In-process response cache and route-prefix revalidation.
//!
//! Storefront reads cache serialized snapshots under keys that start with the
//! route they serve (`/products`, `/collections/<slug>`, ...). Admin writes call
//! [`Revalidator::revalidate`] with the affected route prefixes, which drops
//! every entry under them before the write returns.

use dashmap::DashMap;
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::events::{Event, EventSender};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let expired = match self.store.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.store.remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        self.store
            .insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    pub fn delete(&self, key: &str) {
        self.store.remove(key);
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Removes every entry whose key starts with `prefix`; returns how many.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.store.len();
        self.store.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.store.len())
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl);
        Ok(())
    }
}

/// Route prefixes cached by the storefront
pub mod paths {
    pub const PRODUCTS: &str = "/products";
    pub const CATEGORIES: &str = "/categories";
    pub const COLLECTIONS: &str = "/collections";
    pub const MARKETS: &str = "/markets";
    pub const PAGES: &str = "/pages";
}

#[derive(Debug, Clone)]
pub struct Revalidator {
    cache: Arc<InMemoryCache>,
    event_sender: Arc<EventSender>,
}

impl Revalidator {
    pub fn new(cache: Arc<InMemoryCache>, event_sender: Arc<EventSender>) -> Self {
        Self {
            cache,
            event_sender,
        }
    }

    pub fn cache(&self) -> &Arc<InMemoryCache> {
        &self.cache
    }

    /// Drops cached responses under each prefix. Returns entries removed.
    pub async fn revalidate(&self, prefixes: &[&str]) -> usize {
        let removed: usize = prefixes
            .iter()
            .map(|prefix| self.cache.invalidate_prefix(prefix))
            .sum();

        counter!("lustre_cache_revalidations_total", 1);
        debug!(?prefixes, removed, "Revalidated cached paths");

        self.event_sender
            .send_or_log(Event::PathsRevalidated {
                paths: prefixes.iter().map(|p| p.to_string()).collect(),
                entries_removed: removed,
            })
            .await;

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn expired_entries_read_as_missing() {
        let cache = InMemoryCache::new();
        cache.set("/products", "[]".into(), Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("/products").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_prefix_only_touches_matching_keys() {
        let cache = InMemoryCache::new();
        cache.set("/products", "a".into(), None);
        cache.set("/products/ring", "b".into(), None);
        cache.set("/collections/summer", "c".into(), None);

        assert_eq!(cache.invalidate_prefix("/products"), 2);
        assert!(cache.exists("/collections/summer"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn json_helpers_round_trip() {
        let cache = InMemoryCache::new();
        cache.set_json("/pages/about", &vec![1, 2, 3], None).unwrap();
        let back: Option<Vec<i32>> = cache.get_json("/pages/about").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn revalidator_emits_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let cache = Arc::new(InMemoryCache::new());
        cache.set("/categories", "x".into(), None);
        let revalidator = Revalidator::new(cache.clone(), Arc::new(EventSender::new(tx)));

        let removed = revalidator
            .revalidate(&[paths::CATEGORIES, paths::PRODUCTS])
            .await;
        assert_eq!(removed, 1);
        assert!(cache.is_empty());
        assert_eq!(
            rx.recv().await,
            Some(Event::PathsRevalidated {
                paths: vec!["/categories".into(), "/products".into()],
                entries_removed: 1,
            })
        );
    }
}
