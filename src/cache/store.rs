//! TTL-bounded LRU store of rendered responses.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::clock::Clock;
use super::config::CacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A buffered response, replayed byte for byte on a hit.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Shared page cache. Racing writers for one key are last-write-wins.
pub struct PageCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: RwLock<LruCache<PageKey, Entry>>,
}

impl PageCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = RwLock::new(LruCache::new(config.max_entries_non_zero()));
        Self {
            config,
            clock,
            entries,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up a live entry; expired entries are dropped on access.
    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!("yatube_page_cache_hit_total").increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!("yatube_page_cache_expired_total").increment(1);
            debug!(target = "yatube::cache", key = %key, "cache entry expired");
        }
        counter!("yatube_page_cache_miss_total").increment(1);
        None
    }

    /// Store a response; returns the key evicted to make room, if any.
    pub fn put(&self, key: PageKey, response: CachedResponse) -> Option<PageKey> {
        let entry = Entry {
            response,
            expires_at: self.clock.now() + self.config.ttl,
        };
        counter!("yatube_page_cache_store_total").increment(1);

        let evicted = rw_write(&self.entries, SOURCE, "put")
            .push(key.clone(), entry)
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted));
        if evicted.is_some() {
            counter!("yatube_page_cache_evict_total").increment(1);
        }
        evicted
    }

    /// Drop every entry; returns how many were stored.
    pub fn clear(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let cleared = entries.len();
        entries.clear();
        counter!("yatube_page_cache_clear_total").increment(1);
        cleared
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
