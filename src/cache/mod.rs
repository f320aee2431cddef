//! Page cache for rendered listings.
//!
//! Rendered responses are stored by request path plus query string and served
//! verbatim until they expire or the cache is cleared:
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! max_entries = 256
//! ```
//!
//! Expiry is driven by an injected [`Clock`], so tests can advance time
//! deterministically with [`ManualClock`].

mod clock;
mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use keys::PageKey;
pub use middleware::page_cache_layer;
pub use store::{CachedResponse, PageCache};
