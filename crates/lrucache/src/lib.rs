//! # lrucache
//!
//! Fixed-capacity, in-memory LRU cache safe for concurrent callers.
//!
//! ## Architecture
//! - **Index**: AHash map from key to slot (O(1))
//! - **Recency list**: doubly-linked by slot index, head = most recently used (O(1))
//! - **Eviction**: a new key that overflows capacity removes the tail (O(1))
//! - **Guard**: one exclusive mutex; `get` reorders the list, so it locks too
//!
//! ```
//! use lrucache::Cache;
//!
//! let cache = Cache::new(2)?;
//! cache.set("k1", "v1");
//! cache.set("k2", "v2");
//! assert_eq!(cache.get(&"k1"), Some("v1"));
//!
//! cache.set("k3", "v3"); // evicts k2
//! assert_eq!(cache.get(&"k2"), None);
//! # Ok::<(), lrucache::Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod lru;

pub use cache::Cache;
pub use config::{CacheConfig, DEFAULT_CAPACITY};
pub use error::{Error, Result};
pub use lru::{Keys, LruCache};
