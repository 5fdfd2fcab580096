//! A concurrent hash map that grows without ever pausing the whole table.
//!
//! Conventional hash maps rehash everything in one shot once they outgrow their bucket array,
//! which turns a single insert into an O(n) stall. This map instead spreads that cost across the
//! operations that follow: once the load factor is exceeded, a larger secondary table is
//! allocated, and every subsequent `insert`/`get`/`remove` also migrates a small, bounded slice of
//! entries out of the old table. Each bucket is guarded by its own lock, so operations on
//! unrelated keys never block each other.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use scalemap::HashMap;
//!
//! let map = Arc::new(HashMap::new());
//! let mut joins = Vec::new();
//! for t in 0..4 {
//!     let map = Arc::clone(&map);
//!     joins.push(thread::spawn(move || {
//!         for i in t * 100..(t + 1) * 100 {
//!             map.insert(i, i * 2);
//!         }
//!     }));
//! }
//! for j in joins {
//!     j.join().unwrap();
//! }
//!
//! assert_eq!(map.len(), 400);
//! assert_eq!(map.get(&42), Some(84));
//! ```

mod bucket;
mod config;
mod error;
mod map;

pub use config::{Config, DEFAULT_INCREASE_RATE, DEFAULT_INITIAL_BUCKETS, DEFAULT_MAX_LOAD_FACTOR};
pub use error::HashMapError;
pub use map::HashMap;
