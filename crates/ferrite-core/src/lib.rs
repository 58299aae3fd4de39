//! ferrite-core: the storage engine.
//!
//! Owns the typed containers (list, set, hash), the concurrent keyspace with
//! its TTL index, glob matching for KEYS/SCAN, the advisory buffer pool, and
//! the clock helpers. Everything here is synchronous; the server crate
//! decides how work is scheduled onto it.

pub mod error;
pub mod keyspace;
pub mod pattern;
pub mod pool;
pub mod time;
pub mod types;

pub use error::{IncrError, WrongType};
pub use keyspace::{CacheItem, Keyspace, TtlResult};
pub use pattern::glob_match;
pub use pool::BufferPool;
pub use types::Value;
