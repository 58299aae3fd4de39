//! ferrite-server: the network front-end.
//!
//! Owns the listener and per-connection tasks, the command dispatcher that
//! executes decoded requests against the shared keyspace, the batch engines
//! (MGET/MSET/PIPELINE), the background expiration sweeper, and server
//! statistics. Exposed as a library so integration tests can drive an
//! in-process server over a real socket.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod server;
pub mod stats;
pub mod sweeper;

pub use config::Config;
pub use server::{Server, ServerContext};
pub use stats::{ServerStats, StatsSnapshot};
