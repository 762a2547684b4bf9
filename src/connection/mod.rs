//! Connection management for SQLChat.
//!
//! Opens, probes and caches database handles shared across sessions.

mod cache;
mod connector;

pub use cache::{ConnectionCache, DEFAULT_TTL};
pub use connector::{ClientOpener, DatabaseConnector, DriverOpener};
