//! SQLite-backed cache stores for offline request serving.
//!
//! This module provides the durable half of the gateway: named,
//! version-suffixed stores holding full captured responses, with async
//! access via tokio-rusqlite. It supports:
//!
//! - Exact-key lookups over hashed request identities
//! - Atomic bulk population for the install phase
//! - Whole-store deletion for generation cleanup
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entry;
pub mod key;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::CachedResponse;
pub use stores::{StoreFamily, StoreInfo};
