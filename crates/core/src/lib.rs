//! Core types and shared functionality for presta.
//!
//! This crate provides:
//! - Versioned cache stores with a SQLite backend
//! - Unified error types
//! - Layered application configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedResponse, StoreFamily, StoreInfo};
pub use config::AppConfig;
pub use error::Error;
