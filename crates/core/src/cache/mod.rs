//! SQLite-backed cache storage with named generations.
//!
//! This module provides the blob store the cache manager runs against:
//!
//! - Named cache generations, created on open and deleted wholesale
//! - Request -> response entries keyed by a SHA-256 of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheKey, StoredResponse};
pub use generations::{Cache, GenerationInfo};
