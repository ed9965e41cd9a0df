//! Core types and shared functionality for sw-cache.
//!
//! This crate provides:
//! - Cache storage with named generations on a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheDb, CacheKey, GenerationInfo, StoredResponse};
pub use config::{AppConfig, ConfigError, InstallPolicy, Strategy};
pub use error::Error;
