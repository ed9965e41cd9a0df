//! Cache storage MCP tools.
//!
//! This module provides tools for inspecting and deleting cache generations.

pub mod delete;
pub mod get;
pub mod list;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
