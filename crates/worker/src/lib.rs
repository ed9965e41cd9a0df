//! Cache manager for sw-cache.
//!
//! This crate provides the request/response types, the network `Fetcher`
//! seam with its reqwest implementation, and the `CacheManager` that reacts to
//! install, activate, fetch and message events.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, Request, Response, ResponseSource};
pub use worker::{
    ActivationReport, CacheManager, ClientMessage, ControlCommand, FetchOutcome, InstallReport, Lifecycle,
    LifecycleSnapshot, MessageOutcome, PassthroughReason, Revalidation, RevalidationOutcome, SkippedAsset,
    WorkerSettings, WorkerState,
};

pub use reqwest::{Method, StatusCode, header};
