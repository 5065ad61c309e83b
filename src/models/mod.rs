// src/models/mod.rs

//! Domain models for the crawler.

mod config;
mod listing;
mod report;

// Re-export all public types
pub use config::{
    Config, DEBUG_ENV, ExclusionRules, HttpConfig, NotifyConfig, POOL_SIZE_ENV, Pagination,
    SearchFilter, SiteConfig, StorageConfig,
};
pub use listing::{Candidate, ListingPage, Verdict};
pub use report::{RunSummary, SiteFailure, SiteReport};
