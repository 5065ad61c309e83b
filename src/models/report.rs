//! Crawl statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one site's crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteReport {
    /// Site name
    pub site: String,

    /// Search pages fetched
    pub pages: u32,

    /// Candidates found on search pages (after in-page deduplication)
    pub candidates: usize,

    /// Candidates skipped because they were already classified
    pub skipped: usize,

    /// Accepted ids in discovery order
    pub accepted: Vec<String>,

    /// Rejected ids in discovery order
    pub rejected: Vec<String>,

    /// Candidates abandoned after a fault
    pub faults: usize,

    /// Ledger was written for this run
    pub persisted: bool,
}

impl SiteReport {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    /// Candidates that reached a verdict.
    pub fn classified(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// A site whose crawl could not complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site: String,
    pub error: String,
}

/// Outcome of a whole run across all sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub debug: bool,
    pub sites: Vec<SiteReport>,
    pub failures: Vec<SiteFailure>,
}

impl RunSummary {
    /// Total accepted offers across sites.
    pub fn accepted_count(&self) -> usize {
        self.sites.iter().map(|s| s.accepted.len()).sum()
    }

    /// Total rejected offers across sites.
    pub fn rejected_count(&self) -> usize {
        self.sites.iter().map(|s| s.rejected.len()).sum()
    }

    /// Total abandoned candidates across sites.
    pub fn fault_count(&self) -> usize {
        self.sites.iter().map(|s| s.faults).sum()
    }
}
