//! Result ledger: which offers have already been accepted or rejected.
//!
//! Each site owns two append-only id sets. An id lands in at most one of
//! them and is never moved or removed; their union is what the crawler
//! skips on later runs.
//!
//! ## File Layout
//!
//! ```text
//! {ledger_dir}/
//! ├── leboncoin.accepted.list   # one id per line, no header
//! ├── leboncoin.rejected.list
//! ├── pap.accepted.list
//! └── pap.rejected.list
//! ```

pub mod local;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalLedger;
pub use memory::MemoryLedger;

/// Both id sets of one site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub accepted: HashSet<String>,
    pub rejected: HashSet<String>,
}

impl LedgerSnapshot {
    /// Every id already classified.
    pub fn seen(&self) -> HashSet<String> {
        self.accepted.union(&self.rejected).cloned().collect()
    }

    /// Ids recorded in both sets (should never happen).
    pub fn conflicts(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .accepted
            .intersection(&self.rejected)
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Durable per-site record of classified offers.
#[async_trait]
pub trait ResultLedger: Send + Sync {
    /// Load both id sets. A site without history yields empty sets.
    async fn load_snapshot(&self, site: &str) -> Result<LedgerSnapshot>;

    /// Load the ids already seen for a site.
    async fn load(&self, site: &str) -> Result<HashSet<String>> {
        Ok(self.load_snapshot(site).await?.seen())
    }

    /// Record a finished crawl's verdicts.
    async fn append(&self, site: &str, accepted: &[String], rejected: &[String]) -> Result<()>;
}
