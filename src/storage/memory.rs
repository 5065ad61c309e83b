//! In-process ledger, used for dry runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::{LedgerSnapshot, ResultLedger};

/// Ledger kept in memory for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    sites: Mutex<HashMap<String, LedgerSnapshot>>,
    appends: Mutex<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot for a site.
    pub fn with_snapshot(site: &str, snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new();
        ledger.lock_sites().insert(site.to_string(), snapshot);
        ledger
    }

    /// Number of `append` calls so far.
    pub fn append_count(&self) -> usize {
        *self.appends.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_sites(&self) -> std::sync::MutexGuard<'_, HashMap<String, LedgerSnapshot>> {
        self.sites.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResultLedger for MemoryLedger {
    async fn load_snapshot(&self, site: &str) -> Result<LedgerSnapshot> {
        Ok(self.lock_sites().get(site).cloned().unwrap_or_default())
    }

    async fn append(&self, site: &str, accepted: &[String], rejected: &[String]) -> Result<()> {
        {
            let mut sites = self.lock_sites();
            let snapshot = sites.entry(site.to_string()).or_default();
            snapshot.accepted.extend(accepted.iter().cloned());
            snapshot.rejected.extend(rejected.iter().cloned());
        }
        *self.appends.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
