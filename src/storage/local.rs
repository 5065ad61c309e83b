//! Local filesystem ledger.
//!
//! Each append writes a whole run's ids for one outcome with a single
//! `write_all` on a file opened in append mode, then syncs it. A crash
//! before the append loses that run's verdicts and nothing else.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::storage::{LedgerSnapshot, ResultLedger};

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Accepted,
    Rejected,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
        }
    }
}

/// Ledger stored as plain id lists under one directory.
#[derive(Debug, Clone)]
pub struct LocalLedger {
    root_dir: PathBuf,
}

impl LocalLedger {
    /// Create a ledger rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Ledger directory.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn path(&self, site: &str, outcome: Outcome) -> PathBuf {
        self.root_dir
            .join(format!("{}.{}.list", site, outcome.as_str()))
    }

    /// Read ids, one per line. A missing file is an empty list.
    async fn read_ids(&self, path: &Path) -> Result<Vec<String>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    async fn append_ids(&self, path: &Path, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .await?;

        // A hand-edited file may lack its final newline.
        let len = file.metadata().await?.len();
        let needs_newline = if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1)).await?;
            file.read_exact(&mut last).await?;
            last[0] != b'\n'
        } else {
            false
        };

        let mut buffer = String::new();
        if needs_newline {
            buffer.push('\n');
        }
        for id in ids {
            buffer.push_str(id);
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultLedger for LocalLedger {
    async fn load_snapshot(&self, site: &str) -> Result<LedgerSnapshot> {
        let accepted = self.read_ids(&self.path(site, Outcome::Accepted)).await?;
        let rejected = self.read_ids(&self.path(site, Outcome::Rejected)).await?;

        let snapshot = LedgerSnapshot {
            accepted: accepted.into_iter().collect(),
            rejected: rejected.into_iter().collect(),
        };

        let conflicts = snapshot.conflicts();
        if !conflicts.is_empty() {
            log::warn!(
                "{}: {} id(s) recorded as both accepted and rejected: {}",
                site,
                conflicts.len(),
                conflicts.join(", ")
            );
        }

        Ok(snapshot)
    }

    async fn append(&self, site: &str, accepted: &[String], rejected: &[String]) -> Result<()> {
        self.append_ids(&self.path(site, Outcome::Accepted), accepted)
            .await?;
        self.append_ids(&self.path(site, Outcome::Rejected), rejected)
            .await?;
        log::debug!(
            "{}: ledger appended ({} accepted, {} rejected) in {}",
            site,
            accepted.len(),
            rejected.len(),
            self.root_dir.display()
        );
        Ok(())
    }
}
