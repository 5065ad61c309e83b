// src/pipeline/walk.rs

//! Paginated search walk for one site.
//!
//! Pages are fetched strictly one after another: page `n + 1` is requested
//! only once every new candidate of page `n` has a verdict or a fault. The
//! walk ends on the adapter's last-page signal or at the page ceiling, and
//! the ledger is appended once, after the last page.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Candidate, SiteReport};
use crate::services::{FilterPool, TextClassifier};
use crate::sites::SiteAdapter;
use crate::storage::ResultLedger;
use crate::utils::http::HttpFetcher;

/// Drives one site's crawl from page 1 to its last page.
pub struct PaginationWalker {
    site: Arc<dyn SiteAdapter>,
    fetcher: HttpFetcher,
    pool: FilterPool,
    ledger: Arc<dyn ResultLedger>,
    max_pages: u32,
    persist: bool,
}

impl PaginationWalker {
    pub fn new(
        site: Arc<dyn SiteAdapter>,
        fetcher: HttpFetcher,
        classifier: Arc<TextClassifier>,
        ledger: Arc<dyn ResultLedger>,
        max_pages: u32,
        workers: usize,
    ) -> Self {
        let pool = FilterPool::new(Arc::clone(&site), fetcher.clone(), classifier, workers);
        Self {
            site,
            fetcher,
            pool,
            ledger,
            max_pages,
            persist: true,
        }
    }

    /// Skip the final ledger append.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.persist = !dry_run;
        self
    }

    /// Crawl every page and record the verdicts.
    pub async fn run(&self) -> Result<SiteReport> {
        let name = self.site.name().to_string();
        let mut report = SiteReport::new(&name);

        // Ids classified on earlier runs, then also the ones seen this run.
        let mut seen: HashSet<String> = self.ledger.load(&name).await?;
        log::info!("{}: {} offers already classified", name, seen.len());

        let mut page = 1;
        loop {
            if page > self.max_pages {
                log::info!("{}: reached the {} page ceiling", name, self.max_pages);
                break;
            }
            log::info!("{}: searching page {}", name, page);
            let body = self.fetcher.fetch(&self.site.search_url(page)).await;
            report.pages += 1;

            let listing = match self.site.parse_listing_page(&body, page) {
                Ok(listing) => listing,
                Err(e) => {
                    log::error!("{}: page {} abandoned: {}", name, page, e);
                    report.faults += 1;
                    break;
                }
            };

            let found = listing.candidates.len();
            let fresh: Vec<Candidate> = listing
                .candidates
                .into_iter()
                .filter(|c| seen.insert(c.id.clone()))
                .collect();
            report.candidates += found;
            report.skipped += found - fresh.len();

            let ids: Vec<String> = fresh.iter().map(|c| c.id.clone()).collect();
            for (id, result) in ids.into_iter().zip(self.pool.run(fresh).await) {
                match result {
                    Ok(verdict) if verdict.accepted => report.accepted.push(verdict.id),
                    Ok(verdict) => report.rejected.push(verdict.id),
                    Err(e) => {
                        log::error!("{}: offer {} abandoned: {}", name, id, e);
                        report.faults += 1;
                    }
                }
            }

            if listing.is_last_page {
                log::debug!("{}: page {} is the last page", name, page);
                break;
            }
            page += 1;
        }

        if self.persist {
            self.ledger
                .append(&name, &report.accepted, &report.rejected)
                .await?;
            report.persisted = true;
        }

        log::info!(
            "{}: {} pages, {} new offers ({} accepted, {} rejected, {} faults), {} skipped",
            name,
            report.pages,
            report.classified() + report.faults,
            report.accepted.len(),
            report.rejected.len(),
            report.faults,
            report.skipped
        );

        Ok(report)
    }
}
