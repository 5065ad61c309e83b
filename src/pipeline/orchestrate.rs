// src/pipeline/orchestrate.rs

//! Multi-site crawl orchestration.
//!
//! Every site gets its own tokio task on the multi-threaded runtime, so
//! sites crawl in parallel with their own worker pools. Notifications are
//! sent only once every site has finished.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use crate::error::{AppError, Result};
use crate::models::{Config, RunSummary, SiteConfig, SiteFailure, SiteReport};
use crate::pipeline::PaginationWalker;
use crate::services::{Notifier, TextClassifier, notifier};
use crate::sites::{self, SiteAdapter};
use crate::storage::{LocalLedger, ResultLedger};
use crate::utils::http::HttpFetcher;

struct SitePlan {
    adapter: Arc<dyn SiteAdapter>,
    max_pages: u32,
    workers: usize,
}

/// Runs every configured site and hands accepted offers to a notifier.
pub struct Orchestrator {
    fetcher: HttpFetcher,
    classifier: Arc<TextClassifier>,
    ledger: Arc<dyn ResultLedger>,
    notifier: Arc<dyn Notifier>,
    sites: Vec<SitePlan>,
    debug: bool,
}

impl Orchestrator {
    pub fn new(
        fetcher: HttpFetcher,
        classifier: Arc<TextClassifier>,
        ledger: Arc<dyn ResultLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            ledger,
            notifier,
            sites: Vec::new(),
            debug: false,
        }
    }

    /// Wire everything from the configuration.
    ///
    /// `only` restricts the run to the named sites (enabled or not); an
    /// empty slice means every enabled site.
    pub fn from_config(config: &Config, only: &[String]) -> Result<Self> {
        config.validate()?;

        let fetcher = HttpFetcher::from_config(&config.http)?;
        let classifier = Arc::new(TextClassifier::new(&config.rules)?);
        let ledger = Arc::new(LocalLedger::new(&config.storage.ledger_dir));
        let notifier = notifier::from_config(&config.notify);

        let mut orchestrator =
            Self::new(fetcher, classifier, ledger, notifier).debug(config.debug);

        let selected: Vec<&SiteConfig> = if only.is_empty() {
            config.enabled_sites().collect()
        } else {
            only.iter()
                .map(|name| {
                    config
                        .site(name)
                        .ok_or_else(|| AppError::config(format!("Unknown site '{name}'")))
                })
                .collect::<Result<_>>()?
        };

        for site in selected {
            let adapter = sites::from_config(site, &config.search)?;
            orchestrator = orchestrator.with_site(adapter, site.max_pages, site.workers)?;
        }

        if orchestrator.sites.is_empty() {
            return Err(AppError::config("No site selected"));
        }
        Ok(orchestrator)
    }

    /// Add a site to crawl. Both budgets must be positive.
    pub fn with_site(
        mut self,
        adapter: Arc<dyn SiteAdapter>,
        max_pages: u32,
        workers: usize,
    ) -> Result<Self> {
        if max_pages == 0 || workers == 0 {
            return Err(AppError::validation(format!(
                "{}: max_pages and workers must be greater than 0 (got {max_pages} and {workers})",
                adapter.name()
            )));
        }
        self.sites.push(SitePlan {
            adapter,
            max_pages,
            workers,
        });
        Ok(self)
    }

    /// Dry run: no ledger writes, no notifications.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Crawl every site, wait for all of them, then notify.
    pub async fn run(&self) -> RunSummary {
        let start_time = Utc::now();
        if self.debug {
            log::info!("Debug mode: ledger and notifications are disabled");
        }

        let (adapters, handles): (Vec<_>, Vec<_>) = self
            .sites
            .iter()
            .map(|plan| {
                let walker = PaginationWalker::new(
                    Arc::clone(&plan.adapter),
                    self.fetcher.clone(),
                    Arc::clone(&self.classifier),
                    Arc::clone(&self.ledger),
                    plan.max_pages,
                    plan.workers,
                )
                .dry_run(self.debug);
                let handle = tokio::spawn(async move { walker.run().await });
                (Arc::clone(&plan.adapter), handle)
            })
            .unzip();

        let mut finished: Vec<(Arc<dyn SiteAdapter>, SiteReport)> = Vec::new();
        let mut failures = Vec::new();
        for (adapter, joined) in adapters.into_iter().zip(join_all(handles).await) {
            let outcome = match joined {
                Ok(result) => result,
                Err(e) => Err(AppError::task(adapter.name(), e)),
            };
            match outcome {
                Ok(report) => finished.push((adapter, report)),
                Err(e) => {
                    log::error!("{}: crawl failed: {}", adapter.name(), e);
                    failures.push(SiteFailure {
                        site: adapter.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.debug {
            for (_, report) in &finished {
                log::info!(
                    "{}: {} accepted, {} rejected, {} faults (dry run)",
                    report.site,
                    report.accepted.len(),
                    report.rejected.len(),
                    report.faults
                );
            }
        } else {
            self.notify_accepted(&finished).await;
        }

        RunSummary {
            start_time,
            end_time: Utc::now(),
            debug: self.debug,
            sites: finished.into_iter().map(|(_, report)| report).collect(),
            failures,
        }
    }

    async fn notify_accepted(&self, finished: &[(Arc<dyn SiteAdapter>, SiteReport)]) {
        for (adapter, report) in finished {
            for id in &report.accepted {
                let url = adapter.detail_url(id);
                if let Err(e) = self.notifier.notify(adapter.name(), id, &url).await {
                    log::warn!("{}: could not notify offer {}: {}", adapter.name(), id, e);
                }
            }
        }
    }
}
