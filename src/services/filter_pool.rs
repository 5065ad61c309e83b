// src/services/filter_pool.rs

//! Bounded detail-fetch-and-classify pool.
//!
//! Every candidate runs in its own tokio task; a per-site semaphore caps how
//! many of them hold a permit at once. Results come back in input order.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{AppError, Result};
use crate::models::{Candidate, Verdict};
use crate::services::TextClassifier;
use crate::sites::SiteAdapter;
use crate::utils::http::HttpFetcher;

/// Worker pool for one site.
#[derive(Clone)]
pub struct FilterPool {
    site: Arc<dyn SiteAdapter>,
    fetcher: HttpFetcher,
    classifier: Arc<TextClassifier>,
    permits: Arc<Semaphore>,
}

impl FilterPool {
    /// Create a pool running at most `workers` candidates at a time.
    pub fn new(
        site: Arc<dyn SiteAdapter>,
        fetcher: HttpFetcher,
        classifier: Arc<TextClassifier>,
        workers: usize,
    ) -> Self {
        Self {
            site,
            fetcher,
            classifier,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Fetch, parse and classify every candidate.
    ///
    /// `result[i]` belongs to `candidates[i]`. A failing or panicking task
    /// only affects its own slot.
    pub async fn run(&self, candidates: Vec<Candidate>) -> Vec<Result<Verdict>> {
        let handles: Vec<_> = candidates
            .into_iter()
            .map(|candidate| {
                let id = candidate.id.clone();
                let site = Arc::clone(&self.site);
                let fetcher = self.fetcher.clone();
                let classifier = Arc::clone(&self.classifier);
                let permits = Arc::clone(&self.permits);

                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| AppError::task(&candidate.id, e))?;
                    check_candidate(site.as_ref(), &fetcher, &classifier, &candidate).await
                });
                (id, handle)
            })
            .collect();

        let mut verdicts = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            verdicts.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(AppError::task(id, e)),
            });
        }
        verdicts
    }
}

async fn check_candidate(
    site: &dyn SiteAdapter,
    fetcher: &HttpFetcher,
    classifier: &TextClassifier,
    candidate: &Candidate,
) -> Result<Verdict> {
    let url = site.detail_url(&candidate.id);
    let body = fetcher.fetch(&url).await;
    let description = site.parse_detail_page(&body)?;

    let text = TextClassifier::combine(&candidate.title, &description);
    match classifier.rejection(&text) {
        None => {
            log::info!("{}: accepted {} ({})", site.name(), candidate.id, candidate.title);
            log::debug!("{}: {}", candidate.id, text);
            Ok(Verdict::accepted(&candidate.id))
        }
        Some(rule) => {
            log::debug!("{}: rejected {} ({:?})", site.name(), candidate.id, rule);
            Ok(Verdict::rejected(&candidate.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::ExclusionRules;
    use crate::test_support::{StubSite, StubTransport};

    fn pool(transport: &Arc<StubTransport>, site: &Arc<StubSite>, workers: usize) -> FilterPool {
        FilterPool::new(
            site.clone(),
            HttpFetcher::new(transport.clone(), Duration::from_secs(1)),
            Arc::new(TextClassifier::new(&ExclusionRules::default()).unwrap()),
            workers,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdicts_follow_input_order() {
        let transport = Arc::new(StubTransport::new());
        let site = Arc::new(StubSite::new("stub"));
        transport.route(&site.detail_url("1"), "Calme, rez-de-chaussée");
        transport.route(&site.detail_url("2"), "Agence Foncia");
        transport.route(&site.detail_url("3"), "Lumineux");
        // Finish in reverse order.
        transport.delay(&site.detail_url("1"), Duration::from_millis(30));
        transport.delay(&site.detail_url("2"), Duration::from_millis(20));
        transport.delay(&site.detail_url("3"), Duration::from_millis(10));

        let candidates = vec![
            Candidate::new("Studio", "1"),
            Candidate::new("T2", "2"),
            Candidate::new("Studio", "3"),
        ];
        let verdicts: Vec<Verdict> = pool(&transport, &site, 3)
            .run(candidates)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            verdicts,
            vec![
                Verdict::accepted("1"),
                Verdict::rejected("2"),
                Verdict::accepted("3"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(StubTransport::new());
        let site = Arc::new(StubSite::new("stub"));
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| {
                let id = i.to_string();
                transport.route(&site.detail_url(&id), "ok");
                transport.delay(&site.detail_url(&id), Duration::from_millis(50));
                Candidate::new("Studio", id)
            })
            .collect();

        let results = pool(&transport, &site, 3).run(candidates).await;

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.max_in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_is_isolated() {
        let transport = Arc::new(StubTransport::new());
        let site = Arc::new(StubSite::new("stub"));
        transport.route(&site.detail_url("1"), "ok");
        transport.route(&site.detail_url("2"), StubSite::MISSING);
        transport.route(&site.detail_url("3"), StubSite::PANIC);
        transport.route(&site.detail_url("4"), "ok");
        transport.fail_first(&site.detail_url("4"), 2);

        let results = pool(&transport, &site, 2)
            .run(vec![
                Candidate::new("a", "1"),
                Candidate::new("b", "2"),
                Candidate::new("c", "3"),
                Candidate::new("d", "4"),
            ])
            .await;

        assert_eq!(results[0].as_ref().unwrap(), &Verdict::accepted("1"));
        assert!(matches!(results[1], Err(AppError::Parse { .. })));
        assert!(matches!(results[2], Err(AppError::Task { .. })));
        assert_eq!(results[3].as_ref().unwrap(), &Verdict::accepted("4"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let transport = Arc::new(StubTransport::new());
        let site = Arc::new(StubSite::new("stub"));
        assert!(pool(&transport, &site, 4).run(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_every_rule_yields_rejected_verdict() {
        let transport = Arc::new(StubTransport::new());
        let site = Arc::new(StubSite::new("stub"));
        transport.route(&site.detail_url("1"), "Sous-location meublée");
        transport.route(&site.detail_url("2"), "Avec ascenseur");
        transport.route(&site.detail_url("3"), "Au 5e étage");
        transport.route(&site.detail_url("4"), "Pas de frais d'agence");

        let results = pool(&transport, &site, 4)
            .run(vec![
                Candidate::new("Studio", "1"),
                Candidate::new("Studio", "2"),
                Candidate::new("Studio", "3"),
                Candidate::new("Studio", "4"),
            ])
            .await;

        let verdicts: Vec<Verdict> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::rejected("1"),
                Verdict::rejected("2"),
                Verdict::rejected("3"),
                Verdict::accepted("4"),
            ]
        );
    }
}
