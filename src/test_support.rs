//! Stubs shared by unit tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Candidate, ListingPage};
use crate::services::Notifier;
use crate::sites::SiteAdapter;
use crate::utils::http::{FetchOutcome, Transport};
use crate::utils::normalize_whitespace;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct StubState {
    routes: HashMap<String, Vec<u8>>,
    failures: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    hits: HashMap<String, usize>,
    requests: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Transport serving canned bodies. Unknown URLs answer with an empty body.
#[derive(Default)]
pub(crate) struct StubTransport {
    state: Mutex<StubState>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, body: impl Into<Vec<u8>>) {
        lock(&self.state).routes.insert(url.to_string(), body.into());
    }

    /// The next `times` requests to `url` fail transiently.
    pub fn fail_first(&self, url: &str, times: usize) {
        lock(&self.state).failures.insert(url.to_string(), times);
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        lock(&self.state).delays.insert(url.to_string(), delay);
    }

    pub fn hits(&self, url: &str) -> usize {
        lock(&self.state).hits.get(url).copied().unwrap_or(0)
    }

    /// Every requested URL, in request order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> FetchOutcome {
        let delay = {
            let mut state = lock(&self.state);
            state.requests.push(url.to_string());
            *state.hits.entry(url.to_string()).or_default() += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.delays.get(url).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        state.in_flight -= 1;
        if let Some(remaining) = state.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return FetchOutcome::Transient("stub failure".to_string());
            }
        }
        FetchOutcome::Payload(state.routes.get(url).cloned().unwrap_or_default())
    }
}

/// Adapter over a line-based fake markup.
///
/// Search pages hold one `id|title` per line and a `LAST` line on the last
/// page; detail pages are plain text.
pub(crate) struct StubSite {
    name: String,
}

impl StubSite {
    /// Detail body without a description container.
    pub const MISSING: &'static str = "MISSING";
    /// Detail body that makes the parser panic.
    pub const PANIC: &'static str = "PANIC";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn listing(entries: &[(&str, &str)], last: bool) -> String {
        let mut body: Vec<String> = entries
            .iter()
            .map(|(id, title)| format!("{id}|{title}"))
            .collect();
        if last {
            body.push("LAST".to_string());
        }
        body.join("\n")
    }
}

impl SiteAdapter for StubSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, page: u32) -> String {
        format!("stub://{}/search/{}", self.name, page)
    }

    fn parse_listing_page(&self, body: &[u8], _page: u32) -> Result<ListingPage> {
        let text = String::from_utf8_lossy(body);
        let mut page = ListingPage::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "LAST" {
                page.is_last_page = true;
            } else if let Some((id, title)) = line.split_once('|') {
                page.candidates.push(Candidate::new(title, id));
            }
        }
        Ok(page)
    }

    fn detail_url(&self, id: &str) -> String {
        format!("stub://{}/offer/{}", self.name, id)
    }

    fn parse_detail_page(&self, body: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(body);
        match text.as_ref() {
            Self::MISSING => Err(AppError::parse(&self.name, "description container not found")),
            Self::PANIC => panic!("stub detail parser panicked"),
            other => Ok(normalize_whitespace(other)),
        }
    }
}

/// Notifier remembering every call.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, site: &str, id: &str, url: &str) -> Result<()> {
        lock(&self.calls).push((site.to_string(), id.to_string(), url.to_string()));
        Ok(())
    }
}
