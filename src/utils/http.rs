// src/utils/http.rs

//! HTTP fetch primitive.
//!
//! A [`Transport`] performs one GET attempt; [`HttpFetcher`] repeats the
//! attempt with a fixed pause until it gets a 2xx payload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue,
};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Result of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response body
    Payload(Vec<u8>),
    /// Connection error or non-success status; worth retrying
    Transient(String),
}

/// One GET attempt against a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> FetchOutcome;
}

/// `reqwest`-backed transport sending a fixed header set.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the configured headers and timeout.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, ACCEPT, &config.accept)?;
        insert_header(&mut headers, ACCEPT_LANGUAGE, &config.accept_language)?;
        insert_header(&mut headers, ACCEPT_ENCODING, &config.accept_encoding)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid {name} header {value:?}: {e}")))?;
    headers.insert(name, value);
    Ok(())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Transient(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::Transient(format!("HTTP status {status}"));
        }

        match response.bytes().await {
            Ok(body) => FetchOutcome::Payload(body.to_vec()),
            Err(e) => FetchOutcome::Transient(e.to_string()),
        }
    }
}

/// Retrying fetcher.
///
/// `fetch` never fails: it either returns a payload or keeps retrying
/// forever with a constant delay and no attempt limit.
#[derive(Clone)]
pub struct HttpFetcher {
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(transport: Arc<dyn Transport>, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
        }
    }

    /// Build a fetcher over a `reqwest` transport.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(
            Arc::new(transport),
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    /// GET `url`, retrying until a 2xx payload arrives.
    pub async fn fetch(&self, url: &str) -> Vec<u8> {
        loop {
            match self.transport.get(url).await {
                FetchOutcome::Payload(body) => return body,
                FetchOutcome::Transient(reason) => {
                    log::warn!(
                        "Request failed for {}: {} (retrying in {:?})",
                        url,
                        reason,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
