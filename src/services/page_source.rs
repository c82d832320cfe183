use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {waited:?} waiting for '{selector}'")]
    Timeout { waited: Duration, selector: String },

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Produces the markup of a page once its content is ready to be read.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches a page over HTTP and re-polls until `ready_selector` matches.
///
/// The whole wait, every attempt included, is capped at `page_timeout`.
pub struct HttpPageSource {
    client: Client,
    ready_selector: String,
    ready: Selector,
    page_timeout: Duration,
    poll_interval: Duration,
}

impl HttpPageSource {
    pub fn new(
        ready_selector: &str,
        request_timeout: Duration,
        page_timeout: Duration,
        poll_interval: Duration,
    ) -> anyhow::Result<Self> {
        let ready = Selector::parse(ready_selector)
            .map_err(|e| anyhow::anyhow!("Invalid readiness selector '{}': {}", ready_selector, e))?;

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            ready_selector: ready_selector.to_string(),
            ready,
            page_timeout,
            poll_interval,
        })
    }

    async fn poll_until_ready(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|source| FetchError::Navigation {
                    url: url.to_string(),
                    source,
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.text().await.map_err(|source| FetchError::Navigation {
                url: url.to_string(),
                source,
            })?;

            if markup_ready(&body, &self.ready) {
                tracing::debug!("Page ready after {} attempt(s), {} bytes", attempt, body.len());
                return Ok(body);
            }

            tracing::debug!(
                "'{}' not present yet (attempt {}), retrying in {:?}",
                self.ready_selector,
                attempt,
                self.poll_interval
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError> {
        tracing::info!("Navigating to {}…", url);
        match tokio::time::timeout(self.page_timeout, self.poll_until_ready(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                waited: self.page_timeout,
                selector: self.ready_selector.clone(),
            }),
        }
    }
}

/// True when `selector` matches at least one element of `html`.
pub fn markup_ready(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}
