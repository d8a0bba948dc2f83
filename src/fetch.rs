use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::{info, warn};
use url::Url;

use crate::api::ScrapeError;
use crate::parser::classify::is_cloud_url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_ES: &str = "es-CL,es;q=0.9,en;q=0.8";
const PAGE_TIMEOUT_SECS: u64 = 20;
const CLOUD_TIMEOUT_SECS: u64 = 25;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub page_timeout: Duration,
    pub cloud_timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            page_timeout: Duration::from_secs(PAGE_TIMEOUT_SECS),
            cloud_timeout: Duration::from_secs(CLOUD_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            accept_language: ACCEPT_LANGUAGE_ES.to_string(),
        }
    }
}

impl FetchConfig {
    /// Drive pages are slower to render, so they get the longer budget.
    pub fn timeout_for(&self, url: &Url) -> Duration {
        if is_cloud_url(url.as_str()) {
            self.cloud_timeout
        } else {
            self.page_timeout
        }
    }
}

/// A fetched page. `final_url` is where redirects ended, which is what
/// relative hrefs resolve against.
pub struct FetchedPage {
    pub final_url: Url,
    pub html: String,
}

/// One GET, no retries: non-2xx, timeouts and transport errors all come back
/// as errors for the caller to report.
pub async fn fetch_page(url: &Url, config: &FetchConfig) -> Result<FetchedPage, ScrapeError> {
    let client = build_client(config)?;
    let timeout = config.timeout_for(url);

    info!("Fetching {} (timeout {}s)", url, timeout.as_secs());
    let start = Instant::now();
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        warn!("{} answered {}", url, status);
        return Err(ScrapeError::Upstream(status.as_u16()));
    }

    let final_url = response.url().clone();
    let html = response.text().await.map_err(request_error)?;
    info!(
        "Fetched {} bytes from {} in {}ms",
        html.len(),
        final_url,
        start.elapsed().as_millis()
    );

    Ok(FetchedPage { final_url, html })
}

fn build_client(config: &FetchConfig) -> Result<reqwest::Client, ScrapeError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| ScrapeError::Internal(format!("bad Accept-Language: {}", e)))?,
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .build()
        .map_err(|e| ScrapeError::Internal(e.to_string()))
}

fn request_error(e: reqwest::Error) -> ScrapeError {
    let kind = if e.is_timeout() {
        "Timeout"
    } else if e.is_connect() {
        "Connection failed"
    } else {
        "Request failed"
    };
    ScrapeError::Fetch(format!("{}: {}", kind, e))
}
