//! The caller-facing operation: URL in, labelled document links out, always
//! as a structured envelope.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::fetch::{self, FetchConfig};
use crate::parser;

/// One discovered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedLink {
    pub label: String,
    pub href: String,
    pub course_name: String,
}

impl ScrapedLink {
    pub fn new(label: String, href: String) -> Self {
        ScrapedLink {
            course_name: label.clone(),
            label,
            href,
        }
    }

    pub fn set_label(&mut self, label: String) {
        self.course_name = label.clone();
        self.label = label;
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("upstream responded with status {0}")]
    Upstream(u16),
    #[error("{0}")]
    Fetch(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    /// HTTP-style status a web wrapper would answer with.
    pub fn status(&self) -> u16 {
        match self {
            ScrapeError::InvalidUrl(_) => 400,
            ScrapeError::Upstream(_) => 502,
            ScrapeError::Fetch(_) | ScrapeError::Internal(_) => 500,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapeSuccess {
    pub success: bool,
    pub links: Vec<ScrapedLink>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ScrapeFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip)]
    pub status: u16,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Success(ScrapeSuccess),
    Failure(ScrapeFailure),
}

impl ScrapeResponse {
    pub fn ok(links: Vec<ScrapedLink>) -> Self {
        ScrapeResponse::Success(ScrapeSuccess {
            success: true,
            count: links.len(),
            links,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeResponse::Success(_))
    }

    pub fn status(&self) -> u16 {
        match self {
            ScrapeResponse::Success(_) => 200,
            ScrapeResponse::Failure(f) => f.status,
        }
    }
}

impl From<ScrapeError> for ScrapeResponse {
    fn from(e: ScrapeError) -> Self {
        ScrapeResponse::Failure(ScrapeFailure {
            success: false,
            status: e.status(),
            error: e.to_string(),
        })
    }
}

/// Reject anything that is not an absolute http(s) URL before any fetch.
pub fn validate_url(raw: &str) -> Result<Url, ScrapeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScrapeError::InvalidUrl("Missing url parameter".into()));
    }
    if !raw.to_ascii_lowercase().starts_with("http") {
        return Err(ScrapeError::InvalidUrl("URL must start with http".into()));
    }
    let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl(format!("Invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ScrapeError::InvalidUrl("URL must be absolute http(s)".into()));
    }
    Ok(url)
}

/// Fetch `url` and discover its supply-list documents.
pub async fn scrape(url: &str, config: &FetchConfig) -> ScrapeResponse {
    match try_scrape(url, config).await {
        Ok(links) => ScrapeResponse::ok(links),
        Err(e) => {
            warn!("Scrape of {} failed: {}", url, e);
            e.into()
        }
    }
}

async fn try_scrape(url: &str, config: &FetchConfig) -> Result<Vec<ScrapedLink>, ScrapeError> {
    let url = validate_url(url)?;
    let page = fetch::fetch_page(&url, config).await?;

    // Heuristics run off the async runtime; a panic in one comes back as a
    // JoinError instead of taking the caller down.
    let source = url.clone();
    let links =
        tokio::task::spawn_blocking(move || parser::discover(&source, &page.final_url, &page.html))
            .await
            .map_err(|e| ScrapeError::Internal(e.to_string()))?;

    info!("Found {} documents on {}", links.len(), url);
    Ok(links)
}
