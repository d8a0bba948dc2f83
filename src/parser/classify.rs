use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static PDF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.pdf(?:[?#]|$)").unwrap());
static DRIVE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)drive\.google\.com/(?:file/d/|open\?|uc\?)|[?&]export=download").unwrap()
});
static CLOUD_DOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)docs\.google\.com/(?:document|spreadsheets)/").unwrap());
static PDF_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)/pdf/").unwrap());
static CLOUD_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*https?://(?:drive|docs)\.google\.com(?:[:/?#]|$)").unwrap()
});

/// Whether an href, as written in the markup, points at a downloadable
/// document: a PDF, a shared cloud file, or a cloud document.
pub fn is_document_link(href: &str) -> bool {
    PDF_RE.is_match(href)
        || DRIVE_FILE_RE.is_match(href)
        || CLOUD_DOC_RE.is_match(href)
        || PDF_SEGMENT_RE.is_match(href)
}

/// Cloud-drive or cloud-document host, decided from the URL text alone.
pub fn is_cloud_url(url: &str) -> bool {
    CLOUD_HOST_RE.is_match(url)
}

/// Absolute http(s) form of `href` relative to `base`. Anything that does not
/// resolve to http(s) (`mailto:`, `javascript:`, garbage) is dropped.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    let joined = base.join(href.trim()).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

/// Last path segment of an absolute or relative URL, percent-decoded.
/// Empty when the path ends in `/`.
pub fn filename_from_url(href: &str) -> String {
    let segment = match Url::parse(href) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_string(),
        Err(_) => {
            let path = href.split(['?', '#']).next().unwrap_or("");
            path.rsplit('/').next().unwrap_or("").to_string()
        }
    };
    match urlencoding::decode(&segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment,
    }
}
