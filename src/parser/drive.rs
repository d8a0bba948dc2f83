//! Cloud-drive share links. A share URL is rewritten into its direct-download
//! form, and on drive pages the anchor caption, not the URL, names the file.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::classify::{filename_from_url, is_cloud_url, resolve};
use super::grade::infer_label;
use super::text::{decode_entities, strip_html};
use super::Collected;
use crate::api::ScrapedLink;

static FILE_PATH_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").unwrap());
static QUERY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").unwrap());
static FILE_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<a\b[^>]*?\shref\s*=\s*["']([^"']*drive\.google\.com/(?:file/d/|open\?|uc\?)[^"']*)["'][^>]*>(.*?)</a\s*>"#,
    )
    .unwrap()
});
// Ids outside anchors: script payloads (possibly with escaped slashes),
// query strings, and the data-id attribute of folder listing rows.
static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:file\\?/d\\?/|[?&;]id=|data-id=["'])([A-Za-z0-9_-]{10,})"#).unwrap()
});
static PDF_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']*\.pdf(?:[?#][^"']*)?)["']"#).unwrap()
});
static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property\s*=\s*["']og:title["'][^>]+content\s*=\s*["']([^"']*)["']"#)
        .unwrap()
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());

const GENERIC_CAPTIONS: &[&str] = &["view", "ver", "abrir", "see"];
const TITLE_SUFFIXES: &[&str] = &[" - Google Drive", " - Google Docs"];
const DOWNLOAD_BASE: &str = "https://drive.google.com/uc?export=download&id=";

/// Anchor captions that say nothing about the linked document.
pub fn is_generic_caption(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() < 2 || GENERIC_CAPTIONS.contains(&text.to_lowercase().as_str())
}

/// File id embedded in a drive share URL (`/file/d/<id>/` or `?id=<id>`).
pub fn file_id(url: &str) -> Option<&str> {
    if !is_cloud_url(url) {
        return None;
    }
    FILE_PATH_ID_RE
        .captures(url)
        .or_else(|| QUERY_ID_RE.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Direct-download form of a drive share URL; other URLs come back as-is.
pub fn download_url(url: &str) -> String {
    match file_id(url) {
        Some(id) => format!("{}{}", DOWNLOAD_BASE, id),
        None => url.to_string(),
    }
}

/// Links on a drive listing or share page. Tiers, first non-empty wins:
/// captioned file anchors, bare file ids anywhere in the page, `.pdf` hrefs.
pub fn extract_page(html: &str, base: &Url) -> Vec<ScrapedLink> {
    let tiers: [(&str, fn(&str, &Url) -> Vec<ScrapedLink>); 3] = [
        ("anchors", from_anchors),
        ("bare ids", from_bare_ids),
        ("pdf hrefs", from_pdf_hrefs),
    ];
    for (name, tier) in tiers {
        let links = tier(html, base);
        if !links.is_empty() {
            debug!("Drive page: {} links from {}", links.len(), name);
            return links;
        }
    }
    Vec::new()
}

fn from_anchors(html: &str, base: &Url) -> Vec<ScrapedLink> {
    let mut out = Collected::new();
    for caps in FILE_ANCHOR_RE.captures_iter(html) {
        let href = decode_entities(&caps[1]);
        let Some(absolute) = resolve(base, &href) else {
            continue;
        };
        let href = download_url(&absolute);
        if out.contains(&href) {
            continue;
        }
        let caption = strip_html(&caps[2]);
        let label = if is_generic_caption(&caption) {
            out.placeholder()
        } else {
            caption
        };
        out.push(label, href);
    }
    out.into_links()
}

fn from_bare_ids(html: &str, _base: &Url) -> Vec<ScrapedLink> {
    let mut out = Collected::new();
    for caps in BARE_ID_RE.captures_iter(html) {
        let href = format!("{}{}", DOWNLOAD_BASE, &caps[1]);
        if out.contains(&href) {
            continue;
        }
        let label = out.placeholder();
        out.push(label, href);
    }
    out.into_links()
}

fn from_pdf_hrefs(html: &str, base: &Url) -> Vec<ScrapedLink> {
    let mut out = Collected::new();
    for caps in PDF_HREF_RE.captures_iter(html) {
        let Some(absolute) = resolve(base, &decode_entities(&caps[1])) else {
            continue;
        };
        let href = download_url(&absolute);
        if out.contains(&href) {
            continue;
        }
        let label = if is_cloud_url(&absolute) {
            out.placeholder()
        } else {
            infer_label(&filename_from_url(&absolute)).unwrap_or_else(|| out.placeholder())
        };
        out.push(label, href);
    }
    out.into_links()
}

/// The page URL itself is a single shared file: one link, named after the
/// file's title when the page exposes it.
pub fn single_file(page_url: &str, html: &str) -> Option<ScrapedLink> {
    file_id(page_url)?;
    let label = page_title(html)
        .and_then(|title| infer_label(&title))
        .unwrap_or_else(|| "Archivo 1".to_string());
    Some(ScrapedLink::new(label, download_url(page_url)))
}

fn page_title(html: &str) -> Option<String> {
    if let Some(caps) = OG_TITLE_RE.captures(html) {
        let title = strip_html(&caps[1]);
        if !is_generic_caption(&title) {
            return Some(title);
        }
    }
    let title = strip_html(&TITLE_RE.captures(html)?[1]);
    TITLE_SUFFIXES
        .iter()
        .find_map(|suffix| title.strip_suffix(suffix))
        .map(|t| t.trim().to_string())
        .filter(|t| !is_generic_caption(t))
}
