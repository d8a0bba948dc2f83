use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::classify::{filename_from_url, is_cloud_url, is_document_link, resolve};
use super::drive::{download_url, is_generic_caption};
use super::grade::infer_grade;
use super::text::{decode_entities, strip_html};
use super::Collected;
use crate::api::ScrapedLink;

static ANCHOR_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))[^>]*>"#).unwrap()
});
static ANCHOR_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</a\s*>").unwrap());
static TEXT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">([^<]+)<").unwrap());
static GRADE_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)pre[\s-]*k[ií]nder|k[ií]nder|playgroup|\d+\s*[°º]?\s*b[aá]sicos?|\d+\s*[°º]?\s*medios?|ense[ñn]anza\s+media|(?:^|[^a-z])(?:iv|iii|ii|i)\s*[°º]?\s*medios?",
    )
    .unwrap()
});
static NON_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d\W_]+$").unwrap());
static URL_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:https?://|www\.)").unwrap());

/// How far back (in chars) to look for a heading that names a link.
const CONTEXT_WINDOW: usize = 800;
const MIN_CAPTION: usize = 3;
const MAX_CAPTION: usize = 70;
pub const LAST_RESORT_LABEL: &str = "PDF";

/// Document links on an arbitrary school page, in document order.
pub fn extract(html: &str, base: &Url) -> Vec<ScrapedLink> {
    let mut out = Collected::new();

    for caps in ANCHOR_OPEN_RE.captures_iter(html) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default();
        if !is_document_link(&raw) {
            continue;
        }
        let Some(absolute) = resolve(base, &raw) else {
            continue;
        };
        let href = download_url(&absolute);
        if out.contains(&href) {
            continue;
        }

        let label = if is_cloud_url(&absolute) {
            let caption = anchor_caption(html, tag.end());
            if is_generic_caption(&caption) {
                out.placeholder()
            } else {
                caption
            }
        } else {
            file_label(html, tag.start(), &absolute)
        };

        debug!("Link {} -> {:?}", href, label);
        out.push(label, href);
    }

    out.into_links()
}

/// Visible text between an anchor's open tag and the next `</a>`.
fn anchor_caption(html: &str, open_end: usize) -> String {
    let rest = html.get(open_end..).unwrap_or("");
    ANCHOR_CLOSE_RE
        .find(rest)
        .map(|close| strip_html(&rest[..close.start()]))
        .unwrap_or_default()
}

fn file_label(html: &str, anchor_start: usize, href: &str) -> String {
    let filename = filename_from_url(href);
    if let Some(grade) = infer_grade(&filename) {
        return grade;
    }

    let blocks = text_blocks(preceding_window(html, anchor_start));

    // Closest heading wins, so scan from the link backwards.
    if let Some(label) = blocks.iter().rev().find_map(|b| grade_context(b)) {
        return label;
    }
    if let Some(label) = blocks.iter().rev().find(|b| is_short_caption(b)) {
        return label.clone();
    }
    if filename.trim().is_empty() {
        LAST_RESORT_LABEL.to_string()
    } else {
        filename
    }
}

/// The last `CONTEXT_WINDOW` chars before `pos`.
fn preceding_window(html: &str, pos: usize) -> &str {
    let head = html.get(..pos).unwrap_or(html);
    let from = head
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &head[from..]
}

fn text_blocks(window: &str) -> Vec<String> {
    TEXT_BLOCK_RE
        .captures_iter(window)
        .map(|caps| strip_html(&caps[1]))
        .filter(|t| !t.is_empty())
        .collect()
}

fn grade_context(block: &str) -> Option<String> {
    let m = GRADE_CONTEXT_RE.find(block)?;
    if block.chars().count() <= MAX_CAPTION {
        Some(block.to_string())
    } else {
        let matched = m.as_str().trim_start_matches(|c: char| !c.is_alphanumeric());
        Some(matched.trim().to_string())
    }
}

fn is_short_caption(block: &str) -> bool {
    let len = block.chars().count();
    (MIN_CAPTION..=MAX_CAPTION).contains(&len)
        && !NON_TEXT_RE.is_match(block)
        && !URL_LIKE_RE.is_match(block)
}
