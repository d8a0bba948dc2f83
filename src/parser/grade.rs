//! Grade labels: turning filenames and captions into canonical level names
//! ("Kinder", "3° Básico", "IV° Medio") and ranking them in school order.

use std::sync::LazyLock;

use regex::Regex;

use super::classify::filename_from_url;
use super::text::collapse_ws;

static PDF_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.pdf\s*$").unwrap());
static PREKINDER_KINDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)pre[\s_-]*k[ií]nder[\s_-]*(?:y[\s_-]+)?k[ií]nder").unwrap()
});
static PREKINDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)pre[\s_-]*k[ií]nder").unwrap());
static KINDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)k[ií]nder").unwrap());
static BASICO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})\s*[°ºo]?[\s_.-]*b[aá]sico").unwrap());
static MEDIO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})\s*[°ºo]?[\s_.-]*medio").unwrap());
static ROMAN_MEDIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(iv|iii|ii|i)\s*[°º]?[\s_.-]*medio").unwrap()
});

pub const PREKINDER_KINDER_LABEL: &str = "Prekinder - Kinder";
const PREKINDER_LABEL: &str = "Prekinder";
const KINDER_LABEL: &str = "Kinder";

/// Items the ranking can't place sort after every recognised grade.
pub const FALLBACK_RANK: usize = 100;
const ELEMENTARY_GRADES: u32 = 8;
const SECONDARY_GRADES: u32 = 4;

/// Drop query noise and a trailing `.pdf` from a filename-like string.
pub fn clean_filename(name: &str) -> String {
    let name = name.split('?').next().unwrap_or("");
    PDF_SUFFIX_RE.replace(name, "").trim().to_string()
}

/// Canonical grade label, only when one of the grade patterns matches.
pub fn infer_grade(name: &str) -> Option<String> {
    let text = clean_filename(name);

    if PREKINDER_KINDER_RE.is_match(&text) {
        return Some(PREKINDER_KINDER_LABEL.to_string());
    }
    if PREKINDER_RE.is_match(&text) {
        return Some(PREKINDER_LABEL.to_string());
    }
    if KINDER_RE.is_match(&text) {
        return Some(KINDER_LABEL.to_string());
    }
    if let Some(n) = capture_number(&BASICO_RE, &text) {
        return Some(format!("{}° Básico", n));
    }
    if let Some(n) = capture_number(&MEDIO_RE, &text) {
        return Some(format!("{}° Medio", n));
    }
    if let Some(caps) = ROMAN_MEDIO_RE.captures(&text) {
        return Some(format!("{}° Medio", caps[1].to_uppercase()));
    }
    None
}

/// Label for a filename: a grade when one is recognisable, else the
/// filename itself with separators turned into spaces. `None` when nothing
/// readable is left.
pub fn infer_label(name: &str) -> Option<String> {
    if let Some(grade) = infer_grade(name) {
        return Some(grade);
    }
    let spaced = clean_filename(name).replace(['_', '-'], " ");
    let spaced = collapse_ws(&spaced);
    if spaced.is_empty() {
        None
    } else {
        Some(spaced)
    }
}

/// Ordering key in the canonical sequence: 0 for Prekinder/Kinder, 1-8 for
/// Básico, 9-12 for Medio, `FALLBACK_RANK + index` otherwise. The label is
/// consulted first, then the filename in the href.
pub fn sort_key(label: &str, href: &str, index: usize) -> usize {
    grade_rank(label)
        .or_else(|| grade_rank(&filename_from_url(href)))
        .map(|r| r as usize)
        .unwrap_or(FALLBACK_RANK + index)
}

fn grade_rank(text: &str) -> Option<u32> {
    let medio = capture_number(&MEDIO_RE, text).or_else(|| roman_medio(text));

    if KINDER_RE.is_match(text) && medio.is_none() {
        return Some(0);
    }
    if let Some(n) = capture_number(&BASICO_RE, text) {
        if (1..=ELEMENTARY_GRADES).contains(&n) {
            return Some(n);
        }
    }
    match medio {
        Some(n) if (1..=SECONDARY_GRADES).contains(&n) => Some(ELEMENTARY_GRADES + n),
        _ => None,
    }
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn roman_medio(text: &str) -> Option<u32> {
    let caps = ROMAN_MEDIO_RE.captures(text)?;
    match caps[1].to_lowercase().as_str() {
        "i" => Some(1),
        "ii" => Some(2),
        "iii" => Some(3),
        "iv" => Some(4),
        _ => None,
    }
}
