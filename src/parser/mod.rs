pub mod anchors;
pub mod classify;
pub mod drive;
pub mod grade;
pub mod text;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;
use url::Url;

use crate::api::ScrapedLink;
use classify::{filename_from_url, is_cloud_url, resolve};
use grade::{infer_label, sort_key};

static LOOSE_PDF_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']?([^"'\s>]*\.pdf[^"'\s>]*)"#).unwrap()
});

/// Links gathered in one extraction pass, unique by href. The "Archivo N"
/// placeholder numbers links in the order they were accepted.
pub(crate) struct Collected {
    seen: HashSet<String>,
    links: Vec<ScrapedLink>,
}

impl Collected {
    pub(crate) fn new() -> Self {
        Collected {
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, href: &str) -> bool {
        self.seen.contains(href)
    }

    pub(crate) fn placeholder(&self) -> String {
        format!("Archivo {}", self.links.len() + 1)
    }

    pub(crate) fn push(&mut self, label: String, href: String) {
        if self.seen.insert(href.clone()) {
            self.links.push(ScrapedLink::new(label, href));
        }
    }

    pub(crate) fn into_links(self) -> Vec<ScrapedLink> {
        self.links
    }
}

/// Page HTML → labelled document links in grade order.
///
/// Drive pages go through the drive extractor (falling back to the page URL
/// itself when it is a single shared file); anything else through the
/// generic anchor extractor. If that finds nothing, every href mentioning
/// `.pdf` is taken. Weak labels get a second look from the filename before
/// the final sort.
///
/// `source` is the URL the caller asked for and decides the page kind;
/// `base` is where the fetch ended up after redirects and only anchors
/// relative hrefs.
pub fn discover(source: &Url, base: &Url, html: &str) -> Vec<ScrapedLink> {
    let mut links = if is_cloud_url(source.as_str()) {
        let mut links = drive::extract_page(html, base);
        if links.is_empty() {
            links.extend(drive::single_file(source.as_str(), html));
        }
        links
    } else {
        anchors::extract(html, base)
    };

    if links.is_empty() {
        links = loose_pdf_hrefs(html, base);
        if !links.is_empty() {
            info!("Fallback scan found {} .pdf hrefs on {}", links.len(), base);
        }
    }

    relabel_weak(&mut links);
    sort_by_grade(&mut links);
    links
}

fn loose_pdf_hrefs(html: &str, base: &Url) -> Vec<ScrapedLink> {
    let mut out = Collected::new();
    for caps in LOOSE_PDF_HREF_RE.captures_iter(html) {
        let raw = text::decode_entities(&caps[1]);
        let Some(absolute) = resolve(base, &raw) else {
            continue;
        };
        let href = drive::download_url(&absolute);
        if out.contains(&href) {
            continue;
        }
        let label = if is_cloud_url(&absolute) {
            out.placeholder()
        } else {
            infer_label(&filename_from_url(&absolute))
                .unwrap_or_else(|| anchors::LAST_RESORT_LABEL.to_string())
        };
        out.push(label, href);
    }
    out.into_links()
}

fn relabel_weak(links: &mut [ScrapedLink]) {
    for link in links.iter_mut() {
        if link.label != anchors::LAST_RESORT_LABEL && link.label.chars().count() >= 2 {
            continue;
        }
        if let Some(label) = infer_label(&filename_from_url(&link.href)) {
            link.set_label(label);
        }
    }
}

/// Stable sort on the grade key; unranked links keep discovery order.
fn sort_by_grade(links: &mut Vec<ScrapedLink>) {
    let mut keyed: Vec<(usize, ScrapedLink)> = links
        .drain(..)
        .enumerate()
        .map(|(i, link)| (sort_key(&link.label, &link.href, i), link))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    links.extend(keyed.into_iter().map(|(_, link)| link));
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn run(url: &str, html: &str) -> Vec<ScrapedLink> {
        let url = Url::parse(url).unwrap();
        discover(&url, &url, html)
    }

    fn assert_invariants(links: &[ScrapedLink]) {
        let hrefs: HashSet<&str> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs.len(), links.len(), "duplicate hrefs");
        assert!(links.iter().all(|l| l.href.starts_with("http")));
        assert!(links.iter().all(|l| l.label == l.course_name));
        let keys: Vec<usize> = links
            .iter()
            .enumerate()
            .map(|(i, l)| sort_key(&l.label, &l.href, i))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", keys);
    }

    #[test]
    fn school_page_sorted_by_grade() {
        let links = run("https://www.colegiosanjose.cl/utiles-2025/", &fixture("school_page"));
        assert_invariants(&links);
        let labels: Vec<&str> = links.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Prekinder - Kinder",
                "1° Básico",
                "2° Básico",
                "3° Básico",
                "I° Medio",
                "IV° Medio",
                "anexo-varios.pdf",
                "Archivo 8",
            ]
        );
        assert_eq!(
            links[1].href,
            "https://www.colegiosanjose.cl/wp-content/uploads/2025/01/lista-1-basico.pdf"
        );
        assert_eq!(links[2].href, "https://drive.google.com/uc?export=download&id=2ndBasicoId");
    }

    #[test]
    fn annex_near_a_heading_takes_the_heading() {
        // without the banner the "Enseñanza Media" heading falls inside the
        // context window of the annex link and names it
        let html = fixture("school_page");
        let start = html.find("<img class=\"banner\"").unwrap();
        let end = start + html[start..].find('>').unwrap() + 1;
        let html = format!("{}{}", &html[..start], &html[end..]);

        let links = run("https://www.colegiosanjose.cl/utiles-2025/", &html);
        assert_invariants(&links);
        let annex = links
            .iter()
            .find(|l| l.href.ends_with("/anexo-varios.pdf"))
            .unwrap();
        assert_eq!(annex.label, "Enseñanza Media");
    }

    #[test]
    fn drive_folder_labels_from_captions() {
        let links = run("https://drive.google.com/drive/folders/1FolderId", &fixture("drive_folder"));
        assert_invariants(&links);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].label, "Lista Kinder 2025");
        assert_eq!(links[1].label, "Lista 3° Básico");
        assert_eq!(links[1].href, "https://drive.google.com/uc?export=download&id=XYZ");
        assert_eq!(links[2].label, "Archivo 2");
    }

    #[test]
    fn drive_page_with_id_only_in_script() {
        let links = run("https://drive.google.com/drive/folders/1FolderId", &fixture("drive_script"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Archivo 1");
        assert_eq!(
            links[0].href,
            "https://drive.google.com/uc?export=download&id=1AbCdEfGhIjKlMnOp"
        );
    }

    #[test]
    fn single_shared_file() {
        let html = "<html><head><title>Lista IV medio.pdf - Google Drive</title></head><body></body></html>";
        let links = run("https://drive.google.com/file/d/FileOnly123/view?usp=sharing", html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "IV° Medio");
        assert_eq!(links[0].href, "https://drive.google.com/uc?export=download&id=FileOnly123");
    }

    #[test]
    fn page_kind_follows_requested_url_not_redirect() {
        let html = "<html><head><title>Google Drive: Sign-in</title></head><body><form action=\"/signin\"></form></body></html>";
        let source = Url::parse("https://drive.google.com/file/d/FileOnly123/view").unwrap();
        let landed = Url::parse(
            "https://accounts.google.com/ServiceLogin?continue=https://drive.google.com/file/d/FileOnly123/view",
        )
        .unwrap();
        let links = discover(&source, &landed, html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Archivo 1");
        assert_eq!(links[0].href, "https://drive.google.com/uc?export=download&id=FileOnly123");
    }

    #[test]
    fn relative_hrefs_resolve_against_redirect_target() {
        let html = r#"<a href="lista-2-basico.pdf">2</a>"#;
        let source = Url::parse("http://colegio.cl/utiles").unwrap();
        let landed = Url::parse("https://www.colegio.cl/utiles/2025/").unwrap();
        let links = discover(&source, &landed, html);
        assert_eq!(links[0].href, "https://www.colegio.cl/utiles/2025/lista-2-basico.pdf");
    }

    #[test]
    fn empty_page_is_not_an_error() {
        let links = run("https://colegio.cl/", "<html><body><p>Sin listas aún</p></body></html>");
        assert!(links.is_empty());
    }

    #[test]
    fn loose_pdf_fallback() {
        // the classifier rejects ".pdf-" but the loose scan takes it
        let html = r#"<a href="/bajar/lista-7-basico.pdf-final">x</a><link href="/x/kinder.pdf.old">"#;
        let links = run("https://colegio.cl/utiles/", html);
        assert_invariants(&links);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "https://colegio.cl/x/kinder.pdf.old");
        assert_eq!(links[1].href, "https://colegio.cl/bajar/lista-7-basico.pdf-final");
    }

    #[test]
    fn weak_labels_are_reinferred() {
        let mut links = vec![
            ScrapedLink::new("PDF".into(), "https://colegio.cl/a/lista-2-medio.pdf".into()),
            ScrapedLink::new("x".into(), "https://colegio.cl/a/kinder.pdf".into()),
            ScrapedLink::new("PDF".into(), "https://colegio.cl/a/".into()),
        ];
        relabel_weak(&mut links);
        assert_eq!(links[0].label, "2° Medio");
        assert_eq!(links[0].course_name, "2° Medio");
        assert_eq!(links[1].label, "Kinder");
        assert_eq!(links[2].label, "PDF");
    }

    #[test]
    fn deterministic() {
        let html = fixture("school_page");
        let a = run("https://www.colegiosanjose.cl/utiles-2025/", &html);
        let b = run("https://www.colegiosanjose.cl/utiles-2025/", &html);
        assert_eq!(a, b);
    }
}
