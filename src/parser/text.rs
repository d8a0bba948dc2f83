use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Visible text of an HTML fragment: tags dropped, common entities decoded,
/// whitespace collapsed.
pub fn strip_html(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    collapse_ws(&decode_entities(&without_tags))
}

/// Decode the handful of entities that show up in link captions and hrefs.
/// `&amp;` goes last so `&amp;lt;` stays literal.
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses() {
        assert_eq!(
            strip_html("<span class=\"x\">Lista</span>\n\t <b>3° Básico</b> "),
            "Lista 3° Básico"
        );
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(strip_html("Útiles&nbsp;&amp;&nbsp;textos"), "Útiles & textos");
        assert_eq!(strip_html("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn empty_and_tag_only_input() {
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("<i class=\"icon\"></i>  <br/>"), "");
    }

    #[test]
    fn multiline_tags() {
        assert_eq!(strip_html("<a\n href=\"x\">Ver</a\n>"), "Ver");
    }
}
