//! Pragmatic HTML text extraction for article pages.
//!
//! Site adapters only need the article title and the paragraph text of the
//! body container, so this stays a small scanner rather than a full parser:
//! find the element opened by a class marker, balance its tag depth to find
//! the end, then flatten paragraphs to text.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static P_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("paragraph regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Extract the inner HTML of the first `tag` element whose class attribute
/// contains `class_marker`. Tag depth is balanced so nested same-name tags
/// do not cut the section short.
pub fn section_by_class<'a>(html: &'a str, tag: &str, class_marker: &str) -> Option<&'a str> {
    let open_re = Regex::new(&format!(
        r#"(?is)<{tag}\b[^>]*class\s*=\s*["'][^"']*{}[^"']*["'][^>]*>"#,
        regex::escape(class_marker)
    ))
    .ok()?;
    let open = open_re.find(html)?;
    let body_start = open.end();

    let token_re = Regex::new(&format!(r"(?is)<(/?){tag}\b[^>]*>")).ok()?;
    let mut depth = 1usize;
    for token in token_re.find_iter(&html[body_start..]) {
        let closing = html[body_start..][token.start()..].starts_with("</");
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(&html[body_start..body_start + token.start()]);
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Decode the handful of entities that show up in article text.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Strip tags and collapse whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = decode_entities(&text);
    WS_RE.replace_all(text.trim(), " ").to_string()
}

/// Join the text of every `<p>` inside a block, one paragraph per line.
pub fn paragraphs_text(html: &str) -> String {
    P_RE.captures_iter(html)
        .map(|cap| strip_tags(cap.get(1).map_or("", |m| m.as_str())))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        r#"<html><body>"#,
        r#"<h1 class="title-KX2tCBZq">Fed &amp; markets</h1>"#,
        r#"<div class="body-KX2tCBZq">"#,
        r#"<div class="inner"><p>First <b>paragraph</b>.</p></div>"#,
        r#"<p>Second&nbsp;paragraph.</p>"#,
        r#"</div>"#,
        r#"<div class="other"><p>unrelated</p></div>"#,
        r#"</body></html>"#,
    );

    #[test]
    fn section_finds_class_marker() {
        let title = section_by_class(PAGE, "h1", "title-KX2tCBZq").unwrap();
        assert_eq!(strip_tags(title), "Fed & markets");
    }

    #[test]
    fn section_balances_nested_tags() {
        let body = section_by_class(PAGE, "div", "body-KX2tCBZq").unwrap();
        assert!(body.contains("First"));
        assert!(body.contains("Second"));
        assert!(!body.contains("unrelated"));
    }

    #[test]
    fn section_missing_marker_is_none() {
        assert!(section_by_class(PAGE, "div", "no-such-class").is_none());
    }

    #[test]
    fn paragraphs_join_with_newlines() {
        let body = section_by_class(PAGE, "div", "body-KX2tCBZq").unwrap();
        assert_eq!(paragraphs_text(body), "First paragraph .\nSecond paragraph.");
    }

    #[test]
    fn strip_tags_collapses_whitespace() {
        assert_eq!(strip_tags("  <span>a</span>\n\n<i>b</i> "), "a b");
    }
}
