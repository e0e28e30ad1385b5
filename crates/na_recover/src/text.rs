//! Markdown-to-HTML conversion and URL cleanup for salvaged content.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_MD_LINK: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    static ref RE_AUTHOR: Regex = Regex::new(r"Author:\s+([^\n]+)").unwrap();
    static ref RE_PUBLISHED: Regex = Regex::new(r"Published Date:\s+([^\n]+)").unwrap();
    static ref RE_SOURCE: Regex = Regex::new(r"Source URL:\s+").unwrap();
    static ref RE_PARAGRAPH: Regex = Regex::new(r"\n\n+").unwrap();
    static ref RE_BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref RE_ITALIC: Regex = Regex::new(r"\*([^\*]+?)\*").unwrap();
    static ref RE_BARE_URL: Regex = Regex::new(r#"https?://[^\s<>"']+"#).unwrap();
    static ref RE_ATTR_URL: Regex = Regex::new(r#"(href|src)=(['"])([^'"]+)(['"])"#).unwrap();
    static ref RE_IMAGE_PATH: Regex = Regex::new(r"(?:images|static)/.*$").unwrap();
}

/// Convert the basic markdown models produce into HTML: links, Author /
/// Published Date / Source URL labels, paragraphs, `#` headers, bold,
/// italic, and line breaks.
pub fn markdown_to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Links first so their brackets survive paragraph wrapping
    let mut text = RE_MD_LINK
        .replace_all(text, r#"<a href="${2}" target="_blank">${1}</a>"#)
        .into_owned();

    text = RE_AUTHOR.replace_all(&text, "<strong>Author:</strong> ${1}").into_owned();
    text = RE_PUBLISHED
        .replace_all(&text, "<strong>Published Date:</strong> ${1}")
        .into_owned();
    text = RE_SOURCE.replace_all(&text, "<strong>Source URL:</strong> ").into_owned();

    text = RE_PARAGRAPH.replace_all(&text, "</p>\n\n<p>").into_owned();
    if !text.starts_with("<p>") {
        text = format!("<p>{text}");
    }
    if !text.ends_with("</p>") {
        text.push_str("</p>");
    }

    // Deepest header level first so `##` is not eaten by `#`
    for level in (1..=6).rev() {
        let hashes = "#".repeat(level);
        let re = Regex::new(&format!(r"<p>{hashes}\s+(.+?)</p>")).expect("static header pattern");
        text = re
            .replace_all(&text, format!("<h{level}>${{1}}</h{level}>"))
            .into_owned();
    }

    text = RE_BOLD.replace_all(&text, "<strong>${1}</strong>").into_owned();
    text = RE_ITALIC.replace_all(&text, "<em>${1}</em>").into_owned();

    text.replace('\n', "<br>")
}

/// Wrap bare http(s) URLs in anchor tags.
///
/// Skips URLs that are already attribute values (preceded by a quote or `=`)
/// and URLs sitting inside an HTML tag (a `>` appears before the next `<`).
pub fn linkify(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for m in RE_BARE_URL.find_iter(text) {
        let start_char = text[..m.start()].chars().count();
        let preceded = start_char > 0 && matches!(chars[start_char - 1], '\'' | '"' | '=');
        let inside_tag = text[m.end()..]
            .find(|c| c == '<' || c == '>')
            .map(|i| text[m.end()..].as_bytes()[i] == b'>')
            .unwrap_or(false);

        out.push_str(&text[last_end..m.start()]);
        if preceded || inside_tag {
            out.push_str(m.as_str());
        } else {
            out.push_str(&format!(
                r#"<a href="{url}" target="_blank">{url}</a>"#,
                url = m.as_str()
            ));
        }
        last_end = m.end();
    }
    out.push_str(&text[last_end..]);
    out
}

/// Prefix scheme-less `href`/`src` attribute values with `https://`.
pub fn fix_relative_urls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for caps in RE_ATTR_URL.captures_iter(text) {
        let whole = caps.get(0).expect("match");
        let value = &caps[3];
        out.push_str(&text[last_end..whole.start()]);
        if value.starts_with("http://") || value.starts_with("https://") {
            out.push_str(whole.as_str());
        } else {
            out.push_str(&format!("{}={}https://{}{}", &caps[1], &caps[2], value, &caps[4]));
        }
        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);
    out
}

/// Remove invisible control characters, keeping newlines and tabs.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !matches!(c,
                '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
        })
        .collect()
}

/// Normalize a salvaged string field before storage: decode HTML entities
/// and scrub control characters.
pub fn sanitize_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    strip_control_chars(&decoded)
}

/// Reduce a full image path to the `images/...` relative form the web
/// layer serves from. Returns `None` when the path is already relative or
/// contains no recognizable segment.
pub fn normalize_image_path(path: &str) -> Option<String> {
    if path.starts_with("images/") {
        return None;
    }
    RE_IMAGE_PATH.find(path).map(|m| m.as_str().to_string())
}
