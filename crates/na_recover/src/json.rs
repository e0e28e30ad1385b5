//! JSON repair and nested-field extraction.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

lazy_static! {
    // A backslash that does not start a valid JSON escape sequence.
    static ref RE_STRAY_BACKSLASH: Regex = Regex::new(r#"([^\\])\\([^\\"/bfnrtu])"#).unwrap();
    // A quote closing a string immediately followed by more value text,
    // i.e. an unescaped quote inside a string.
    static ref RE_INNER_QUOTE: Regex = Regex::new(r#"([^\\])"([^"]*[^\\])"([^:,\s\}\]])"#).unwrap();
    // Bare money tokens like $3M that models emit outside of strings.
    static ref RE_MONEY: Regex = Regex::new(r#"(\s)(\$\d+)([MBK])(\s)"#).unwrap();
    // Object keys missing their quotes.
    static ref RE_BARE_KEY: Regex = Regex::new(r#"([{,])\s*([a-zA-Z0-9_]+)\s*:"#).unwrap();
    // Candidate JSON objects embedded in prose.
    static ref RE_OBJECT_GREEDY: Regex = Regex::new(r#"(?s)\{.*\}"#).unwrap();
    static ref RE_OBJECT_FLAT: Regex = Regex::new(r#"\{[^{}]*\}"#).unwrap();
}

/// Parse a JSON string that may be slightly broken.
///
/// Repairs run least-invasive first, reparsing after each: strip control
/// characters and the BOM, quote bare keys, fix stray backslashes and bare
/// `$3M`-style money tokens, close unterminated strings, and finally escape
/// unescaped quotes inside strings. The quote-escaping pass can mangle
/// text that was fine, which is why it only runs once everything gentler
/// has failed. Returns `None` when nothing parses.
pub fn repair_json(input: &str) -> Option<Value> {
    if input.is_empty() {
        return None;
    }

    let cleaned = strip_controls_and_bom(input);
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Some(value);
    }

    let keyed = RE_BARE_KEY.replace_all(&cleaned, "${1}\"${2}\":").into_owned();
    if let Ok(value) = serde_json::from_str(&keyed) {
        return Some(value);
    }

    let mut fixed = RE_STRAY_BACKSLASH
        .replace_all(&keyed, r"${1}\\${2}")
        .into_owned();
    fixed = RE_MONEY
        .replace_all(&fixed, "${1}\"${2}${3}\"${4}")
        .into_owned();
    if let Ok(value) = serde_json::from_str(&fixed) {
        return Some(value);
    }

    let closed = close_unterminated_strings(&fixed);
    if let Ok(value) = serde_json::from_str(&closed) {
        return Some(value);
    }

    let quoted = RE_INNER_QUOTE
        .replace_all(&fixed, "${1}\"${2}\\\"${3}")
        .into_owned();
    match serde_json::from_str(&quoted) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to repair JSON: {}", e);
            None
        }
    }
}

fn strip_controls_and_bom(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            !matches!(c,
                '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}' | '\u{feff}')
        })
        .collect()
}

/// Close a string the model never terminated.
///
/// Walks the text tracking in-string state (toggled by unescaped quotes),
/// so quotes that open and close normally are left alone. When the walk
/// ends inside a string, a closing quote is inserted before the next
/// `,]}` after the opening quote, or appended at the end when there is
/// none. Balanced input comes back unchanged.
fn close_unterminated_strings(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut in_string = false;
    let mut open_at = 0usize;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                in_string = !in_string;
                if in_string {
                    open_at = i;
                }
            }
            _ => {}
        }
    }
    if !in_string {
        return s.to_string();
    }

    let insert_at = chars[open_at + 1..]
        .iter()
        .position(|&c| matches!(c, ',' | ']' | '}'))
        .map(|rel| open_at + 1 + rel)
        .unwrap_or(chars.len());
    let mut out = chars;
    out.insert(insert_at, '"');
    out.into_iter().collect()
}

/// Pull the first parsable JSON object out of free text.
///
/// Tries the widest `{...}` span first, then each flat object, longest
/// candidates before shorter ones. A candidate only counts when it contains
/// at least one of `expected` (via [`find_nested`]).
pub fn extract_json(text: &str, expected: &[&str]) -> Option<Value> {
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(m) = RE_OBJECT_GREEDY.find(text) {
        candidates.push(m.as_str());
    }
    for m in RE_OBJECT_FLAT.find_iter(text) {
        candidates.push(m.as_str());
    }
    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));

    for candidate in candidates {
        let parsed = repair_json(candidate)
            .or_else(|| serde_json::from_str(candidate).ok());
        if let Some(value) = parsed {
            if value.is_object()
                && expected.iter().any(|key| find_nested(&value, key).is_some())
            {
                debug!("Extracted embedded JSON object of {} bytes", candidate.len());
                return Some(value);
            }
        }
    }
    None
}

/// Depth-first search for a key anywhere in a JSON value.
///
/// Tries the key itself, then the alias variations models produce
/// (`article_*`, `image_*`, `social_media_*` prefixes, underscores removed
/// or swapped for dashes), then recurses into nested objects and arrays.
/// `serde_json` values are trees, so no cycle guard is needed.
pub fn find_nested<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                return Some(v);
            }
            let variations = [
                format!("article_{key}"),
                format!("image_{key}"),
                format!("social_media_{key}"),
                key.replace('_', ""),
                key.replace('_', "-"),
            ];
            for var in &variations {
                if let Some(v) = map.get(var.as_str()) {
                    return Some(v);
                }
            }
            map.values().find_map(|v| find_nested(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_nested(v, key)),
        _ => None,
    }
}

/// First hit per key, regardless of where in the structure it lives.
pub fn extract_fields(value: &Value, keys: &[&str]) -> HashMap<String, Value> {
    let mut found = HashMap::new();
    for key in keys {
        if let Some(v) = find_nested(value, key) {
            found.insert((*key).to_string(), v.clone());
        }
    }
    found
}

/// Last-resort extraction of quoted fields from raw text when no JSON
/// object parses at all.
pub fn regex_fields(raw: &str) -> HashMap<String, String> {
    lazy_static! {
        static ref PATTERNS: Vec<(&'static str, Regex)> = vec![
            ("title", Regex::new(r#""(?:article_)?title":\s*"([^"]+(?:\\.[^"]+)*)""#).unwrap()),
            ("summary", Regex::new(r#""(?:article_)?summary":\s*"([^"]+(?:\\.[^"]+)*)""#).unwrap()),
            ("linkedin_post", Regex::new(r#""linkedin_post":\s*"([^"]+(?:\\.[^"]+)*)""#).unwrap()),
            ("twitter_post", Regex::new(r#""twitter_post":\s*"([^"]+(?:\\.[^"]+)*)""#).unwrap()),
            ("image_path", Regex::new(r#""image_path":\s*"([^"]+)""#).unwrap()),
            ("image_relative_path", Regex::new(r#""image_relative_path":\s*"([^"]+)""#).unwrap()),
            ("image_prompt", Regex::new(r#""image_prompt":\s*"([^"]+(?:\\.[^"]+)*)""#).unwrap()),
            ("image_url", Regex::new(r#""image_url":\s*"([^"]+)""#).unwrap()),
        ];
    }

    let mut found = HashMap::new();
    for (field, pattern) in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(raw) {
            let value = caps[1].replace("\\\"", "\"").replace("\\\\", "\\");
            found.insert((*field).to_string(), value);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_valid_json_untouched() {
        let value = repair_json(r#"{"title": "Hello", "count": 3}"#).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn quotes_bare_keys() {
        let value = repair_json(r#"{title: "Hello", summary: "World"}"#).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["summary"], "World");
    }

    #[test]
    fn strips_control_characters_and_bom() {
        let input = "\u{feff}{\"title\": \"He\u{01}llo\"}";
        let value = repair_json(input).unwrap();
        assert_eq!(value["title"], "Hello");
    }

    #[test]
    fn quotes_money_tokens() {
        let value = repair_json("{\"raised\": $3M }").unwrap();
        assert_eq!(value["raised"], "$3M");
    }

    #[test]
    fn closes_an_unterminated_string() {
        let value = repair_json(r#"{"title": "unterminated}"#).unwrap();
        assert_eq!(value["title"], "unterminated");
    }

    #[test]
    fn closes_truncated_trailing_field() {
        let value =
            repair_json(r#"{"title": "Breaking News", "summary": "cut off mid-sen}"#).unwrap();
        assert_eq!(value["title"], "Breaking News");
        assert_eq!(value["summary"], "cut off mid-sen");
    }

    #[test]
    fn close_helper_leaves_balanced_strings_alone() {
        let balanced = r#"{"a": "b", "c": "d"}"#;
        assert_eq!(close_unterminated_strings(balanced), balanced);
        assert_eq!(close_unterminated_strings(r#"{"a": "b}"#), r#"{"a": "b"}"#);
    }

    #[test]
    fn gives_up_on_hopeless_input() {
        assert!(repair_json("not json at all").is_none());
        assert!(repair_json("").is_none());
    }

    #[test]
    fn finds_direct_and_aliased_keys() {
        let value = json!({
            "article_title": "T",
            "nested": { "deep": { "summary": "S" } },
            "list": [ { "twitter_post": "tweet" } ]
        });
        assert_eq!(find_nested(&value, "title").unwrap(), "T");
        assert_eq!(find_nested(&value, "summary").unwrap(), "S");
        assert_eq!(find_nested(&value, "twitter_post").unwrap(), "tweet");
        assert!(find_nested(&value, "image_url").is_none());
    }

    #[test]
    fn extracts_object_from_prose() {
        let text = "Here is your article:\n{\"title\": \"Big News\", \"content\": \"Body\"}\nHope you like it!";
        let value = extract_json(text, crate::EXPECTED_FIELDS).unwrap();
        assert_eq!(value["title"], "Big News");
    }

    #[test]
    fn ignores_objects_without_expected_fields() {
        let text = "{\"unrelated\": 1}";
        assert!(extract_json(text, crate::EXPECTED_FIELDS).is_none());
    }

    #[test]
    fn regex_fallback_recovers_quoted_fields() {
        let raw = r#"garbage "article_title": "Breaking" more garbage "twitter_post": "short post" end"#;
        let fields = regex_fields(raw);
        assert_eq!(fields["title"], "Breaking");
        assert_eq!(fields["twitter_post"], "short post");
        assert!(!fields.contains_key("image_url"));
    }

    #[test]
    fn extract_fields_takes_first_hit_per_key() {
        let value = json!({"title": "A", "inner": {"title": "B", "summary": "S"}});
        let fields = extract_fields(&value, &["title", "summary", "image_url"]);
        assert_eq!(fields["title"], "A");
        assert_eq!(fields["summary"], "S");
        assert_eq!(fields.len(), 2);
    }
}
