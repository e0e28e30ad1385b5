//! Salvage utilities for malformed LLM output.
//!
//! Language models are asked to answer with a single JSON object but
//! routinely hand back almost-JSON: bare keys, unescaped quotes, stray
//! backslashes, prose wrapped around the object. This crate repairs what it
//! can, digs requested fields out of whatever structure parsed, and converts
//! the markdown the models insist on into HTML.

pub mod json;
pub mod text;

pub use json::{extract_fields, extract_json, find_nested, regex_fields, repair_json};
pub use text::{fix_relative_urls, linkify, markdown_to_html, normalize_image_path, sanitize_text, strip_control_chars};

/// Every key the generation pipeline may answer with, including the
/// aliased forms some models prefer.
pub const EXPECTED_FIELDS: &[&str] = &[
    "content",
    "title",
    "summary",
    "article_content",
    "article_title",
    "article_summary",
    "image_url",
    "image_path",
    "image_relative_path",
    "image_prompt",
    "linkedin_post",
    "twitter_post",
];

/// Map aliased response keys onto article column names.
pub fn canonical_field(key: &str) -> &str {
    match key {
        "article_content" => "content",
        "article_title" => "title",
        "article_summary" => "summary",
        "image_relative_path" => "image_path",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_columns() {
        assert_eq!(canonical_field("article_title"), "title");
        assert_eq!(canonical_field("image_relative_path"), "image_path");
        assert_eq!(canonical_field("linkedin_post"), "linkedin_post");
    }
}
