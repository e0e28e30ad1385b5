//! Final-stage output formatting.

use serde_json::json;

/// Fields the collector stage gathers before formatting.
#[derive(Debug, Clone, Default)]
pub struct ArticleData {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub image_url: String,
    pub image_local_path: String,
    pub image_relative_path: String,
    pub image_prompt: String,
    pub linkedin_post: String,
    pub twitter_post: String,
}

/// Assemble the standardized JSON object the web layer salvages fields
/// from. Always produces valid JSON, whatever the models handed back.
pub fn format_article_json(data: &ArticleData) -> String {
    if data.summary.chars().count() > 160 {
        tracing::warn!(
            "Article summary is too long: {} characters (recommended up to 160)",
            data.summary.chars().count()
        );
    }
    for (field, value) in [
        ("article_title", &data.title),
        ("article_content", &data.content),
        ("article_summary", &data.summary),
    ] {
        if value.is_empty() {
            tracing::warn!("Field {} is empty", field);
        }
    }

    json!({
        "article_title": data.title,
        "article_content": data.content,
        "article_summary": data.summary,
        "image_info": {
            "image_url": data.image_url,
            "image_path": data.image_local_path,
            "image_relative_path": data.image_relative_path,
            "image_prompt": data.image_prompt,
        },
        "social_media": {
            "linkedin_post": data.linkedin_post,
            "twitter_post": data.twitter_post,
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use na_recover::{find_nested, EXPECTED_FIELDS};

    #[test]
    fn output_is_salvageable_json() {
        let data = ArticleData {
            title: "T".to_string(),
            content: "C".to_string(),
            summary: "S".to_string(),
            image_relative_path: "images/1/a.jpg".to_string(),
            linkedin_post: "L".to_string(),
            twitter_post: "tw".to_string(),
            ..Default::default()
        };
        let out = format_article_json(&data);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(find_nested(&value, "title").unwrap(), "T");
        assert_eq!(find_nested(&value, "twitter_post").unwrap(), "tw");
        assert_eq!(
            find_nested(&value, "image_relative_path").unwrap(),
            "images/1/a.jpg"
        );
        assert!(EXPECTED_FIELDS
            .iter()
            .any(|k| find_nested(&value, k).is_some()));
    }
}
