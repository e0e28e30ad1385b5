//! Background article generation and response salvage.
//!
//! One detached task per article: mark it processing, run the crew, salvage
//! whatever fields can be recovered from the model's response, store the
//! result, and flip the status to completed or error. The salvage path never
//! rejects a response outright; a completed article with only a default
//! title beats a lost generation.

use na_core::{Article, ArticleStatus, NewsStore};
use na_crew::Crew;
use na_recover::{
    canonical_field, extract_fields, extract_json, fix_relative_urls, linkify,
    markdown_to_html, normalize_image_path, regex_fields, repair_json, sanitize_text,
    EXPECTED_FIELDS,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fields recovered from a generation response, ready to store.
#[derive(Debug, Default, PartialEq)]
pub struct SalvagedArticle {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub image_prompt: Option<String>,
    pub linkedin_post: Option<String>,
    pub twitter_post: Option<String>,
}

/// Spawn the generation task for an article. Fire and forget: callers get
/// the pending article back immediately and poll its status.
pub fn spawn_generation(store: Arc<dyn NewsStore>, crew: Arc<Crew>, article: Article) {
    tokio::spawn(async move {
        let id = article.id;
        if let Err(e) = run_generation(store.clone(), crew, article).await {
            error!("Generation for article {} failed: {}", id, e);
            if let Err(e) = store.set_status(id, ArticleStatus::Error).await {
                error!("Failed to mark article {} as errored: {}", id, e);
            }
        }
    });
}

async fn run_generation(
    store: Arc<dyn NewsStore>,
    crew: Arc<Crew>,
    mut article: Article,
) -> na_core::Result<()> {
    info!("🚀 Generating article {} on topic: {}", article.id, article.topic);
    store.set_status(article.id, ArticleStatus::Processing).await?;

    let raw = crew
        .generate(&article.urls, &article.topic, Some(article.id))
        .await?;
    let salvaged = salvage_response(&raw, &article.topic);

    article.title = Some(salvaged.title);
    article.content = salvaged.content;
    article.summary = salvaged.summary;
    article.image_url = salvaged.image_url;
    article.image_path = salvaged.image_path;
    article.image_prompt = salvaged.image_prompt;
    article.linkedin_post = salvaged.linkedin_post;
    article.twitter_post = salvaged.twitter_post;
    article.raw_response = Some(raw);
    article.status = ArticleStatus::Completed;
    store.update_article(&article).await?;

    info!("✅ Article {} completed", article.id);
    Ok(())
}

/// Recover article fields from a model response that should be JSON but
/// often is not. Tries full repair, then object extraction, then regex
/// scraping of the raw text. Markdown in recovered prose is converted to
/// HTML and bare URLs become links.
pub fn salvage_response(raw: &str, topic: &str) -> SalvagedArticle {
    let mut fields: HashMap<String, String> = HashMap::new();

    let parsed = repair_json(raw).or_else(|| extract_json(raw, EXPECTED_FIELDS));
    match parsed {
        Some(value) => {
            for (key, v) in extract_fields(&value, EXPECTED_FIELDS) {
                let text = match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => continue,
                    other => other.to_string(),
                };
                if text.is_empty() {
                    continue;
                }
                // First hit wins; aliases come after the plain keys
                fields
                    .entry(canonical_field(&key).to_string())
                    .or_insert(text);
            }
        }
        None => {
            warn!("No JSON object recovered from response, falling back to regex extraction");
            for (key, text) in regex_fields(raw) {
                if !text.is_empty() {
                    fields.entry(canonical_field(&key).to_string()).or_insert(text);
                }
            }
        }
    }

    let title = fields
        .remove("title")
        .map(|t| sanitize_text(t.trim()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| default_title(topic));

    let content = fields
        .remove("content")
        .map(|c| render_prose(&c))
        .unwrap_or_default();

    let summary = fields
        .remove("summary")
        .map(|s| sanitize_text(s.trim()))
        .filter(|s| !s.is_empty());

    let image_path = fields.remove("image_path").and_then(|p| {
        let p = p.trim().to_string();
        if p.is_empty() {
            return None;
        }
        Some(normalize_image_path(&p).unwrap_or(p))
    });

    SalvagedArticle {
        title,
        content,
        summary,
        image_url: fields.remove("image_url").filter(|s| !s.trim().is_empty()),
        image_path,
        image_prompt: fields.remove("image_prompt").filter(|s| !s.trim().is_empty()),
        linkedin_post: fields
            .remove("linkedin_post")
            .filter(|s| !s.trim().is_empty())
            .map(|p| render_prose(&p)),
        twitter_post: fields
            .remove("twitter_post")
            .filter(|s| !s.trim().is_empty())
            .map(|p| render_prose(&p)),
    }
}

/// Markdown-ish model prose to displayable HTML.
fn render_prose(text: &str) -> String {
    let fixed = fix_relative_urls(text);
    linkify(&markdown_to_html(&fixed))
}

/// Topic with the first letter capitalized, used when no title survives.
fn default_title(topic: &str) -> String {
    let mut chars = topic.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Untitled article".to_string(),
    }
}
