//! Source-URL analysis for the research stage.

use async_trait::async_trait;
use chrono::Utc;
use na_core::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

// Long pages blow the model's context; truncate like the original did.
const MAX_TEXT_LEN: usize = 8000;
const MAX_DESCRIPTION_LEN: usize = 200;

/// What one page yields after extraction.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub title: String,
    pub text: String,
    pub author: String,
    pub description: String,
}

/// Seam between the analyzer and the network so tests can stub pages in.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Real fetcher: GET the page and pull title, paragraphs, and byline out
/// of the HTML.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_page(&body))
    }
}

fn select_first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_page(html: &str) -> FetchedPage {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("title").expect("static selector");
    let h1_sel = Selector::parse("h1").expect("static selector");
    let p_sel = Selector::parse("p").expect("static selector");
    let author_sel = Selector::parse(r#"meta[name="author"]"#).expect("static selector");
    let desc_sel = Selector::parse(r#"meta[name="description"]"#).expect("static selector");

    let title = select_first_text(&document, &title_sel)
        .or_else(|| select_first_text(&document, &h1_sel))
        .unwrap_or_default();

    let paragraphs: Vec<String> = document
        .select(&p_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let text = paragraphs.join("\n\n");

    let author = document
        .select(&author_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let description = document
        .select(&desc_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
        .or_else(|| paragraphs.first().cloned())
        .unwrap_or_default();

    FetchedPage {
        title,
        text,
        author,
        description,
    }
}

fn truncate(text: &str, limit: usize, marker: &str) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}{}", cut, marker)
}

/// Research tool: analyze a batch of URLs and report per-URL results plus
/// summary statistics as one JSON value.
pub struct UrlAnalyzer {
    fetcher: Arc<dyn ContentFetcher>,
}

impl UrlAnalyzer {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { fetcher }
    }

    /// Keep only well-formed http(s) URLs.
    pub fn valid_urls(urls: &[String]) -> Vec<String> {
        urls.iter()
            .map(|u| u.trim().to_string())
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .collect()
    }

    pub async fn analyze(&self, urls: &[String]) -> Result<Value> {
        let valid = Self::valid_urls(urls);
        if valid.is_empty() {
            return Err(na_core::Error::InvalidUrl(
                "No valid URLs provided (URLs must start with http:// or https://)".to_string(),
            ));
        }

        info!("🔎 Analyzing {} URLs", valid.len());
        let mut results = serde_json::Map::new();
        let mut successful = 0usize;
        let mut total_words = 0usize;

        for url in &valid {
            match self.fetcher.fetch(url).await {
                Ok(page) => {
                    let text = truncate(&page.text, MAX_TEXT_LEN, "... [content truncated]");
                    let description =
                        truncate(&page.description, MAX_DESCRIPTION_LEN - 3, "...");
                    let word_count = text.split_whitespace().count();
                    successful += 1;
                    total_words += word_count;
                    results.insert(
                        url.clone(),
                        json!({
                            "url": url,
                            "title": page.title,
                            "description": description,
                            "author": page.author,
                            "text": text,
                            "word_count": word_count,
                            "success": true,
                            "timestamp": Utc::now().to_rfc3339(),
                        }),
                    );
                }
                Err(e) => {
                    warn!("Failed to analyze URL {}: {}", url, e);
                    results.insert(
                        url.clone(),
                        json!({
                            "url": url,
                            "success": false,
                            "error": e.to_string(),
                            "timestamp": Utc::now().to_rfc3339(),
                        }),
                    );
                }
            }
        }

        let summary = json!({
            "total_urls": valid.len(),
            "successful": successful,
            "failed": valid.len() - successful,
            "total_word_count": total_words,
        });
        info!("📊 Analysis summary: {}", summary);

        Ok(json!({ "results": results, "summary": summary }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubFetcher;

    #[async_trait]
    impl ContentFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            if url.contains("broken") {
                return Err(na_core::Error::InvalidUrl(url.to_string()));
            }
            Ok(FetchedPage {
                title: "Stub Title".to_string(),
                text: "one two three".to_string(),
                author: "Stub Author".to_string(),
                description: "desc".to_string(),
            })
        }
    }

    #[test]
    fn filters_malformed_urls() {
        let urls = vec![
            " https://a.com ".to_string(),
            "ftp://b.com".to_string(),
            "".to_string(),
            "http://c.com".to_string(),
        ];
        assert_eq!(UrlAnalyzer::valid_urls(&urls), vec!["https://a.com", "http://c.com"]);
    }

    #[tokio::test]
    async fn reports_per_url_results_and_summary() {
        let analyzer = UrlAnalyzer::new(Arc::new(StubFetcher));
        let report = analyzer
            .analyze(&[
                "https://good.com".to_string(),
                "https://broken.com".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(report["summary"]["total_urls"], 2);
        assert_eq!(report["summary"]["successful"], 1);
        assert_eq!(report["summary"]["failed"], 1);
        assert_eq!(report["results"]["https://good.com"]["word_count"], 3);
        assert_eq!(report["results"]["https://broken.com"]["success"], false);
    }

    #[tokio::test]
    async fn rejects_empty_url_list() {
        let analyzer = UrlAnalyzer::new(Arc::new(StubFetcher));
        let err = analyzer.analyze(&["notaurl".to_string()]).await.unwrap_err();
        assert!(matches!(err, na_core::Error::InvalidUrl(_)));
    }

    #[test]
    fn extracts_title_text_and_author() {
        let html = r#"<html><head><title>Page Title</title>
            <meta name="author" content="Jane"></head>
            <body><p>First paragraph.</p><p>Second paragraph.</p></body></html>"#;
        let page = extract_page(html);
        assert_eq!(page.title, "Page Title");
        assert_eq!(page.author, "Jane");
        assert_eq!(page.text, "First paragraph.\n\nSecond paragraph.");
        assert_eq!(page.description, "First paragraph.");
    }

    #[test]
    fn truncates_long_content() {
        let long = "x".repeat(MAX_TEXT_LEN + 10);
        let cut = truncate(&long, MAX_TEXT_LEN, "... [content truncated]");
        assert!(cut.ends_with("... [content truncated]"));
        assert_eq!(cut.chars().count(), MAX_TEXT_LEN + "... [content truncated]".chars().count());
    }
}
