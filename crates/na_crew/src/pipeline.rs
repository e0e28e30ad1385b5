//! The sequential agent pipeline.
//!
//! Stage order mirrors the original crew: research the URLs, aggregate the
//! findings into an outline, write the article, edit it (producing the
//! TITLE/SUMMARY/ARTICLE split), generate and download an illustration,
//! draft the social posts, then collect everything into the standardized
//! JSON object.

use chrono::Datelike;
use na_core::{LanguageModel, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::tools::formatter::{format_article_json, ArticleData};
use crate::tools::{ContentFetcher, HttpFetcher, ImageDownloader, UrlAnalyzer};
use crate::Config;

const RESEARCHER_SYSTEM: &str = "You are a skilled research journalist who extracts \
    and analyzes information from online sources: key facts, quotes, statistics, \
    dates, and author names, always noting source credibility.";

const AGGREGATOR_SYSTEM: &str = "You are an expert content organizer. You turn raw \
    research from multiple sources into a coherent outline with a clear timeline, \
    logical groupings, and naturally incorporated SEO keywords.";

const WRITER_SYSTEM: &str = "You are a talented news writer. You transform structured \
    outlines into engaging, factually accurate articles that read like the work of a \
    skilled human journalist, with keywords incorporated naturally.";

const EDITOR_SYSTEM: &str = "You are a seasoned chief editor. You verify facts and \
    attributions, remove anything that sounds AI-generated, and polish articles to \
    the highest journalistic standard.";

const SOCIAL_SYSTEM: &str = "You are a social media editor who writes platform-native \
    posts that drive readers to news articles.";

pub struct Crew {
    model: Arc<dyn LanguageModel>,
    analyzer: UrlAnalyzer,
    downloader: ImageDownloader,
}

/// What the editor stage hands downstream.
struct EditedArticle {
    title: String,
    summary: String,
    content: String,
}

impl Crew {
    pub fn new(model: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self::with_fetcher(model, config, Arc::new(HttpFetcher::new()))
    }

    pub fn with_fetcher(
        model: Arc<dyn LanguageModel>,
        config: &Config,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            model,
            analyzer: UrlAnalyzer::new(fetcher),
            downloader: ImageDownloader::new(config.image_dir.clone()),
        }
    }

    /// Run the whole pipeline and return the collector's JSON string.
    ///
    /// `article_id` is needed to place the downloaded image; without it the
    /// image stage is skipped entirely.
    pub async fn generate(
        &self,
        urls: &[String],
        topic: &str,
        article_id: Option<i64>,
    ) -> Result<String> {
        let research = self.analyzer.analyze(urls).await?;
        info!("📰 Starting crew for topic: {}", topic);

        let year = chrono::Utc::now().year();
        let brief = self
            .model
            .complete(
                RESEARCHER_SYSTEM,
                &format!(
                    "Analyze the research data below for an article on: {topic} (current year {year}).\n\
                     Identify common themes, contradictions, key quotes, statistics, and when events \
                     occurred, then compile a structured research brief.\n\nResearch data:\n{research}"
                ),
            )
            .await?;
        info!("🔬 Research brief ready ({} chars)", brief.len());

        let outline = self
            .model
            .complete(
                AGGREGATOR_SYSTEM,
                &format!(
                    "Organize this research into an outline for a news article on: {topic}.\n\
                     Include a headline suggestion with the primary keyword, subheadings with \
                     related keywords, a timeline of events, placement of key facts and quotes, \
                     and a suggested meta description.\n\nResearch brief:\n{brief}"
                ),
            )
            .await?;
        info!("🗂️ Outline ready ({} chars)", outline.len());

        let draft = self
            .model
            .complete(
                WRITER_SYSTEM,
                &format!(
                    "Write a comprehensive news article on: {topic}, following this outline.\n\
                     Use the primary keyword in the first paragraph, H2/H3 subheadings with \
                     secondary keywords, short scannable paragraphs, proper attribution, and \
                     clearly state when events occurred.\n\nOutline:\n{outline}"
                ),
            )
            .await?;
        info!("✍️ Draft ready ({} chars)", draft.len());

        let edited = self
            .model
            .complete(
                EDITOR_SYSTEM,
                &format!(
                    "Review and edit this article about {topic}: verify attributions, present the \
                     timeline clearly, remove awkward or artificial phrasing, and keep SEO elements \
                     natural. Then produce a concise headline containing the primary keyword, and a \
                     summary of at most 160 characters that captures the story, mentions when it \
                     happened, and is optimized for sharing.\n\
                     Format your response exactly as:\n\n\
                     TITLE: [the headline]\n\n\
                     SUMMARY: [your summary]\n\n\
                     ARTICLE: [the full edited article]\n\n\
                     Article:\n{draft}"
                ),
            )
            .await?;
        let edited = split_editor_response(&edited);
        info!(
            "🪶 Edited article ready ({} chars, summary {} chars, title {:?})",
            edited.content.len(),
            edited.summary.len(),
            edited.title
        );

        let mut data = ArticleData {
            title: edited.title,
            content: edited.content,
            summary: edited.summary,
            ..Default::default()
        };

        if let Some(id) = article_id {
            self.illustrate(&mut data, topic, id).await;
        }
        self.draft_social_posts(&mut data, topic).await;

        Ok(format_article_json(&data))
    }

    /// Image stage: prompt for an illustration, generate, download. Any
    /// failure leaves the image fields empty; the article still completes.
    async fn illustrate(&self, data: &mut ArticleData, topic: &str, article_id: i64) {
        let prompt = match self
            .model
            .complete(
                EDITOR_SYSTEM,
                &format!(
                    "Write a single DALL-E prompt (no commentary) for a photorealistic editorial \
                     illustration of this article on {topic}:\n\n{}",
                    data.summary
                ),
            )
            .await
        {
            Ok(p) => p.trim().to_string(),
            Err(e) => {
                warn!("Image prompt generation failed: {}", e);
                return;
            }
        };

        let image_url = match self.model.generate_image(&prompt).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Image generation failed: {}", e);
                return;
            }
        };

        match self.downloader.download(&image_url, article_id, None).await {
            Ok(saved) => {
                data.image_url = image_url;
                data.image_prompt = prompt;
                data.image_local_path = saved.local_path.display().to_string();
                data.image_relative_path = saved.relative_path;
            }
            Err(e) => {
                warn!("Image download failed: {}", e);
                // Keep the remote URL even when saving locally failed
                data.image_url = image_url;
                data.image_prompt = prompt;
            }
        }
    }

    /// Social stage: LinkedIn and Twitter/X drafts. Failures are logged
    /// and leave the fields empty.
    async fn draft_social_posts(&self, data: &mut ArticleData, topic: &str) {
        match self
            .model
            .complete(
                SOCIAL_SYSTEM,
                &format!(
                    "Write a LinkedIn post (professional tone, up to 3 short paragraphs, 3-5 \
                     hashtags) announcing this article on {topic}:\n\n{}",
                    data.summary
                ),
            )
            .await
        {
            Ok(post) => data.linkedin_post = post.trim().to_string(),
            Err(e) => warn!("LinkedIn post generation failed: {}", e),
        }

        match self
            .model
            .complete(
                SOCIAL_SYSTEM,
                &format!(
                    "Write a Twitter/X post (at most 280 characters, 1-2 hashtags) announcing \
                     this article on {topic}:\n\n{}",
                    data.summary
                ),
            )
            .await
        {
            Ok(post) => data.twitter_post = post.trim().to_string(),
            Err(e) => warn!("Twitter post generation failed: {}", e),
        }
    }
}

/// Split the editor's `TITLE: ... SUMMARY: ... ARTICLE: ...` response.
/// A missing TITLE marker leaves the title empty; when SUMMARY or ARTICLE
/// is missing the whole text becomes the article.
fn split_editor_response(text: &str) -> EditedArticle {
    if let Some((head, body)) = text.split_once("ARTICLE:") {
        if let Some((front, summary)) = head.split_once("SUMMARY:") {
            let title = front
                .split_once("TITLE:")
                .map(|(_, t)| t.trim().to_string())
                .unwrap_or_default();
            return EditedArticle {
                title,
                summary: summary.trim().to_string(),
                content: body.trim().to_string(),
            };
        }
    }
    EditedArticle {
        title: String::new(),
        summary: String::new(),
        content: text.trim().to_string(),
    }
}
