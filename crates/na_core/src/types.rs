use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a generated article. Transitions are
/// pending -> processing -> completed | error, driven by a single
/// background task per article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Processing => "processing",
            ArticleStatus::Completed => "completed",
            ArticleStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ArticleStatus::Pending),
            "processing" => Some(ArticleStatus::Processing),
            "completed" => Some(ArticleStatus::Completed),
            "error" => Some(ArticleStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Cookie-backed login session. Tokens are opaque uuids; expired rows are
/// ignored on lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub topic: String,
    pub urls: Vec<String>,
    pub content: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub image_prompt: Option<String>,
    pub linkedin_post: Option<String>,
    pub twitter_post: Option<String>,
    pub raw_response: Option<String>,
    pub status: ArticleStatus,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields a new article starts with before generation runs.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub topic: String,
    pub urls: Vec<String>,
    pub content: String,
    pub user_id: i64,
}
