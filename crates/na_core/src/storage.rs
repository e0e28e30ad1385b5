use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Article, ArticleStatus, NewArticle, Session, User};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a pending article and return it with its assigned id
    async fn create_article(&self, article: NewArticle) -> Result<Article>;

    /// Fetch a single article by id
    async fn get_article(&self, id: i64) -> Result<Option<Article>>;

    /// All articles owned by a user, newest first
    async fn list_articles(&self, user_id: i64) -> Result<Vec<Article>>;

    /// Persist generated fields (content, title, summary, image, posts)
    async fn update_article(&self, article: &Article) -> Result<()>;

    /// Update only the status column
    async fn set_status(&self, id: i64, status: ArticleStatus) -> Result<()>;

    async fn delete_article(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user; fails on duplicate username
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_name(&self, username: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    /// Look up an unexpired session by token
    async fn get_session(&self, token: &str) -> Result<Option<Session>>;

    async fn delete_session(&self, token: &str) -> Result<()>;
}

/// Everything the web service needs from a backend.
pub trait NewsStore: ArticleStore + UserStore + SessionStore {}

impl<T: ArticleStore + UserStore + SessionStore> NewsStore for T {}
