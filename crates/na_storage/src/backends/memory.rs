use async_trait::async_trait;
use chrono::{DateTime, Utc};
use na_core::{
    Article, ArticleStatus, ArticleStore, NewArticle, Result, Session, SessionStore, User,
    UserStore,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process store used by tests and dry runs. Mirrors the SQLite
/// backend's behavior, including cascade semantics and session expiry.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    articles: HashMap<i64, Article>,
    sessions: HashMap<String, Session>,
    next_user_id: i64,
    next_article_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.next_article_id += 1;
        let article = Article {
            id: inner.next_article_id,
            topic: article.topic,
            urls: article.urls,
            content: article.content,
            title: None,
            summary: None,
            image_url: None,
            image_path: None,
            image_prompt: None,
            linkedin_post: None,
            twitter_post: None,
            raw_response: None,
            status: ArticleStatus::Pending,
            user_id: article.user_id,
            created_at: Utc::now(),
        };
        inner.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.articles.get(&id).cloned())
    }

    async fn list_articles(&self, user_id: i64) -> Result<Vec<Article>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut articles: Vec<Article> = inner
            .articles
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        match inner.articles.get_mut(&article.id) {
            Some(existing) => {
                *existing = article.clone();
                Ok(())
            }
            None => Err(na_core::Error::NotFound(format!(
                "Article {} not found",
                article.id
            ))),
        }
    }

    async fn set_status(&self, id: i64, status: ArticleStatus) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        match inner.articles.get_mut(&id) {
            Some(article) => {
                article.status = status;
                Ok(())
            }
            None => Err(na_core::Error::NotFound(format!("Article {} not found", id))),
        }
    }

    async fn delete_article(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.articles.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        if inner.users.values().any(|u| u.username == username) {
            return Err(na_core::Error::Auth(format!(
                "Username already taken: {}",
                username
            )));
        }
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let session = Session {
            token: token.to_string(),
            user_id,
            expires_at,
        };
        inner.sessions.insert(token.to_string(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.sessions.remove(token);
        Ok(())
    }
}
