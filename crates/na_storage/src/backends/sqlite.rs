use async_trait::async_trait;
use chrono::{DateTime, Utc};
use na_core::{
    Article, ArticleStatus, ArticleStore, NewArticle, Result, Session, SessionStore, User,
    UserStore,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::info;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        topic TEXT NOT NULL,
        urls TEXT NOT NULL,
        content TEXT NOT NULL,
        title TEXT,
        summary TEXT,
        image_url TEXT,
        image_path TEXT,
        image_prompt TEXT,
        linkedin_post TEXT,
        twitter_post TEXT,
        raw_response TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

pub struct SqliteStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let newly_created = !db_path.exists();
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to connect: {}", e)))?;

        // Cascade deletes rely on foreign keys; WAL lets the background
        // generation task write while request handlers read.
        for pragma in [
            "PRAGMA foreign_keys = ON",
            "PRAGMA journal_mode = WAL",
            "PRAGMA busy_timeout = 5000",
        ] {
            sqlx::query(pragma)
                .execute(&pool)
                .await
                .map_err(|e| na_core::Error::Database(format!("Failed to set pragma: {}", e)))?;
        }

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| na_core::Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| na_core::Error::Database(format!("Failed to parse timestamp: {}", e)))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let urls: String = row.get("urls");
    let urls: Vec<String> = serde_json::from_str(&urls)?;
    let status: String = row.get("status");
    let status = ArticleStatus::parse(&status)
        .ok_or_else(|| na_core::Error::Database(format!("Unknown article status: {}", status)))?;

    Ok(Article {
        id: row.get("id"),
        topic: row.get("topic"),
        urls,
        content: row.get("content"),
        title: row.get("title"),
        summary: row.get("summary"),
        image_url: row.get("image_url"),
        image_path: row.get("image_path"),
        image_prompt: row.get("image_prompt"),
        linkedin_post: row.get("linkedin_post"),
        twitter_post: row.get("twitter_post"),
        raw_response: row.get("raw_response"),
        status,
        user_id: row.get("user_id"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let urls = serde_json::to_string(&article.urls)?;
        let created_at = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO articles (topic, urls, content, status, user_id, created_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(&article.topic)
        .bind(&urls)
        .bind(&article.content)
        .bind(article.user_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| na_core::Error::Database(format!("Failed to create article: {}", e)))?
        .last_insert_rowid();

        Ok(Article {
            id,
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
            created_at,
        })
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to get article: {}", e)))?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(&self, user_id: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            "SELECT * FROM articles WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| na_core::Error::Database(format!("Failed to list articles: {}", e)))?;

        rows.iter().map(article_from_row).collect()
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles SET
                content = ?, title = ?, summary = ?,
                image_url = ?, image_path = ?, image_prompt = ?,
                linkedin_post = ?, twitter_post = ?, raw_response = ?,
                status = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.content)
        .bind(article.title.as_deref())
        .bind(article.summary.as_deref())
        .bind(article.image_url.as_deref())
        .bind(article.image_path.as_deref())
        .bind(article.image_prompt.as_deref())
        .bind(article.linkedin_post.as_deref())
        .bind(article.twitter_post.as_deref())
        .bind(article.raw_response.as_deref())
        .bind(article.status.as_str())
        .bind(article.id)
        .execute(&self.pool)
        .await
        .map_err(|e| na_core::Error::Database(format!("Failed to update article: {}", e)))?;

        Ok(())
    }

    async fn set_status(&self, id: i64, status: ArticleStatus) -> Result<()> {
        sqlx::query("UPDATE articles SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to set status: {}", e)))?;
        Ok(())
    }

    async fn delete_article(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to delete article: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(na_core::Error::Auth(format!(
                    "Username already taken: {}",
                    username
                )))
            }
            Err(e) => {
                return Err(na_core::Error::Database(format!(
                    "Failed to create user: {}",
                    e
                )))
            }
        };

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to get user: {}", e)))?;

        row.map(|row| {
            Ok(User {
                id: row.get("id"),
                username: row.get("username"),
                password_hash: row.get("password_hash"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            })
        })
        .transpose()
    }

    async fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to get user: {}", e)))?;

        row.map(|row| {
            Ok(User {
                id: row.get("id"),
                username: row.get("username"),
                password_hash: row.get("password_hash"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to create session: {}", e)))?;

        Ok(Session {
            token: token.to_string(),
            user_id,
            expires_at,
        })
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to get session: {}", e)))?;

        let session = row
            .map(|row| {
                Ok::<_, na_core::Error>(Session {
                    token: row.get("token"),
                    user_id: row.get("user_id"),
                    expires_at: parse_timestamp(&row.get::<String, _>("expires_at"))?,
                })
            })
            .transpose()?;

        Ok(session.filter(|s| s.expires_at > Utc::now()))
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| na_core::Error::Database(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn article_lifecycle() {
        let (_dir, store) = open_store().await;
        let user = store.create_user("alice", "hash").await.unwrap();

        let article = store
            .create_article(NewArticle {
                topic: "AI".to_string(),
                urls: vec!["https://example.com".to_string()],
                content: "placeholder".to_string(),
                user_id: user.id,
            })
            .await
            .unwrap();
        assert_eq!(article.status, ArticleStatus::Pending);

        store
            .set_status(article.id, ArticleStatus::Processing)
            .await
            .unwrap();
        let fetched = store.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ArticleStatus::Processing);
        assert_eq!(fetched.urls, vec!["https://example.com"]);

        let mut updated = fetched;
        updated.title = Some("Generated title".to_string());
        updated.content = "<p>done</p>".to_string();
        updated.status = ArticleStatus::Completed;
        store.update_article(&updated).await.unwrap();

        let listed = store.list_articles(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title.as_deref(), Some("Generated title"));
        assert_eq!(listed[0].status, ArticleStatus::Completed);

        store.delete_article(article.id).await.unwrap();
        assert!(store.get_article(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_usernames_rejected() {
        let (_dir, store) = open_store().await;
        store.create_user("bob", "h1").await.unwrap();
        let err = store.create_user("bob", "h2").await.unwrap_err();
        assert!(matches!(err, na_core::Error::Auth(_)));
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_articles() {
        let (_dir, store) = open_store().await;
        let user = store.create_user("carol", "hash").await.unwrap();
        let article = store
            .create_article(NewArticle {
                topic: "t".to_string(),
                urls: vec![],
                content: "c".to_string(),
                user_id: user.id,
            })
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user.id)
            .execute(store.pool())
            .await
            .unwrap();

        assert!(store.get_article(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored() {
        let (_dir, store) = open_store().await;
        let user = store.create_user("dave", "hash").await.unwrap();

        let live = Utc::now() + chrono::Duration::days(30);
        store.create_session(user.id, "tok-live", live).await.unwrap();
        assert!(store.get_session("tok-live").await.unwrap().is_some());

        let dead = Utc::now() - chrono::Duration::hours(1);
        store.create_session(user.id, "tok-dead", dead).await.unwrap();
        assert!(store.get_session("tok-dead").await.unwrap().is_none());

        store.delete_session("tok-live").await.unwrap();
        assert!(store.get_session("tok-live").await.unwrap().is_none());
    }
}
