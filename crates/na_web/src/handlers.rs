//! Article CRUD. Every handler requires a logged-in session; articles are
//! only visible to their owner.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use na_core::{Article, NewArticle, User};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::auth::current_user;
use crate::error::ApiError;
use crate::generation::spawn_generation;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub topic: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Fetch an article and verify the caller owns it.
async fn owned_article(
    state: &AppState,
    user: &User,
    id: i64,
) -> Result<Article, ApiError> {
    let article = state
        .store
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Article {} not found", id)))?;
    if article.user_id != user.id {
        return Err(ApiError::forbidden("Article belongs to another user"));
    }
    Ok(article)
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Article>>, ApiError> {
    let user = current_user(&state.store, &headers).await?;
    let articles = state.store.list_articles(user.id).await?;
    Ok(Json(articles))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    let user = current_user(&state.store, &headers).await?;
    let article = owned_article(&state, &user, id).await?;
    Ok(Json(article))
}

/// Create a pending article and kick off generation in the background.
/// The response carries the pending row; clients poll `status`.
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let user = current_user(&state.store, &headers).await?;

    let topic = req.topic.trim().to_string();
    if topic.is_empty() {
        return Err(ApiError::bad_request("Topic is required"));
    }
    let urls: Vec<String> = req
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(ApiError::bad_request("At least one source URL is required"));
    }
    if let Some(bad) = urls
        .iter()
        .find(|u| !u.starts_with("http://") && !u.starts_with("https://"))
    {
        return Err(ApiError::bad_request(format!("Invalid URL: {}", bad)));
    }

    let article = state
        .store
        .create_article(NewArticle {
            topic,
            urls,
            content: String::new(),
            user_id: user.id,
        })
        .await?;
    info!("📝 Created article {} for user {}", article.id, user.username);

    spawn_generation(state.store.clone(), state.crew.clone(), article.clone());
    Ok((StatusCode::CREATED, Json(article)))
}

/// Re-run generation for an existing article, resetting it to pending.
pub async fn regenerate_article(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    let user = current_user(&state.store, &headers).await?;
    let mut article = owned_article(&state, &user, id).await?;

    article.status = na_core::ArticleStatus::Pending;
    state
        .store
        .set_status(article.id, na_core::ArticleStatus::Pending)
        .await?;
    info!("🔄 Regenerating article {}", article.id);

    spawn_generation(state.store.clone(), state.crew.clone(), article.clone());
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state.store, &headers).await?;
    owned_article(&state, &user, id).await?;
    state.store.delete_article(id).await?;
    info!("🗑️ Deleted article {}", id);
    Ok(Json(json!({ "message": "Article deleted" })))
}
