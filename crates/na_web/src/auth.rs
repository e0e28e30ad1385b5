//! Registration, login, and cookie-session plumbing.

use axum::extract::State;
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use na_core::{NewsStore, User};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const SESSION_COOKIE: &str = "session_id";
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Pull the session cookie out of request headers.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    for pair in cookies.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix(&format!("{}=", SESSION_COOKIE)) {
            return Some(value.to_string());
        }
    }
    None
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Resolve the logged-in user from the request's session cookie.
pub async fn current_user(
    store: &Arc<dyn NewsStore>,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let token =
        session_token(headers).ok_or_else(|| ApiError::unauthorized("Not logged in"))?;
    let session = store
        .get_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired"))?;
    store
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    if req.password != req.confirm_password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if state.store.get_user_by_name(username).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let hash = bcrypt::hash(&req.password, BCRYPT_COST)
        .map_err(|e| na_core::Error::Auth(format!("Failed to hash password: {}", e)))?;
    let user = state.store.create_user(username, &hash).await?;
    info!("👤 Registered user {}", user.username);

    Ok((StatusCode::CREATED, Json(json!({ "id": user.id, "username": user.username })))
        .into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .store
        .get_user_by_name(req.username.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let ok = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| na_core::Error::Auth(format!("Failed to verify password: {}", e)))?;
    if !ok {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::seconds(state.session_ttl_secs);
    state.store.create_session(user.id, &token, expires_at).await?;
    info!("🔑 User {} logged in", user.username);

    let mut response =
        Json(json!({ "id": user.id, "username": user.username })).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        session_cookie(&token, state.session_ttl_secs)
            .parse()
            .map_err(|_| na_core::Error::Auth("Invalid cookie value".to_string()))?,
    );
    Ok(response)
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state.store.delete_session(&token).await?;
    }
    let mut response = Json(json!({ "message": "Logged out" })).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        session_cookie("", 0)
            .parse()
            .map_err(|_| na_core::Error::Auth("Invalid cookie value".to_string()))?,
    );
    Ok(response)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = current_user(&state.store, &headers).await?;
    Ok(Json(user))
}

/// Create the default admin account on startup when it does not exist yet.
/// Credentials come from DEFAULT_ADMIN_USERNAME / DEFAULT_ADMIN_PASSWORD.
pub async fn ensure_default_admin(store: &Arc<dyn NewsStore>) -> na_core::Result<()> {
    let username =
        std::env::var("DEFAULT_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = match std::env::var("DEFAULT_ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            warn!("DEFAULT_ADMIN_PASSWORD not set, skipping default admin creation");
            return Ok(());
        }
    };

    if store.get_user_by_name(&username).await?.is_some() {
        return Ok(());
    }
    let hash = bcrypt::hash(&password, BCRYPT_COST)
        .map_err(|e| na_core::Error::Auth(format!("Failed to hash password: {}", e)))?;
    store.create_user(&username, &hash).await?;
    info!("👤 Created default admin user {}", username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "theme=dark; session_id=abc-123; lang=en".parse().unwrap(),
        );
        assert_eq!(session_token(&headers), Some("abc-123".to_string()));

        headers.insert("cookie", "theme=dark".parse().unwrap());
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookie_sets_expected_attributes() {
        let cookie = session_cookie("tok", 3600);
        assert!(cookie.starts_with("session_id=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
    }
}
