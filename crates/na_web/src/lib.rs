//! JSON API for the news agency: registration and login, article CRUD, and
//! fire-and-forget article generation with status polling.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub mod auth;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();
    let static_dir = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles", post(handlers::create_article))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/articles/:id", axum::routing::delete(handlers::delete_article))
        .route("/api/articles/:id/regenerate", post(handlers::regenerate_article))
        .nest_service("/static", static_dir)
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use na_core::{Article, ArticleStatus, Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use na_core::{ArticleStatus, LanguageModel, NewsStore};
    use na_crew::models::DummyModel;
    use na_crew::tools::{ContentFetcher, FetchedPage};
    use na_crew::{Config, Crew};
    use na_storage::create_store;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct StubFetcher;

    #[async_trait::async_trait]
    impl ContentFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> na_core::Result<FetchedPage> {
            Ok(FetchedPage {
                title: "Source".to_string(),
                text: "Body.".to_string(),
                ..Default::default()
            })
        }
    }

    async fn test_state() -> (tempfile::TempDir, Arc<dyn NewsStore>, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let store = create_store("memory", None).await.unwrap();
        let model: Arc<dyn LanguageModel> = Arc::new(DummyModel::default());
        let config = Config {
            model_name: "dummy".to_string(),
            image_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let crew = Arc::new(Crew::with_fetcher(model, &config, Arc::new(StubFetcher)));
        let state = AppState::new(store.clone(), crew, dir.path());
        (dir, store, state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn register_and_login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"username": "alice", "password": "pw", "confirm_password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"username": "alice", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_rejects_mismatched_passwords() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"username": "bob", "password": "a", "confirm_password": "b"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        register_and_login(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"username": "alice", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn articles_require_a_session() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        let response = app
            .oneshot(Request::get("/api/articles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_article_starts_generation() {
        let (_dir, store, state) = test_state().await;
        let app = create_app(state).await;
        let cookie = register_and_login(&app).await;

        let mut request = json_request(
            "POST",
            "/api/articles",
            json!({"topic": "rust news", "urls": ["https://example.com"]}),
        );
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let created = body_json(response).await;
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_i64().unwrap();

        // The dummy crew finishes almost immediately; poll the store
        let mut status = ArticleStatus::Pending;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            status = store.get_article(id).await.unwrap().unwrap().status;
            if status == ArticleStatus::Completed || status == ArticleStatus::Error {
                break;
            }
        }
        assert_eq!(status, ArticleStatus::Completed);

        let article = store.get_article(id).await.unwrap().unwrap();
        // The editor stage's headline survives the salvage pass intact
        assert_eq!(article.title.as_deref(), Some("Canned headline"));
        assert!(article.content.contains("Canned article"));
        assert!(article.raw_response.is_some());
    }

    #[tokio::test]
    async fn create_article_rejects_bad_urls() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        let cookie = register_and_login(&app).await;

        let mut request = json_request(
            "POST",
            "/api/articles",
            json!({"topic": "x", "urls": ["ftp://nope"]}),
        );
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn users_cannot_see_each_others_articles() {
        let (_dir, store, state) = test_state().await;
        let app = create_app(state).await;
        let cookie = register_and_login(&app).await;

        // Another user's article, inserted directly
        let other = store.create_user("mallory", "hash").await.unwrap();
        let theirs = store
            .create_article(na_core::NewArticle {
                topic: "secret".to_string(),
                urls: vec!["https://example.com".to_string()],
                content: String::new(),
                user_id: other.id,
            })
            .await
            .unwrap();

        let mut request = Request::get(format!("/api/articles/{}", theirs.id))
            .body(Body::empty())
            .unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_article_is_404() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        let cookie = register_and_login(&app).await;

        let mut request = Request::get("/api/articles/9999")
            .body(Body::empty())
            .unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let (_dir, _store, state) = test_state().await;
        let app = create_app(state).await;
        let cookie = register_and_login(&app).await;

        let mut request = Request::post("/api/auth/logout").body(Body::empty()).unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut request = Request::get("/api/articles").body(Body::empty()).unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
