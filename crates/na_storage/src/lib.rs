use na_core::{NewsStore, Result};
use std::path::Path;
use std::sync::Arc;

pub mod backends;

pub use backends::memory::MemoryStore;
pub use backends::sqlite::SqliteStore;

/// Build a store from a backend name. `sqlite` persists to `path`
/// (default `news.db`); `memory` keeps everything in process and is meant
/// for tests and dry runs.
pub async fn create_store(backend: &str, path: Option<&Path>) -> Result<Arc<dyn NewsStore>> {
    match backend {
        "sqlite" => {
            let path = path.unwrap_or_else(|| Path::new("news.db"));
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(na_core::Error::Storage(format!(
            "Unknown storage backend: {}",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::{create_store, MemoryStore, SqliteStore};
    pub use na_core::{ArticleStore, NewsStore, SessionStore, UserStore};
}
