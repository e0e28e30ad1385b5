use na_core::NewsStore;
use na_crew::Crew;
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<dyn NewsStore>,
    pub crew: Arc<Crew>,
    /// Static root generated images are served from
    pub static_dir: PathBuf,
    /// Lifetime of login sessions in seconds
    pub session_ttl_secs: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn NewsStore>, crew: Arc<Crew>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            crew,
            static_dir: static_dir.into(),
            session_ttl_secs: 7 * 24 * 3600,
        }
    }
}
