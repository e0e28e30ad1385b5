pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub use models::LanguageModel;
pub use storage::{ArticleStore, NewsStore, SessionStore, UserStore};
pub use types::{Article, ArticleStatus, NewArticle, Session, User};

pub type Result<T> = std::result::Result<T, Error>;
