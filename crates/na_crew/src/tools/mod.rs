pub mod formatter;
pub mod image_downloader;
pub mod url_analyzer;

pub use formatter::format_article_json;
pub use image_downloader::ImageDownloader;
pub use url_analyzer::{ContentFetcher, FetchedPage, HttpFetcher, UrlAnalyzer};
