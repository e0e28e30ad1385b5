//! Download generated images into the per-article static directory.

use na_core::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct ImageDownloader {
    client: Client,
    base_dir: PathBuf,
}

/// Where a downloaded image ended up.
#[derive(Debug, Clone)]
pub struct SavedImage {
    /// Absolute path on disk
    pub local_path: PathBuf,
    /// Path relative to the static root, e.g. `images/7/article_7_image.jpg`
    pub relative_path: String,
}

impl ImageDownloader {
    /// `base_dir` is the static root; images land in
    /// `<base_dir>/images/<article_id>/`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            base_dir: base_dir.into(),
        }
    }

    pub async fn download(
        &self,
        image_url: &str,
        article_id: i64,
        filename: Option<&str>,
    ) -> Result<SavedImage> {
        let dir = self.base_dir.join("images").join(article_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let base_name = match filename {
            Some(name) => ensure_image_extension(name),
            None => format!("article_{}_image.jpg", article_id),
        };
        let final_name = unique_filename(&dir, &base_name);
        let local_path = dir.join(&final_name);

        let bytes = self
            .client
            .get(image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(&local_path, &bytes).await?;
        info!("🖼️ Saved image for article {} to {}", article_id, local_path.display());

        Ok(SavedImage {
            relative_path: format!("images/{}/{}", article_id, final_name),
            local_path,
        })
    }
}

fn ensure_image_extension(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
        name.to_string()
    } else {
        format!("{}.jpg", name)
    }
}

/// Suffix the name with a timestamp when a file with the same name already
/// exists, so regeneration never clobbers an earlier image.
fn unique_filename(dir: &Path, base_name: &str) -> String {
    if !dir.join(base_name).exists() {
        return base_name.to_string();
    }
    let (stem, ext) = match base_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (base_name, "jpg"),
    };
    format!("{}_{}.{}", stem, chrono::Utc::now().timestamp(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_missing_extension() {
        assert_eq!(ensure_image_extension("cover"), "cover.jpg");
        assert_eq!(ensure_image_extension("cover.png"), "cover.png");
        assert_eq!(ensure_image_extension("cover.JPEG"), "cover.JPEG");
    }

    #[test]
    fn suffixes_colliding_filenames() {
        let dir = tempdir().unwrap();
        assert_eq!(unique_filename(dir.path(), "a.jpg"), "a.jpg");

        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let renamed = unique_filename(dir.path(), "a.jpg");
        assert_ne!(renamed, "a.jpg");
        assert!(renamed.starts_with("a_"));
        assert!(renamed.ends_with(".jpg"));
    }
}
