//! Storage trait and shared helpers.

use std::time::Duration;

use async_trait::async_trait;
use carousel_core::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder object used to keep otherwise-empty folders alive.
pub const KEEP_FILE: &str = "__keep.txt";

static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp|gif)$").unwrap());

/// An object listed from a storage folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Filename within the folder.
    pub name: String,
}

/// Object storage collaborator.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List objects directly inside `folder`, at most `limit` entries.
    async fn list(&self, folder: &str, limit: usize) -> Result<Vec<StoredObject>>;

    /// Create a URL for `path` that stops working after `ttl`.
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String>;

    /// Backend name for status output.
    fn backend_name(&self) -> &'static str;
}

/// Image files only; the keep-file placeholder is never an image.
pub fn is_image_file(name: &str) -> bool {
    name != KEEP_FILE && IMAGE_EXT.is_match(name)
}

/// Storage path for a file in a folder.
pub fn object_path(folder: &str, name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), name)
}

/// List the image files in a folder.
pub async fn list_images(
    storage: &dyn ObjectStorage,
    folder: &str,
    limit: usize,
) -> Result<Vec<StoredObject>> {
    let objects = storage.list(folder, limit).await?;
    Ok(objects.into_iter().filter(|o| is_image_file(&o.name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_filter() {
        assert!(is_image_file("IMG_1001.jpg"));
        assert!(is_image_file("photo.JPEG"));
        assert!(is_image_file("a.Png"));
        assert!(is_image_file("b.webp"));
        assert!(is_image_file("c.gif"));
        assert!(!is_image_file(KEEP_FILE));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("jpg"));
        assert!(!is_image_file("archive.jpg.zip"));
    }

    #[test]
    fn test_object_path() {
        assert_eq!(object_path("upskin_products", "a.jpg"), "upskin_products/a.jpg");
        assert_eq!(object_path("upskin_products/", "a.jpg"), "upskin_products/a.jpg");
    }
}
