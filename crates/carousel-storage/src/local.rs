//! Filesystem storage with self-verified signed URLs.
//!
//! Folders are subdirectories of the storage root. Signed URLs point at this
//! server's `/files/*` route and carry an expiry plus an HMAC-SHA256 token.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::storage::{ObjectStorage, StoredObject};
use carousel_core::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub struct LocalStorage {
    root: PathBuf,
    public_url: String,
    /// Keyed with the signing secret; cloned per token.
    mac: HmacSha256,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>, public_url: &str, secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("URL signing secret is empty".into()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid URL signing secret: {}", e)))?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
            mac,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path onto the filesystem. Rejects anything that could
    /// escape the root (`..`, absolute paths, prefixes).
    pub fn resolve_path(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        (depth > 0).then_some(resolved)
    }

    fn keyed(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Token for `path` valid until `expires` (unix seconds).
    pub fn sign(&self, path: &str, expires: i64) -> String {
        hex::encode(self.keyed(path, expires).finalize().into_bytes())
    }

    /// Check a token presented at `now` (unix seconds).
    pub fn verify(&self, path: &str, expires: i64, token: &str, now: i64) -> bool {
        if now > expires {
            return false;
        }
        match hex::decode(token) {
            Ok(bytes) => self.keyed(path, expires).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    /// Signed URL for `path` that expires at `expires`.
    pub fn signed_url_at(&self, path: &str, expires: i64) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/files/{}?expires={}&token={}",
            self.public_url,
            encoded.join("/"),
            expires,
            self.sign(path, expires)
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn list(&self, folder: &str, limit: usize) -> Result<Vec<StoredObject>> {
        let dir = self
            .resolve_path(folder)
            .ok_or_else(|| Error::Storage(format!("Invalid folder: {}", folder)))?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to list files in {}: {}",
                    folder, e
                )))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        names.truncate(limit);
        debug!("Listed {} objects in {}", names.len(), folder);
        Ok(names.into_iter().map(|name| StoredObject { name }).collect())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let file = self
            .resolve_path(path)
            .ok_or_else(|| Error::Storage(format!("Invalid path: {}", path)))?;
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(Error::Storage(format!(
                    "Failed to create signed URL for {}",
                    path
                )))
            }
        }

        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(self.signed_url_at(path, expires))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::list_images;

    fn storage_with_files(files: &[&str]) -> (LocalStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"img").unwrap();
        }
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/", "secret").unwrap();
        (storage, dir)
    }

    #[test]
    fn test_resolve_path_rejects_escape() {
        let (storage, _dir) = storage_with_files(&[]);
        assert!(storage.resolve_path("../etc/passwd").is_none());
        assert!(storage.resolve_path("/etc/passwd").is_none());
        assert!(storage.resolve_path("a/../../b").is_none());
        assert!(storage.resolve_path("").is_none());
        assert_eq!(
            storage.resolve_path("folder/a.jpg").unwrap(),
            storage.root().join("folder").join("a.jpg")
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let (storage, _dir) = storage_with_files(&[]);
        let token = storage.sign("f/a.jpg", 1_000);
        assert!(storage.verify("f/a.jpg", 1_000, &token, 999));
        assert!(storage.verify("f/a.jpg", 1_000, &token, 1_000));
        assert!(!storage.verify("f/a.jpg", 1_000, &token, 1_001));
        assert!(!storage.verify("f/b.jpg", 1_000, &token, 999));
        assert!(!storage.verify("f/a.jpg", 2_000, &token, 999));
        assert!(!storage.verify("f/a.jpg", 1_000, "short", 999));
        assert!(!storage.verify("f/a.jpg", 1_000, &token[..token.len() - 2], 999));

        let other = LocalStorage::new(storage.root(), "http://x", "other-secret").unwrap();
        assert!(!other.verify("f/a.jpg", 1_000, &token, 999));
    }

    #[test]
    fn test_token_is_hmac_sha256() {
        let (storage, _dir) = storage_with_files(&[]);
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"f/a.jpg\n1000");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(storage.sign("f/a.jpg", 1_000), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LocalStorage::new(dir.path(), "http://x", ""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_signed_url_shape() {
        let (storage, _dir) = storage_with_files(&[]);
        let url = storage.signed_url_at("my folder/a b.jpg", 42);
        assert!(url.starts_with("http://localhost:3000/files/my%20folder/a%20b.jpg?expires=42&token="));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let (storage, _dir) =
            storage_with_files(&["p/b.jpg", "p/a.png", "p/__keep.txt", "p/nested/c.jpg"]);
        let all = storage.list("p", 100).await.unwrap();
        let names: Vec<&str> = all.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["__keep.txt", "a.png", "b.jpg"]);

        let images = list_images(&storage, "p", 100).await.unwrap();
        assert_eq!(images.len(), 2);

        let limited = storage.list("p", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_list_missing_folder_is_empty() {
        let (storage, _dir) = storage_with_files(&[]);
        assert!(storage.list("nothing-here", 10).await.unwrap().is_empty());
        assert!(storage.list("../up", 10).await.is_err());
    }

    #[tokio::test]
    async fn test_create_signed_url() {
        let (storage, _dir) = storage_with_files(&["p/a.jpg"]);
        let url = storage
            .create_signed_url("p/a.jpg", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.contains("/files/p/a.jpg?expires="));
        assert!(storage
            .create_signed_url("p/missing.jpg", Duration::from_secs(900))
            .await
            .is_err());
    }
}
