//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BUCKET: &str = "files";
pub const DEFAULT_CATALOG_TABLE: &str = "product_tags";
pub const DEFAULT_FALLBACK_FOLDER: &str = "upskin_products";
pub const DEFAULT_FIRST_PAGE_FOLDER: &str = "upskin_firstpage_products";

/// Paths to all Carousel data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite catalog directory (`data/catalog/`).
    pub catalog: PathBuf,
    /// Local object storage root (`data/storage/`), one subdirectory per folder.
    pub storage: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            catalog: root.join("catalog"),
            storage: root.join("storage"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.catalog)?;
        std::fs::create_dir_all(&self.storage)?;
        Ok(())
    }
}

/// Where stock images live and how signed URLs are produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under `DataPaths::storage`, served by this process at `/files/*`.
    Local {
        public_url: String,
        #[serde(skip_serializing)]
        signing_secret: String,
    },
    /// Supabase storage bucket.
    Supabase {
        url: String,
        #[serde(skip_serializing)]
        service_key: String,
        bucket: String,
    },
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Local { .. } => "local",
            StorageBackend::Supabase { .. } => "supabase",
        }
    }
}

/// Where the tagged product catalog lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogBackend {
    /// SQLite database under `DataPaths::catalog`.
    Sqlite,
    /// PostgREST table (Supabase `rest/v1`).
    Rest {
        url: String,
        #[serde(skip_serializing)]
        service_key: String,
        table: String,
    },
}

impl CatalogBackend {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogBackend::Sqlite => "sqlite",
            CatalogBackend::Rest { .. } => "rest",
        }
    }
}

/// Knobs for the product selection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Folder used for random picks when no tagged item matches.
    pub fallback_folder: String,
    /// Folder used for title-page images.
    pub first_page_folder: String,
    /// Restrict catalog searches to one folder (`None` searches everything).
    pub catalog_folder: Option<String>,
    /// Maximum rows pulled from the catalog per tag search.
    pub search_limit: usize,
    /// Maximum objects listed from the fallback folder.
    pub fallback_list_limit: usize,
    /// Lifetime of signed image URLs, in seconds.
    pub signed_url_ttl_secs: u64,
    /// Slot count used when the criteria bundle does not provide one.
    pub default_count: usize,
    /// Upper bound on a requested image count. A structure is never capped.
    pub max_count: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            fallback_folder: DEFAULT_FALLBACK_FOLDER.into(),
            first_page_folder: DEFAULT_FIRST_PAGE_FOLDER.into(),
            catalog_folder: None,
            search_limit: 1000,
            fallback_list_limit: 2000,
            signed_url_ttl_secs: 60 * 15,
            default_count: 4,
            max_count: 12,
        }
    }
}

impl SelectionSettings {
    /// Apply `CAROUSEL_*` environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(folder) = std::env::var("CAROUSEL_FALLBACK_FOLDER") {
            settings.fallback_folder = folder;
        }
        if let Ok(folder) = std::env::var("CAROUSEL_FIRST_PAGE_FOLDER") {
            settings.first_page_folder = folder;
        }
        settings.catalog_folder = std::env::var("CAROUSEL_CATALOG_FOLDER")
            .ok()
            .filter(|f| !f.trim().is_empty());
        if let Some(limit) = env_parse("CAROUSEL_SEARCH_LIMIT") {
            settings.search_limit = limit;
        }
        if let Some(ttl) = env_parse("CAROUSEL_URL_TTL_SECS") {
            settings.signed_url_ttl_secs = ttl;
        }
        settings
    }
}

/// Top-level Carousel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    pub storage: StorageBackend,
    pub catalog: CatalogBackend,
    pub selection: SelectionSettings,
}

impl CarouselConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        let data_paths = DataPaths::new(data_dir)?;

        let supabase = match (
            non_empty_env("SUPABASE_URL"),
            non_empty_env("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Some(url), Some(key)) => Some((url.trim_end_matches('/').to_string(), key)),
            _ => None,
        };

        let (storage, catalog) = match supabase {
            Some((url, key)) => (
                StorageBackend::Supabase {
                    url: url.clone(),
                    service_key: key.clone(),
                    bucket: non_empty_env("BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.into()),
                },
                CatalogBackend::Rest {
                    url,
                    service_key: key,
                    table: non_empty_env("CAROUSEL_CATALOG_TABLE")
                        .unwrap_or_else(|| DEFAULT_CATALOG_TABLE.into()),
                },
            ),
            None => (
                StorageBackend::Local {
                    public_url: non_empty_env("CAROUSEL_PUBLIC_URL")
                        .map(|u| u.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| format!("http://localhost:{}", port)),
                    signing_secret: non_empty_env("CAROUSEL_SIGNING_SECRET").unwrap_or_else(|| {
                        tracing::warn!(
                            "CAROUSEL_SIGNING_SECRET not set; signed URLs will not survive a restart"
                        );
                        uuid::Uuid::new_v4().simple().to_string()
                    }),
                },
                CatalogBackend::Sqlite,
            ),
        };

        Ok(Self {
            port,
            data_paths,
            storage,
            catalog,
            selection: SelectionSettings::from_env(),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        assert!(paths.catalog.is_dir());
        assert!(paths.storage.is_dir());
        assert_eq!(paths.llm_config_file, dir.path().join("data/llm-config.json"));
    }

    #[test]
    fn test_selection_defaults() {
        let settings = SelectionSettings::default();
        assert_eq!(settings.fallback_folder, "upskin_products");
        assert_eq!(settings.search_limit, 1000);
        assert_eq!(settings.fallback_list_limit, 2000);
        assert_eq!(settings.signed_url_ttl_secs, 900);
        assert_eq!(settings.default_count, 4);
        assert!(settings.catalog_folder.is_none());
    }

    #[test]
    fn test_backend_secrets_not_serialized() {
        let backend = StorageBackend::Supabase {
            url: "https://example.supabase.co".into(),
            service_key: "secret-key".into(),
            bucket: "files".into(),
        };
        let json = serde_json::to_string(&backend).unwrap();
        assert!(json.contains("\"kind\":\"supabase\""));
        assert!(!json.contains("secret-key"));
        assert_eq!(backend.name(), "supabase");
    }
}
