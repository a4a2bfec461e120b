//! Shared application state.

use std::sync::Arc;

use carousel_core::{CarouselConfig, CatalogBackend, Result, StorageBackend};
use carousel_llm::{HttpTextGenerator, LLMConfig, TextGenerator};
use carousel_select::ProductSelector;
use carousel_storage::{LocalStorage, ObjectStorage, SupabaseStorage};
use carousel_store::{Catalog, RestCatalog, SqliteCatalog};
use tracing::info;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CarouselConfig,
    pub catalog: Arc<dyn Catalog>,
    pub storage: Arc<dyn ObjectStorage>,
    /// Set when images are served by this process (`/files/*`).
    pub local_files: Option<Arc<LocalStorage>>,
    pub llm_config: LLMConfig,
    pub selector: ProductSelector,
}

impl AppState {
    /// Open the configured backends.
    pub fn from_config(config: CarouselConfig) -> Result<Self> {
        let client = reqwest::Client::new();

        let (storage, local_files): (Arc<dyn ObjectStorage>, Option<Arc<LocalStorage>>) =
            match &config.storage {
                StorageBackend::Local {
                    public_url,
                    signing_secret,
                } => {
                    let local = Arc::new(LocalStorage::new(
                        &config.data_paths.storage,
                        public_url,
                        signing_secret,
                    )?);
                    (local.clone(), Some(local))
                }
                StorageBackend::Supabase {
                    url,
                    service_key,
                    bucket,
                } => (
                    Arc::new(SupabaseStorage::new(client.clone(), url, service_key, bucket)),
                    None,
                ),
            };

        let catalog: Arc<dyn Catalog> = match &config.catalog {
            CatalogBackend::Sqlite => Arc::new(SqliteCatalog::open(&config.data_paths.catalog)?),
            CatalogBackend::Rest {
                url,
                service_key,
                table,
            } => Arc::new(RestCatalog::new(client.clone(), url, service_key, table)),
        };

        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);

        Ok(Self::new(config, catalog, storage, local_files, llm_config, client))
    }

    pub fn new(
        config: CarouselConfig,
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn ObjectStorage>,
        local_files: Option<Arc<LocalStorage>>,
        llm_config: LLMConfig,
        client: reqwest::Client,
    ) -> Self {
        let generator = HttpTextGenerator::from_config(client, &llm_config)
            .map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
        if generator.is_none() {
            info!("No LLM provider configured; topics use default criteria");
        }

        let selector = ProductSelector::new(
            catalog.clone(),
            storage.clone(),
            generator,
            config.selection.clone(),
        );

        Self {
            config,
            catalog,
            storage,
            local_files,
            llm_config,
            selector,
        }
    }
}
