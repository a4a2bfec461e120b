use std::sync::Arc;
use std::time::Duration;

use carousel_core::Result;
use carousel_storage::ObjectStorage;

/// Turns storage paths into time-limited URLs. No caching, no retry.
pub struct UrlResolver {
    storage: Arc<dyn ObjectStorage>,
    ttl: Duration,
}

impl UrlResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    pub async fn resolve(&self, image_path: &str) -> Result<String> {
        self.storage.create_signed_url(image_path, self.ttl).await
    }
}
