//! The catalog collaborator seen by the selection pipeline.

use async_trait::async_trait;
use carousel_core::Result;

use crate::types::{ScoredItem, TagQuery, TaggedItem};

/// Read access to the tagged product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Items whose tags contain every tag in `query.tags`, at most `query.limit` rows.
    async fn find_by_tags(&self, query: &TagQuery) -> Result<Vec<TaggedItem>>;

    /// Items carrying at least one tag in `query.tags`, highest `match_score`
    /// first, at most `query.limit` rows. Empty tags match nothing.
    async fn find_by_any_tag(&self, query: &TagQuery) -> Result<Vec<ScoredItem>>;

    /// Sorted, de-duplicated tags present in the catalog.
    async fn available_tags(&self, folder: Option<&str>) -> Result<Vec<String>>;

    /// Number of catalog items, when the backend can count cheaply.
    async fn count_items(&self) -> Result<Option<i64>> {
        Ok(None)
    }

    /// Backend name for status output.
    fn backend_name(&self) -> &'static str;
}
