//! Tag search over the catalog.

use std::collections::HashSet;
use std::sync::Arc;

use carousel_store::{Catalog, TagQuery, TaggedItem};
use tracing::{debug, warn};

use crate::criteria::SearchCriteria;
use crate::shuffle::Shuffler;

pub struct TagSearchEngine {
    catalog: Arc<dyn Catalog>,
    shuffler: Arc<Shuffler>,
    limit: usize,
    folder: Option<String>,
}

impl TagSearchEngine {
    pub fn new(catalog: Arc<dyn Catalog>, shuffler: Arc<Shuffler>, limit: usize) -> Self {
        Self {
            catalog,
            shuffler,
            limit,
            folder: None,
        }
    }

    /// Only search items in `folder`.
    pub fn in_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder;
        self
    }

    /// Every unused item whose tags are a superset of the criteria's tags,
    /// diversified. Catalog failures are logged and yield no matches.
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        exclude: &HashSet<String>,
    ) -> Vec<TaggedItem> {
        let tags = criteria.tags();
        let query = TagQuery::new(tags.clone(), self.limit).in_folder(self.folder.clone());

        let found = match self.catalog.find_by_tags(&query).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Tag search for [{}] failed: {}", tags.join(", "), e);
                return Vec::new();
            }
        };

        let fetched = found.len();
        let candidates: Vec<TaggedItem> = found
            .into_iter()
            .filter(|item| item.has_all_tags(&tags) && !exclude.contains(&item.image_path))
            .collect();

        debug!(
            "Tags [{}]: {} matches, {} unused",
            tags.join(", "),
            fetched,
            candidates.len()
        );

        self.shuffler
            .diversify(candidates, |item| item.image_name.as_str())
    }
}
