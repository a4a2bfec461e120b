//! Catalog data types.

use serde::{Deserialize, Serialize};

/// One catalog entry: a stored product image and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedItem {
    /// Storage location (`folder/filename`), unique.
    pub image_path: String,
    /// Display filename.
    pub image_name: String,
    pub folder: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaggedItem {
    /// Build an item from a folder and filename.
    pub fn new(folder: &str, image_name: &str, tags: &[&str]) -> Self {
        Self {
            image_path: format!("{}/{}", folder, image_name),
            image_name: image_name.to_string(),
            folder: folder.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// True when every tag in `required` is present on this item.
    pub fn has_all_tags(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.tags.iter().any(|t| t == r))
    }

    /// How many distinct tags of `wanted` this item carries.
    pub fn match_score(&self, wanted: &[String]) -> usize {
        let mut hits: Vec<&String> = wanted
            .iter()
            .filter(|w| self.tags.iter().any(|t| t == *w))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.len()
    }
}

/// A catalog item with the number of query tags it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: TaggedItem,
    pub match_score: usize,
}

/// A tag query: "contains all of" for [`Catalog::find_by_tags`], "any of"
/// for [`Catalog::find_by_any_tag`].
///
/// [`Catalog::find_by_tags`]: crate::Catalog::find_by_tags
/// [`Catalog::find_by_any_tag`]: crate::Catalog::find_by_any_tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Query tags. Empty matches every item in a superset search and
    /// nothing in an overlap search.
    pub tags: Vec<String>,
    /// Restrict to one folder.
    pub folder: Option<String>,
    /// Row cap.
    pub limit: usize,
}

impl TagQuery {
    pub fn new(tags: Vec<String>, limit: usize) -> Self {
        Self {
            tags,
            folder: None,
            limit,
        }
    }

    pub fn in_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder;
        self
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub upserted: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}
