//! Free-text prompt to image by partial tag overlap.
//!
//! Each prompt is reduced to a few catalog tags (by the text generator when
//! one is configured, else by substring match against the catalog's own
//! tags). Catalog items are scored by how many of those tags they carry and
//! one of the best-scoring unused items is picked at random.

use std::collections::HashSet;
use std::sync::Arc;

use carousel_llm::{ChatMessage, CompletionRequest, TextGenerator};
use carousel_store::{Catalog, ScoredItem, TagQuery};
use tracing::{debug, warn};

use crate::shuffle::Shuffler;

/// Tags kept per prompt.
pub const MAX_KEYWORDS: usize = 3;

/// Catalog tags that occur in `text`, or the first tags of the catalog when
/// none do.
pub fn keyword_match(text: &str, available: &[String]) -> Vec<String> {
    let lower = text.to_lowercase();
    let hits: Vec<String> = available
        .iter()
        .filter(|tag| lower.contains(tag.as_str()))
        .take(MAX_KEYWORDS)
        .cloned()
        .collect();
    if hits.is_empty() {
        available.iter().take(MAX_KEYWORDS).cloned().collect()
    } else {
        hits
    }
}

/// Comma-separated model output to known tags, in answer order.
pub fn parse_keywords(text: &str, available: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for part in text.trim().to_lowercase().split(',') {
        let tag = part.trim().trim_matches(&['"', '\'', '.'][..]).trim();
        if tag.is_empty() || keywords.iter().any(|k| k == tag) {
            continue;
        }
        if available.iter().any(|a| a == tag) {
            keywords.push(tag.to_string());
        }
    }
    keywords
}

pub fn keyword_prompt(text: &str, available: &[String]) -> String {
    format!(
        "From the following list of available image tags, select 2-3 tags that best match \
         the content of this text:\n\n\
         Available tags: {tags}\n\n\
         Text: \"{text}\"\n\n\
         Choose tags that represent the main objects, locations, or activities mentioned in \
         the text.\n\n\
         Return ONLY 2-3 tags as a comma-separated list (must be from the available tags \
         list above).\n\
         Example: \"shower, bathroom, water\"",
        tags = available.join(", "),
        text = text.trim(),
    )
}

pub struct SmartMatcher {
    catalog: Arc<dyn Catalog>,
    generator: Option<Arc<dyn TextGenerator>>,
    shuffler: Arc<Shuffler>,
    limit: usize,
}

impl SmartMatcher {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        generator: Option<Arc<dyn TextGenerator>>,
        shuffler: Arc<Shuffler>,
        limit: usize,
    ) -> Self {
        Self {
            catalog,
            generator,
            shuffler,
            limit,
        }
    }

    /// Tags present in `folder`; empty when the catalog cannot be read.
    pub async fn available_tags(&self, folder: &str) -> Vec<String> {
        match self.catalog.available_tags(Some(folder)).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Listing tags for {} failed: {}", folder, e);
                Vec::new()
            }
        }
    }

    /// Up to [`MAX_KEYWORDS`] catalog tags for `text`.
    pub async fn keywords_for(&self, text: &str, available: &[String]) -> Vec<String> {
        if available.is_empty() {
            return Vec::new();
        }
        let Some(generator) = &self.generator else {
            return keyword_match(text, available);
        };

        let request = CompletionRequest::new(vec![ChatMessage::user(keyword_prompt(
            text, available,
        ))])
        .with_temperature(0.3)
        .with_max_tokens(50);

        match generator.complete(request).await {
            Ok(answer) => {
                let mut keywords = parse_keywords(&answer, available);
                if keywords.is_empty() {
                    debug!("No known tags in \"{}\", using keyword match", answer.trim());
                    return keyword_match(text, available);
                }
                keywords.truncate(MAX_KEYWORDS);
                keywords
            }
            Err(e) => {
                warn!("Keyword extraction failed, using keyword match: {}", e);
                keyword_match(text, available)
            }
        }
    }

    /// A random pick among the unused items with the highest score.
    pub async fn best_match(
        &self,
        keywords: &[String],
        folder: &str,
        exclude: &HashSet<String>,
    ) -> Option<ScoredItem> {
        if keywords.is_empty() {
            return None;
        }
        let query = TagQuery::new(keywords.to_vec(), self.limit).in_folder(Some(folder.to_string()));
        let found = match self.catalog.find_by_any_tag(&query).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Overlap search for [{}] failed: {}", keywords.join(", "), e);
                return None;
            }
        };

        let unused: Vec<ScoredItem> = found
            .into_iter()
            .filter(|s| !exclude.contains(&s.item.image_path))
            .map(|mut s| {
                s.match_score = s.item.match_score(keywords);
                s
            })
            .filter(|s| s.match_score > 0)
            .collect();
        let top = unused.iter().map(|s| s.match_score).max()?;
        let best: Vec<ScoredItem> = unused.into_iter().filter(|s| s.match_score == top).collect();

        debug!(
            "Tags [{}]: {} items with score {}",
            keywords.join(", "),
            best.len(),
            top
        );
        self.shuffler
            .diversify(best, |s| s.item.image_name.as_str())
            .into_iter()
            .next()
    }
}
