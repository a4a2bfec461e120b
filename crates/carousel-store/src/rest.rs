//! PostgREST-backed catalog (the hosted `product_tags` table).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::types::{ScoredItem, TagQuery, TaggedItem};
use carousel_core::{Error, Result};

/// Row shape returned by `GET /rest/v1/<table>`.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    image_path: String,
    image_name: String,
    folder: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<CatalogRow> for TaggedItem {
    fn from(row: CatalogRow) -> Self {
        TaggedItem {
            image_path: row.image_path,
            image_name: row.image_name,
            folder: row.folder,
            tags: row.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsRow {
    #[serde(default)]
    tags: Vec<String>,
}

/// Catalog reached over a PostgREST endpoint.
pub struct RestCatalog {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestCatalog {
    pub fn new(client: Client, base_url: &str, api_key: &str, table: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    async fn get_rows<T: for<'de> Deserialize<'de>>(&self, params: &[(String, String)]) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Catalog request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Catalog(format!("API error {}: {}", status, body)));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| Error::Catalog(format!("Malformed catalog response: {}", e)))
    }
}

fn array_filter(operator: &str, tags: &[String]) -> String {
    let quoted: Vec<String> = tags
        .iter()
        .map(|t| format!("\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{}.{{{}}}", operator, quoted.join(","))
}

/// PostgREST array literal for a `cs.` (contains) filter: `{"a","b"}`.
pub fn contains_filter(tags: &[String]) -> String {
    array_filter("cs", tags)
}

/// PostgREST `ov.` (overlaps) filter.
pub fn overlap_filter(tags: &[String]) -> String {
    array_filter("ov", tags)
}

fn clean_tags(query: &TagQuery) -> Vec<String> {
    query
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Query parameters for a superset tag search.
pub fn search_params(query: &TagQuery) -> Vec<(String, String)> {
    let tags = clean_tags(query);
    let filter = (!tags.is_empty()).then(|| contains_filter(&tags));
    table_params(query, filter)
}

/// Query parameters for an overlap tag search.
pub fn overlap_params(query: &TagQuery) -> Vec<(String, String)> {
    table_params(query, Some(overlap_filter(&clean_tags(query))))
}

fn table_params(query: &TagQuery, tag_filter: Option<String>) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        "image_path,image_name,folder,tags".to_string(),
    )];
    if let Some(filter) = tag_filter {
        params.push(("tags".into(), filter));
    }
    if let Some(folder) = &query.folder {
        params.push(("folder".into(), format!("eq.{}", folder)));
    }
    params.push(("limit".into(), query.limit.to_string()));
    params
}

/// PostgREST cannot order by overlap size, so rows are scored here.
fn score_rows(rows: Vec<CatalogRow>, wanted: &[String]) -> Vec<ScoredItem> {
    let mut scored: Vec<ScoredItem> = rows
        .into_iter()
        .map(TaggedItem::from)
        .map(|item| ScoredItem {
            match_score: item.match_score(wanted),
            item,
        })
        .filter(|s| s.match_score > 0)
        .collect();
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored
}

#[async_trait]
impl Catalog for RestCatalog {
    async fn find_by_tags(&self, query: &TagQuery) -> Result<Vec<TaggedItem>> {
        let rows: Vec<CatalogRow> = self.get_rows(&search_params(query)).await?;
        debug!("REST catalog search {:?}: {} rows", query.tags, rows.len());
        Ok(rows.into_iter().map(TaggedItem::from).collect())
    }

    async fn find_by_any_tag(&self, query: &TagQuery) -> Result<Vec<ScoredItem>> {
        if clean_tags(query).is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<CatalogRow> = self.get_rows(&overlap_params(query)).await?;
        debug!("REST catalog overlap {:?}: {} rows", query.tags, rows.len());
        Ok(score_rows(rows, &query.tags))
    }

    async fn available_tags(&self, folder: Option<&str>) -> Result<Vec<String>> {
        let mut params = vec![("select".to_string(), "tags".to_string())];
        if let Some(folder) = folder {
            params.push(("folder".into(), format!("eq.{}", folder)));
        }
        let rows: Vec<TagsRow> = self.get_rows(&params).await?;

        let mut tags: Vec<String> = rows.into_iter().flat_map(|r| r.tags).collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}
