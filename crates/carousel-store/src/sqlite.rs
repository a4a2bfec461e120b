//! SQLite-backed tagged catalog.
//!
//! Same table shape as the hosted `product_tags` table, with tags
//! normalized into `item_tags` so superset matching stays index-driven.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use carousel_core::{Error, Result};

/// Tagged catalog stored in a local SQLite file.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCatalog {
    /// Open or create the catalog.
    ///
    /// `db_dir` is the directory (e.g., `data/catalog/`). The file will be `db_dir/catalog.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("catalog.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let catalog = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteCatalog initialized: {} items, path={}",
            catalog.count()?,
            catalog.db_path.display()
        );

        Ok(catalog)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // Writes (import / offline tagging only)
    // ---------------------------------------------------------------

    /// Insert or replace an item, keyed on `image_path`.
    pub fn upsert_item(&self, item: &TaggedItem) -> Result<()> {
        if item.image_path.trim().is_empty() {
            return Err(Error::Catalog("image_path must not be empty".into()));
        }
        let now = chrono::Utc::now().timestamp_millis();

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        tx.execute(
            "INSERT INTO tagged_items (image_path, image_name, folder, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT(image_path) DO UPDATE SET \
             image_name = excluded.image_name, folder = excluded.folder, updated_at = excluded.updated_at",
            params![item.image_path, item.image_name, item.folder, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        tx.execute(
            "DELETE FROM item_tags WHERE image_path = ?1",
            params![item.image_path],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        for (position, tag) in item.tags.iter().enumerate() {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO item_tags (image_path, tag, position) VALUES (?1, ?2, ?3)",
                params![item.image_path, tag, position as i64],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Upsert a batch of items, collecting per-item failures.
    pub fn import_items(&self, items: &[TaggedItem]) -> ImportReport {
        let mut report = ImportReport::default();
        for item in items {
            match self.upsert_item(item) {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    warn!("Failed to import {}: {}", item.image_path, e);
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", item.image_path, e));
                }
            }
        }
        info!(
            "Catalog import: {} upserted, {} failed",
            report.upserted, report.failed
        );
        report
    }

    /// Import a JSON array of `{imagePath, imageName, folder, tags}` objects.
    pub fn import_json_file(&self, path: &Path) -> Result<ImportReport> {
        let data = std::fs::read_to_string(path)?;
        let items: Vec<TaggedItem> = serde_json::from_str(&data)?;
        Ok(self.import_items(&items))
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Get one item by storage path.
    pub fn get_item(&self, image_path: &str) -> Result<Option<TaggedItem>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT image_path, image_name, folder FROM tagged_items WHERE image_path = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![image_path], |row| {
                Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some((image_path, image_name, folder)) => {
                let tags = Self::tags_for(&conn, &image_path)?;
                Ok(Some(TaggedItem {
                    image_path,
                    image_name,
                    folder,
                    tags,
                }))
            }
            None => Ok(None),
        }
    }

    /// Superset tag search: items carrying every tag in `query.tags`.
    pub fn search_tags(&self, query: &TagQuery) -> Result<Vec<TaggedItem>> {
        let mut required: Vec<&str> = query
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        required.sort_unstable();
        required.dedup();

        let folder = match &query.folder {
            Some(f) => Value::Text(f.clone()),
            None => Value::Null,
        };

        let (sql, values) = if required.is_empty() {
            (
                "SELECT image_path, image_name, folder FROM tagged_items \
                 WHERE (?1 IS NULL OR folder = ?1) ORDER BY RANDOM() LIMIT ?2"
                    .to_string(),
                vec![folder, Value::Integer(query.limit as i64)],
            )
        } else {
            let placeholders: Vec<String> =
                (0..required.len()).map(|i| format!("?{}", i + 3)).collect();
            let limit_idx = required.len() + 3;
            let sql = format!(
                "SELECT i.image_path, i.image_name, i.folder FROM tagged_items i \
                 JOIN item_tags t ON t.image_path = i.image_path \
                 WHERE t.tag IN ({}) AND (?1 IS NULL OR i.folder = ?1) \
                 GROUP BY i.image_path \
                 HAVING COUNT(DISTINCT t.tag) = ?2 \
                 ORDER BY RANDOM() LIMIT ?{}",
                placeholders.join(", "),
                limit_idx
            );
            let mut values = vec![folder, Value::Integer(required.len() as i64)];
            values.extend(required.iter().map(|t| Value::Text(t.to_string())));
            values.push(Value::Integer(query.limit as i64));
            (sql, values)
        };

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let mut items = Vec::with_capacity(rows.len());
        for (image_path, image_name, folder) in rows {
            let tags = Self::tags_for(&conn, &image_path)?;
            items.push(TaggedItem {
                image_path,
                image_name,
                folder,
                tags,
            });
        }

        debug!(
            "Catalog search [{}] folder={:?}: {} items",
            required.join(", "),
            query.folder,
            items.len()
        );
        Ok(items)
    }

    /// Overlap tag search: items carrying any tag in `query.tags`, scored by
    /// how many they carry, best first. Ties come back in random order.
    pub fn search_overlap(&self, query: &TagQuery) -> Result<Vec<ScoredItem>> {
        let mut wanted: Vec<&str> = query
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (0..wanted.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "SELECT i.image_path, i.image_name, i.folder, COUNT(DISTINCT t.tag) AS score \
             FROM tagged_items i JOIN item_tags t ON t.image_path = i.image_path \
             WHERE t.tag IN ({}) AND (?1 IS NULL OR i.folder = ?1) \
             GROUP BY i.image_path \
             ORDER BY score DESC, RANDOM() LIMIT ?{}",
            placeholders.join(", "),
            wanted.len() + 2
        );
        let mut values = vec![match &query.folder {
            Some(f) => Value::Text(f.clone()),
            None => Value::Null,
        }];
        values.extend(wanted.iter().map(|t| Value::Text(t.to_string())));
        values.push(Value::Integer(query.limit as i64));

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows: Vec<(String, String, String, i64)> = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let mut scored = Vec::with_capacity(rows.len());
        for (image_path, image_name, folder, score) in rows {
            let tags = Self::tags_for(&conn, &image_path)?;
            scored.push(ScoredItem {
                item: TaggedItem {
                    image_path,
                    image_name,
                    folder,
                    tags,
                },
                match_score: score.max(0) as usize,
            });
        }

        debug!(
            "Catalog overlap [{}] folder={:?}: {} items",
            wanted.join(", "),
            query.folder,
            scored.len()
        );
        Ok(scored)
    }

    /// All distinct tags, optionally restricted to one folder.
    pub fn list_tags(&self, folder: Option<&str>) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT t.tag FROM item_tags t \
                 JOIN tagged_items i ON i.image_path = t.image_path \
                 WHERE (?1 IS NULL OR i.folder = ?1) ORDER BY t.tag",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![folder], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count catalog items.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM tagged_items", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn tags_for(conn: &Connection, image_path: &str) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare_cached("SELECT tag FROM item_tags WHERE image_path = ?1 ORDER BY position")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![image_path], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn find_by_tags(&self, query: &TagQuery) -> Result<Vec<TaggedItem>> {
        self.search_tags(query)
    }

    async fn find_by_any_tag(&self, query: &TagQuery) -> Result<Vec<ScoredItem>> {
        self.search_overlap(query)
    }

    async fn available_tags(&self, folder: Option<&str>) -> Result<Vec<String>> {
        self.list_tags(folder)
    }

    async fn count_items(&self) -> Result<Option<i64>> {
        self.count().map(Some)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
