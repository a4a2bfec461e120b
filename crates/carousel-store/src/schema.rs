//! Catalog schema SQL.

/// Items and their tags. One row per (item, tag) in `item_tags` so that
/// "contains all of" becomes a GROUP BY / HAVING over an index.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tagged_items (
    image_path TEXT PRIMARY KEY,
    image_name TEXT NOT NULL,
    folder TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_tags (
    image_path TEXT NOT NULL REFERENCES tagged_items(image_path) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (image_path, tag)
);

CREATE INDEX IF NOT EXISTS idx_tagged_items_folder ON tagged_items(folder);
CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag);
"#;
