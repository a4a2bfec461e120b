//! Carousel Store — the tagged product catalog.
//!
//! Items are written by the offline tagging process (or `carousel import`)
//! and are read-only while serving. Two backends implement [`Catalog`]:
//! a local SQLite file and a PostgREST table.

pub mod catalog;
pub mod rest;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use catalog::Catalog;
pub use rest::RestCatalog;
pub use sqlite::SqliteCatalog;
pub use types::*;
