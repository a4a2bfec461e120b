//! Carousel Core — shared error type, configuration and data directories.

pub mod config;
pub mod error;

pub use config::{CarouselConfig, CatalogBackend, DataPaths, SelectionSettings, StorageBackend};
pub use error::{Error, Result};
