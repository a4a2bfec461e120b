//! Carousel Select — picks product images for a carousel.
//!
//! A topic becomes a [`CriteriaBundle`] (via the text generator), each slot
//! is filled by tag search with relaxation and a fallback folder, results
//! are diversified by filename prefix, and every pick is unique within a
//! request. Free-text prompts can also be matched to images by partial tag
//! overlap ([`SmartMatcher`]).

pub mod criteria;
pub mod extractor;
pub mod orchestrator;
pub mod resolver;
pub mod search;
pub mod shuffle;
pub mod smart;
pub mod types;
pub mod vocabulary;

pub use criteria::{
    plan_attempts, CriteriaBundle, RelaxationStep, SearchCriteria, Sentiment, RELAXATION_STEPS,
};
pub use extractor::CriteriaExtractor;
pub use orchestrator::ProductSelector;
pub use resolver::UrlResolver;
pub use search::TagSearchEngine;
pub use shuffle::{diversify, name_prefix, Shuffler};
pub use smart::{keyword_match, SmartMatcher};
pub use types::*;
pub use vocabulary::{Dimension, Vocabulary};
