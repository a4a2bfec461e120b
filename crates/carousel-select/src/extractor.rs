//! Topic text to criteria bundle, via the text-generation collaborator.
//!
//! Never fails: without a generator, or on any generation or parse error,
//! the default bundle (no constraints, four slots) is returned.

use std::sync::Arc;

use carousel_core::{Error, Result};
use carousel_llm::{strip_code_fences, ChatMessage, CompletionRequest, TextGenerator};
use tracing::{debug, info, warn};

use crate::criteria::CriteriaBundle;
use crate::vocabulary::Vocabulary;

const SYSTEM_PROMPT: &str = "You map skincare carousel topics to product search tags. \
Respond with a single JSON object and nothing else.";

const EXAMPLES: &str = r#"Topic: "Affordable moisturizers for dry skin"
{"productTypes": ["moisturizer"], "benefits": ["hydrating"], "skinTypes": ["dry"], "priceRanges": ["affordable"], "count": 4}

Topic: "Luxury vs drugstore serums that actually work"
{"productTypes": ["serum"], "benefits": [], "skinTypes": [], "priceRanges": ["luxury", "affordable"], "count": 4}

Topic: "3 products I regret buying and 3 I'd repurchase"
{"productTypes": [], "benefits": [], "skinTypes": [], "priceRanges": [], "count": 6, "structure": [
  {"sentiment": "negative"}, {"sentiment": "negative"}, {"sentiment": "negative"},
  {"sentiment": "positive"}, {"sentiment": "positive"}, {"sentiment": "positive"}]}"#;

/// Build the user prompt for `topic`.
pub fn build_prompt(topic: &str) -> String {
    format!(
        "Pick product image search tags for this carousel topic.\n\n\
         Use only these tags:\n{vocabulary}\n\n\
         Return JSON with the keys productTypes, benefits, skinTypes and priceRanges \
         (arrays of tags, empty when the topic does not say), count (number of product \
         images, default 4) and, only when each image needs different criteria, \
         structure: one object per image with optional productType, benefit, skinType, \
         priceRange and sentiment (\"positive\" or \"negative\").\n\n\
         Examples:\n{examples}\n\n\
         Topic: \"{topic}\"",
        vocabulary = Vocabulary::prompt_block(),
        examples = EXAMPLES,
        topic = topic.trim(),
    )
}

/// Parse model output into a bundle. Code fences and text around the
/// outermost JSON object are ignored.
pub fn parse_bundle(text: &str) -> Result<CriteriaBundle> {
    let body = strip_code_fences(text);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(Error::Generation("No JSON object in response".into())),
    };
    Ok(serde_json::from_str(json)?)
}

#[derive(Clone, Default)]
pub struct CriteriaExtractor {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl CriteriaExtractor {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn extract(&self, topic: &str) -> CriteriaBundle {
        let Some(generator) = &self.generator else {
            debug!("No text generator configured, using default criteria");
            return CriteriaBundle::default();
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(topic)),
        ])
        .with_temperature(0.3)
        .with_max_tokens(600);

        let text = match generator.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Criteria extraction failed, using defaults: {}", e);
                return CriteriaBundle::default();
            }
        };

        match parse_bundle(&text) {
            Ok(bundle) => {
                info!(
                    "Extracted criteria: types={:?} benefits={:?} skin={:?} price={:?} count={} structure={}",
                    bundle.product_types,
                    bundle.benefits,
                    bundle.skin_types,
                    bundle.price_ranges,
                    bundle.count,
                    bundle.structure.as_ref().map_or(0, |s| s.len())
                );
                bundle
            }
            Err(e) => {
                warn!("Unparseable criteria response, using defaults: {}", e);
                CriteriaBundle::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(Result<String>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Generation(e.to_string())),
            }
        }
    }

    fn extractor(reply: Result<String>) -> CriteriaExtractor {
        CriteriaExtractor::new(Some(Arc::new(Canned(reply))))
    }

    #[test]
    fn test_prompt_mentions_topic_and_vocabulary() {
        let prompt = build_prompt("  Serums for oily skin ");
        assert!(prompt.ends_with("Topic: \"Serums for oily skin\""));
        assert!(prompt.contains("sebum-control"));
    }

    #[test]
    fn test_parse_fenced_with_chatter() {
        let bundle = parse_bundle(
            "Sure!\n```json\n{\"productTypes\": [\"serum\"], \"count\": 3}\n```",
        )
        .unwrap();
        assert_eq!(bundle.product_types, vec!["serum"]);
        assert_eq!(bundle.count, 3);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_bundle("I can't help with that").is_err());
        assert!(parse_bundle("} {").is_err());
        assert!(parse_bundle("{not json}").is_err());
    }

    #[tokio::test]
    async fn test_extract_success() {
        let bundle = extractor(Ok(r#"{"productTypes":["moisturizer"],"skinTypes":["dry"],"priceRanges":["affordable"],"benefits":["hydrating"],"count":4}"#.into()))
            .extract("Affordable moisturizers for dry skin")
            .await;
        assert_eq!(bundle.product_types, vec!["moisturizer"]);
        assert_eq!(bundle.skin_types, vec!["dry"]);
        assert!(bundle.structure.is_none());
    }

    #[tokio::test]
    async fn test_extract_falls_back_to_default() {
        let failing = extractor(Err(Error::Generation("503".into())));
        assert_eq!(failing.extract("anything").await, CriteriaBundle::default());

        let garbage = extractor(Ok("no json here".into()));
        assert_eq!(garbage.extract("anything").await, CriteriaBundle::default());

        let none = CriteriaExtractor::new(None);
        assert!(!none.has_generator());
        assert_eq!(none.extract("anything").await, CriteriaBundle::default());
    }
}
