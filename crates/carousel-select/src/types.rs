//! Selection output types.

use serde::{Deserialize, Serialize};

use crate::criteria::Sentiment;

pub const PRODUCT_KIND: &str = "product";

/// One filled slot, in the shape the carousel pages consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    /// Signed URL.
    pub url: String,
    /// Filename.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl SelectionResult {
    pub fn product(url: String, name: String, image_path: String, sentiment: Option<Sentiment>) -> Self {
        Self {
            url,
            name,
            kind: PRODUCT_KIND.to_string(),
            image_path,
            sentiment,
        }
    }
}

/// One prompt-matched image. A `match_score` of 0 marks a random pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartImage {
    pub url: String,
    pub name: String,
    pub image_path: String,
    /// Catalog tags chosen for the prompt.
    pub keywords: Vec<String>,
    pub match_score: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let result = SelectionResult::product(
            "https://x/a.jpg?token=t".into(),
            "a.jpg".into(),
            "upskin_products/a.jpg".into(),
            Some(Sentiment::Positive),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["imagePath"], "upskin_products/a.jpg");
        assert_eq!(json["sentiment"], "positive");

        let plain = SelectionResult { sentiment: None, ..result };
        assert!(serde_json::to_value(&plain).unwrap().get("sentiment").is_none());
    }
}
