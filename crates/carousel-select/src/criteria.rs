//! Search criteria, the per-request criteria bundle, and the relaxation plan.
//!
//! Values come from model output, so deserialization is lenient: blank or
//! non-string values count as unset instead of failing the whole bundle.

use serde::{Deserialize, Deserializer, Serialize};

use crate::vocabulary::Dimension;

/// Tone carried through for downstream copy; never used for tag matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
        }
    }
}

/// At most one value per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub benefit: Option<String>,
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub skin_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_sentiment", skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl SearchCriteria {
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::ProductType => self.product_type.as_deref(),
            Dimension::Benefit => self.benefit.as_deref(),
            Dimension::SkinType => self.skin_type.as_deref(),
            Dimension::PriceRange => self.price_range.as_deref(),
        }
    }

    fn slot_mut(&mut self, dimension: Dimension) -> &mut Option<String> {
        match dimension {
            Dimension::ProductType => &mut self.product_type,
            Dimension::Benefit => &mut self.benefit,
            Dimension::SkinType => &mut self.skin_type,
            Dimension::PriceRange => &mut self.price_range,
        }
    }

    pub fn set(mut self, dimension: Dimension, value: &str) -> Self {
        *self.slot_mut(dimension) = Some(value.to_string());
        self
    }

    pub fn has(&self, dimension: Dimension) -> bool {
        self.get(dimension).is_some()
    }

    /// Tags an item must carry to match, in dimension order.
    pub fn tags(&self) -> Vec<String> {
        Dimension::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(str::to_string))
            .collect()
    }

    /// Number of tag dimensions set. Sentiment does not count.
    pub fn dimension_count(&self) -> usize {
        Dimension::ALL.into_iter().filter(|d| self.has(*d)).count()
    }

    /// Copy with the given dimensions cleared.
    pub fn without(&self, dimensions: &[Dimension]) -> Self {
        let mut relaxed = self.clone();
        for d in dimensions {
            *relaxed.slot_mut(*d) = None;
        }
        relaxed
    }

    /// Same tag constraints, ignoring sentiment.
    fn same_tags(&self, other: &SearchCriteria) -> bool {
        Dimension::ALL.into_iter().all(|d| self.get(d) == other.get(d))
    }
}

/// One step of the relaxation plan.
#[derive(Debug, Clone, Copy)]
pub struct RelaxationStep {
    /// Dimensions removed from the original criteria.
    pub drop: &'static [Dimension],
    /// The step only runs when this dimension was set originally.
    pub requires: Option<Dimension>,
}

/// Relaxation order after the exact search. Product type and price range
/// are never dropped.
pub const RELAXATION_STEPS: &[RelaxationStep] = &[
    RelaxationStep {
        drop: &[Dimension::Benefit],
        requires: None,
    },
    RelaxationStep {
        drop: &[Dimension::SkinType, Dimension::Benefit],
        requires: Some(Dimension::SkinType),
    },
];

/// Ordered search attempts for one slot: the exact criteria first, then each
/// applicable relaxation. Relaxation needs more than one dimension set, and
/// attempts identical to an earlier one are skipped.
pub fn plan_attempts(criteria: &SearchCriteria) -> Vec<SearchCriteria> {
    let mut attempts = vec![criteria.clone()];
    if criteria.dimension_count() <= 1 {
        return attempts;
    }

    for step in RELAXATION_STEPS {
        if let Some(required) = step.requires {
            if !criteria.has(required) {
                continue;
            }
        }
        let relaxed = criteria.without(step.drop);
        if attempts.iter().any(|a| a.same_tags(&relaxed)) {
            continue;
        }
        attempts.push(relaxed);
    }
    attempts
}

pub const DEFAULT_COUNT: usize = 4;

/// Criteria for a whole request, as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaBundle {
    #[serde(default, deserialize_with = "lenient_list")]
    pub product_types: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub benefits: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub skin_types: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub price_ranges: Vec<String>,
    #[serde(default = "default_count", deserialize_with = "lenient_count")]
    pub count: usize,
    /// Explicit per-slot criteria; its length is the slot count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Vec<SearchCriteria>>,
}

fn default_count() -> usize {
    DEFAULT_COUNT
}

impl Default for CriteriaBundle {
    fn default() -> Self {
        Self {
            product_types: Vec::new(),
            benefits: Vec::new(),
            skin_types: Vec::new(),
            price_ranges: Vec::new(),
            count: DEFAULT_COUNT,
            structure: None,
        }
    }
}

impl CriteriaBundle {
    /// Bundle with no tag constraints and `count` slots.
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Bundle that uses `structure` verbatim.
    pub fn from_structure(structure: Vec<SearchCriteria>) -> Self {
        Self {
            count: structure.len(),
            structure: Some(structure),
            ..Self::default()
        }
    }

    fn explicit_structure(&self) -> Option<&[SearchCriteria]> {
        self.structure.as_deref().filter(|s| !s.is_empty())
    }

    /// Number of slots to fill. A non-empty structure decides as-is;
    /// otherwise `count`, with 0 meaning `default`, capped at `max`.
    pub fn slot_count(&self, default: usize, max: usize) -> usize {
        match self.explicit_structure() {
            Some(structure) => structure.len(),
            None if self.count == 0 => default,
            None => self.count.min(max.max(1)),
        }
    }

    /// Criteria for slot `slot`: the structure entry when present, else the
    /// first value of each dimension with price range cycling per slot.
    pub fn criteria_for_slot(&self, slot: usize) -> SearchCriteria {
        if let Some(structure) = self.explicit_structure() {
            return structure[slot % structure.len()].clone();
        }

        SearchCriteria {
            product_type: self.product_types.first().cloned(),
            benefit: self.benefits.first().cloned(),
            skin_type: self.skin_types.first().cloned(),
            price_range: if self.price_ranges.is_empty() {
                None
            } else {
                Some(self.price_ranges[slot % self.price_ranges.len()].clone())
            },
            sentiment: None,
        }
    }
}

fn clean_tag(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lenient_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(clean_tag))
}

fn lenient_sentiment<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Sentiment>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(clean_tag)
        .and_then(|s| match s.to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(clean_tag).collect(),
        Some(single) => clean_tag(&single).into_iter().collect(),
        None => Vec::new(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let count = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(count.map(|c| c as usize).unwrap_or(DEFAULT_COUNT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> SearchCriteria {
        SearchCriteria::default()
            .set(Dimension::ProductType, "moisturizer")
            .set(Dimension::Benefit, "hydrating")
            .set(Dimension::SkinType, "dry")
            .set(Dimension::PriceRange, "affordable")
    }

    #[test]
    fn test_tags_in_dimension_order() {
        assert_eq!(full().tags(), vec!["moisturizer", "hydrating", "dry", "affordable"]);
        assert_eq!(full().dimension_count(), 4);
        assert!(SearchCriteria::default().tags().is_empty());
    }

    #[test]
    fn test_sentiment_is_not_a_dimension() {
        let c = SearchCriteria {
            product_type: Some("serum".into()),
            sentiment: Some(Sentiment::Negative),
            ..Default::default()
        };
        assert_eq!(c.dimension_count(), 1);
        assert_eq!(c.tags(), vec!["serum"]);
    }

    #[test]
    fn test_plan_drops_benefit_then_skin_type() {
        let attempts = plan_attempts(&full());
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[1].tags(), vec!["moisturizer", "dry", "affordable"]);
        assert_eq!(attempts[2].tags(), vec!["moisturizer", "affordable"]);
    }

    #[test]
    fn test_plan_single_dimension_is_exact_only() {
        let c = SearchCriteria::default().set(Dimension::Benefit, "hydrating");
        assert_eq!(plan_attempts(&c).len(), 1);
    }

    #[test]
    fn test_plan_without_skin_type() {
        let c = SearchCriteria::default()
            .set(Dimension::ProductType, "serum")
            .set(Dimension::Benefit, "brightening");
        let attempts = plan_attempts(&c);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].tags(), vec!["serum"]);
    }

    #[test]
    fn test_plan_skips_identical_attempts() {
        // No benefit: dropping it changes nothing.
        let c = SearchCriteria::default()
            .set(Dimension::ProductType, "toner")
            .set(Dimension::SkinType, "oily");
        let attempts = plan_attempts(&c);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].tags(), vec!["toner"]);
    }

    #[test]
    fn test_price_cycles_per_slot() {
        let bundle = CriteriaBundle {
            product_types: vec!["serum".into(), "toner".into()],
            price_ranges: vec!["luxury".into(), "affordable".into()],
            ..Default::default()
        };
        let prices: Vec<Option<String>> =
            (0..4).map(|i| bundle.criteria_for_slot(i).price_range).collect();
        assert_eq!(
            prices,
            vec![
                Some("luxury".to_string()),
                Some("affordable".to_string()),
                Some("luxury".to_string()),
                Some("affordable".to_string())
            ]
        );
        assert_eq!(bundle.criteria_for_slot(3).product_type.as_deref(), Some("serum"));
    }

    #[test]
    fn test_slot_count() {
        assert_eq!(CriteriaBundle::default().slot_count(4, 12), 4);
        assert_eq!(CriteriaBundle::with_count(0).slot_count(4, 12), 4);
        assert_eq!(CriteriaBundle::with_count(40).slot_count(4, 12), 12);

        let mut bundle = CriteriaBundle::with_count(6);
        bundle.structure = Some(vec![SearchCriteria::default(); 3]);
        assert_eq!(bundle.slot_count(4, 12), 3);

        let long = CriteriaBundle::from_structure(vec![SearchCriteria::default(); 15]);
        assert_eq!(long.slot_count(4, 12), 15);

        bundle.structure = Some(Vec::new());
        assert_eq!(bundle.slot_count(4, 12), 6);
    }

    #[test]
    fn test_structure_used_verbatim() {
        let bundle = CriteriaBundle::from_structure(vec![
            full(),
            SearchCriteria::default().set(Dimension::ProductType, "mask"),
        ]);
        assert_eq!(bundle.criteria_for_slot(0), full());
        assert_eq!(bundle.criteria_for_slot(1).tags(), vec!["mask"]);
    }

    #[test]
    fn test_lenient_parse() {
        let bundle: CriteriaBundle = serde_json::from_str(
            r#"{"productTypes": ["moisturizer", "", 3], "benefits": "hydrating",
                "skinTypes": null, "count": "5",
                "structure": [{"productType": " serum ", "benefit": "", "sentiment": "Positive"},
                              {"priceRange": 7, "sentiment": "meh"}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.product_types, vec!["moisturizer"]);
        assert_eq!(bundle.benefits, vec!["hydrating"]);
        assert!(bundle.skin_types.is_empty());
        assert_eq!(bundle.count, 5);

        let structure = bundle.structure.unwrap();
        assert_eq!(structure[0].product_type.as_deref(), Some("serum"));
        assert_eq!(structure[0].benefit, None);
        assert_eq!(structure[0].sentiment, Some(Sentiment::Positive));
        assert_eq!(structure[1], SearchCriteria::default());
    }

    #[test]
    fn test_missing_count_defaults() {
        let bundle: CriteriaBundle = serde_json::from_str(r#"{"count": -2}"#).unwrap();
        assert_eq!(bundle.count, DEFAULT_COUNT);
        let bundle: CriteriaBundle = serde_json::from_str("{}").unwrap();
        assert_eq!(bundle, CriteriaBundle::default());
    }
}
