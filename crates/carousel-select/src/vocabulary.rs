//! The controlled tag vocabulary used by the offline tagger.

use serde::{Deserialize, Serialize};

pub const PRODUCT_TYPES: &[&str] = &[
    "cleanser",
    "oil-cleanser",
    "foam-cleanser",
    "gel-cleanser",
    "toner",
    "essence",
    "serum",
    "ampoule",
    "moisturizer",
    "cream",
    "gel-cream",
    "sleeping-mask",
    "eye-cream",
    "eye-serum",
    "sunscreen",
    "spf",
    "mask",
    "sheet-mask",
    "clay-mask",
    "peel-off-mask",
    "exfoliator",
    "scrub",
    "peeling-gel",
    "spot-treatment",
    "acne-patch",
    "oil",
    "facial-oil",
    "mist",
    "spray",
];

pub const BENEFITS: &[&str] = &[
    "hydrating",
    "moisturizing",
    "anti-aging",
    "anti-wrinkle",
    "firming",
    "brightening",
    "dark-spot",
    "hyperpigmentation",
    "acne-treatment",
    "acne-fighting",
    "sebum-control",
    "soothing",
    "calming",
    "redness-relief",
    "exfoliating",
    "resurfacing",
    "barrier-repair",
    "strengthening",
    "pore-refining",
    "pore-minimizing",
    "oil-control",
    "mattifying",
    "anti-inflammatory",
    "texture-smoothing",
    "glow-boosting",
    "plumping",
    "lifting",
    "vitamin-c",
    "l-ascorbic-acid",
    "retinol",
    "retinoid",
    "niacinamide",
    "hyaluronic-acid",
    "aha",
    "bha",
    "aha-bha",
    "peptides",
    "ceramides",
    "snail-mucin",
    "centella",
    "salicylic-acid",
    "glycolic-acid",
    "lactic-acid",
];

pub const SKIN_TYPES: &[&str] = &[
    "oily",
    "dry",
    "combination",
    "sensitive",
    "normal",
    "all-types",
    "acne-prone",
    "mature",
    "dehydrated",
];

pub const PRICE_RANGES: &[&str] = &["affordable", "mid-range", "luxury"];

/// A tag-matching dimension of the search criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    ProductType,
    Benefit,
    SkinType,
    PriceRange,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::ProductType,
        Dimension::Benefit,
        Dimension::SkinType,
        Dimension::PriceRange,
    ];

    /// Known tags of this dimension.
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            Dimension::ProductType => PRODUCT_TYPES,
            Dimension::Benefit => BENEFITS,
            Dimension::SkinType => SKIN_TYPES,
            Dimension::PriceRange => PRICE_RANGES,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::ProductType => write!(f, "productType"),
            Dimension::Benefit => write!(f, "benefit"),
            Dimension::SkinType => write!(f, "skinType"),
            Dimension::PriceRange => write!(f, "priceRange"),
        }
    }
}

/// Lookup over the vocabulary lists.
pub struct Vocabulary;

impl Vocabulary {
    /// Dimension a tag belongs to, or `None` for tags outside the vocabulary.
    pub fn dimension_of(tag: &str) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.tags().contains(&tag))
    }

    /// Vocabulary block embedded in the extraction prompt.
    pub fn prompt_block() -> String {
        format!(
            "Product Types: {}\nBenefits: {}\nSkin Types: {}\nPrice Ranges: {}",
            PRODUCT_TYPES.join(", "),
            BENEFITS.join(", "),
            SKIN_TYPES.join(", "),
            PRICE_RANGES.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_of() {
        assert_eq!(Vocabulary::dimension_of("serum"), Some(Dimension::ProductType));
        assert_eq!(Vocabulary::dimension_of("niacinamide"), Some(Dimension::Benefit));
        assert_eq!(Vocabulary::dimension_of("acne-prone"), Some(Dimension::SkinType));
        assert_eq!(Vocabulary::dimension_of("luxury"), Some(Dimension::PriceRange));
        assert_eq!(Vocabulary::dimension_of("Luxury"), None);
        assert_eq!(Vocabulary::dimension_of("unicorn"), None);
    }

    #[test]
    fn test_lists_are_disjoint() {
        for a in Dimension::ALL {
            for b in Dimension::ALL {
                if a == b {
                    continue;
                }
                assert!(a.tags().iter().all(|t| !b.tags().contains(t)), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn test_prompt_block_lists_every_dimension() {
        let block = Vocabulary::prompt_block();
        assert!(block.contains("Product Types: cleanser"));
        assert!(block.contains("Price Ranges: affordable, mid-range, luxury"));
    }
}
