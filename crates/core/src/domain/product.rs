use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Quantities offered for every product. Price tables are keyed by exactly these values.
pub const QUANTITY_TIERS: [u32; 6] = [100, 300, 500, 1000, 3000, 5000];

pub fn is_offered_quantity(quantity: u32) -> bool {
    QUANTITY_TIERS.contains(&quantity)
}

/// Option group id -> selected choice id.
pub type OptionSelections = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Calendar,
    Uchiwa,
    Acrylic,
    Towel,
    Sticker,
    Bag,
}

impl CategoryId {
    pub const ALL: [CategoryId; 6] = [
        CategoryId::Calendar,
        CategoryId::Uchiwa,
        CategoryId::Acrylic,
        CategoryId::Towel,
        CategoryId::Sticker,
        CategoryId::Bag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Uchiwa => "uchiwa",
            Self::Acrylic => "acrylic",
            Self::Towel => "towel",
            Self::Sticker => "sticker",
            Self::Bag => "bag",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownCategory(value.trim().to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub id: String,
    pub label: String,
    pub price_modifier: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub id: String,
    pub label: String,
    pub choices: Vec<OptionChoice>,
}

impl OptionGroup {
    /// The first choice is the implicit default.
    pub fn default_choice(&self) -> Option<&OptionChoice> {
        self.choices.first()
    }

    pub fn choice(&self, choice_id: &str) -> Option<&OptionChoice> {
        self.choices.iter().find(|choice| choice.id == choice_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub quantity: u32,
    pub unit_price: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub options: Vec<OptionGroup>,
    pub base_prices: Vec<PriceTier>,
}

impl Product {
    pub fn option_group(&self, group_id: &str) -> Option<&OptionGroup> {
        self.options.iter().find(|group| group.id == group_id)
    }

    /// Exact-match lookup; there is no interpolation between tiers.
    pub fn tier_for(&self, quantity: u32) -> Option<&PriceTier> {
        self.base_prices.iter().find(|tier| tier.quantity == quantity)
    }

    pub fn default_selections(&self) -> OptionSelections {
        self.options
            .iter()
            .filter_map(|group| {
                group.default_choice().map(|choice| (group.id.clone(), choice.id.clone()))
            })
            .collect()
    }

    /// Keeps the valid entries of `selections` and fills every other group with its default.
    pub fn normalize_selections(&self, selections: &OptionSelections) -> OptionSelections {
        self.options
            .iter()
            .filter_map(|group| {
                let chosen = selections
                    .get(&group.id)
                    .and_then(|choice_id| group.choice(choice_id))
                    .or_else(|| group.default_choice())?;
                Some((group.id.clone(), chosen.id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        is_offered_quantity, CategoryId, OptionChoice, OptionGroup, OptionSelections, PriceTier,
        Product, ProductId,
    };

    fn product() -> Product {
        Product {
            id: ProductId::new("towel-test"),
            name: "Test towel".to_string(),
            category: CategoryId::Towel,
            options: vec![OptionGroup {
                id: "print".to_string(),
                label: "Print".to_string(),
                choices: vec![
                    OptionChoice {
                        id: "single".to_string(),
                        label: "Single color".to_string(),
                        price_modifier: Decimal::ONE,
                    },
                    OptionChoice {
                        id: "full".to_string(),
                        label: "Full color".to_string(),
                        price_modifier: Decimal::new(18, 1),
                    },
                ],
            }],
            base_prices: vec![PriceTier { quantity: 100, unit_price: 500 }],
        }
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(" Acrylic ".parse::<CategoryId>(), Ok(CategoryId::Acrylic));
        assert!("mug".parse::<CategoryId>().is_err());
    }

    #[test]
    fn normalize_replaces_invalid_choices_with_defaults() {
        let mut selections = OptionSelections::new();
        selections.insert("print".to_string(), "neon".to_string());
        selections.insert("size".to_string(), "xl".to_string());

        let normalized = product().normalize_selections(&selections);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.get("print").map(String::as_str), Some("single"));
    }

    #[test]
    fn only_enumerated_quantities_are_offered() {
        assert!(is_offered_quantity(1000));
        assert!(!is_offered_quantity(1001));
        assert!(!is_offered_quantity(0));
    }
}
