use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::delivery::{BusyPeriod, DeliveryCategory};
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId, QUANTITY_TIERS};

/// Upper bound for any single day count in the scheduling tables.
pub const MAX_LEAD_TIME_DAYS: u32 = 365;

/// Static product, category and scheduling tables. Read-only once loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<ProductCategory>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub delivery_categories: Vec<DeliveryCategory>,
    #[serde(default)]
    pub busy_periods: Vec<BusyPeriod>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogViolation {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogValidation {
    pub valid: bool,
    pub violations: Vec<CatalogViolation>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("catalog failed validation ({count} violations); first: {first}")]
    Invalid { count: usize, first: String, violations: Vec<CatalogViolation> },
}

impl Catalog {
    pub fn new(
        categories: Vec<ProductCategory>,
        products: Vec<Product>,
        delivery_categories: Vec<DeliveryCategory>,
        busy_periods: Vec<BusyPeriod>,
    ) -> Self {
        Self { categories, products, delivery_categories, busy_periods }
    }

    pub fn builtin() -> Self {
        crate::cpq::builtin::catalog()
    }

    /// Reads a TOML catalog and rejects it unless every invariant holds.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        let catalog = toml::from_str::<Catalog>(&raw)
            .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })?;
        catalog.ensure_valid()?;
        Ok(catalog)
    }

    pub fn ensure_valid(&self) -> Result<(), CatalogError> {
        let validation = self.validate();
        if validation.valid {
            return Ok(());
        }

        let first =
            validation.violations.first().map(|violation| violation.message.clone()).unwrap_or_default();
        Err(CatalogError::Invalid {
            count: validation.violations.len(),
            first,
            violations: validation.violations,
        })
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn find_by_str(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id.as_str() == product_id)
    }

    pub fn products_in(&self, category: CategoryId) -> impl Iterator<Item = &Product> + '_ {
        self.products.iter().filter(move |product| product.category == category)
    }

    pub fn category(&self, category: CategoryId) -> Option<&ProductCategory> {
        self.categories.iter().find(|entry| entry.id == category)
    }

    pub fn delivery_category(&self, category: CategoryId) -> Option<&DeliveryCategory> {
        self.delivery_categories.iter().find(|entry| entry.id == category)
    }

    pub fn validate(&self) -> CatalogValidation {
        let mut violations = Vec::new();
        self.validate_products(&mut violations);
        self.validate_delivery_categories(&mut violations);
        self.validate_busy_periods(&mut violations);

        CatalogValidation { valid: violations.is_empty(), violations }
    }

    fn validate_products(&self, violations: &mut Vec<CatalogViolation>) {
        let mut seen_products = HashSet::new();
        let expected_tiers: Vec<u32> = QUANTITY_TIERS.to_vec();

        for product in &self.products {
            let id = product.id.as_str();
            if id.trim().is_empty() {
                push(violations, "MISSING_PRODUCT_ID", format!("product `{}` has an empty id", product.name));
            }
            if !seen_products.insert(id) {
                push(violations, "DUPLICATE_PRODUCT_ID", format!("duplicate product id `{id}`"));
            }
            if self.category(product.category).is_none() {
                push(
                    violations,
                    "UNKNOWN_CATEGORY",
                    format!("product `{id}` references undeclared category `{}`", product.category),
                );
            }

            let mut tiers: Vec<u32> = product.base_prices.iter().map(|tier| tier.quantity).collect();
            tiers.sort_unstable();
            if tiers != expected_tiers {
                push(
                    violations,
                    "TIER_COVERAGE",
                    format!(
                        "product `{id}` prices quantities {tiers:?}; expected exactly {expected_tiers:?}"
                    ),
                );
            }

            let mut seen_groups = HashSet::new();
            for group in &product.options {
                if !seen_groups.insert(group.id.as_str()) {
                    push(
                        violations,
                        "DUPLICATE_OPTION_GROUP",
                        format!("product `{id}` declares option group `{}` twice", group.id),
                    );
                }
                if group.choices.is_empty() {
                    push(
                        violations,
                        "EMPTY_OPTION_GROUP",
                        format!("option group `{id}.{}` has no choices", group.id),
                    );
                }

                let mut seen_choices = HashSet::new();
                for choice in &group.choices {
                    if !seen_choices.insert(choice.id.as_str()) {
                        push(
                            violations,
                            "DUPLICATE_CHOICE_ID",
                            format!("option group `{id}.{}` repeats choice `{}`", group.id, choice.id),
                        );
                    }
                    if choice.price_modifier <= Decimal::ZERO {
                        push(
                            violations,
                            "NON_POSITIVE_MODIFIER",
                            format!(
                                "choice `{id}.{}.{}` has modifier {}",
                                group.id, choice.id, choice.price_modifier
                            ),
                        );
                    }
                }
            }
        }
    }

    fn validate_delivery_categories(&self, violations: &mut Vec<CatalogViolation>) {
        for category in &self.categories {
            if self.delivery_category(category.id).is_none() {
                push(
                    violations,
                    "MISSING_DELIVERY_CATEGORY",
                    format!("category `{}` has no delivery schedule", category.id),
                );
            }
        }

        for delivery in &self.delivery_categories {
            let id = delivery.id;
            let band_days = delivery.quantity_thresholds.iter().map(|band| band.additional_days);
            let longest = [delivery.standard_days, delivery.express_days]
                .into_iter()
                .chain(band_days)
                .max()
                .unwrap_or_default();
            if longest > MAX_LEAD_TIME_DAYS {
                push(
                    violations,
                    "LEAD_TIME_RANGE",
                    format!(
                        "delivery category `{id}` has a {longest}-day lead time; the limit is {MAX_LEAD_TIME_DAYS}"
                    ),
                );
            }
            if delivery.express_days > delivery.standard_days {
                push(
                    violations,
                    "EXPRESS_DAYS",
                    format!("delivery category `{id}` express days exceed standard days"),
                );
            }
            if delivery.express_rate <= Decimal::ONE {
                push(
                    violations,
                    "EXPRESS_RATE",
                    format!("delivery category `{id}` express rate must be greater than 1"),
                );
            }

            let thresholds = &delivery.quantity_thresholds;
            match thresholds.last() {
                Some(last) if last.max_quantity.is_none() => {}
                _ => push(
                    violations,
                    "THRESHOLD_UNBOUNDED",
                    format!("delivery category `{id}` must end with an unbounded quantity band"),
                ),
            }

            let finite = &thresholds[..thresholds.len().saturating_sub(1)];
            if finite.iter().any(|band| band.max_quantity.is_none()) {
                push(
                    violations,
                    "THRESHOLD_UNBOUNDED",
                    format!("delivery category `{id}` has an unbounded band before the last one"),
                );
            }

            let ascending = finite
                .windows(2)
                .all(|pair| matches!((pair[0].max_quantity, pair[1].max_quantity), (Some(a), Some(b)) if a < b));
            if !ascending {
                push(
                    violations,
                    "THRESHOLD_ORDER",
                    format!("delivery category `{id}` quantity bands must ascend"),
                );
            }
        }
    }

    fn validate_busy_periods(&self, violations: &mut Vec<CatalogViolation>) {
        for period in &self.busy_periods {
            if period.additional_days > MAX_LEAD_TIME_DAYS {
                push(
                    violations,
                    "LEAD_TIME_RANGE",
                    format!(
                        "busy period `{}` adds {} days; the limit is {MAX_LEAD_TIME_DAYS}",
                        period.label, period.additional_days
                    ),
                );
            }
            if !period.start.is_valid() || !period.end.is_valid() {
                push(
                    violations,
                    "INVALID_BUSY_PERIOD",
                    format!("busy period `{}` has an impossible month/day", period.label),
                );
            } else if period.start > period.end {
                push(
                    violations,
                    "INVALID_BUSY_PERIOD",
                    format!("busy period `{}` starts after it ends", period.label),
                );
            }
        }
    }
}

fn push(violations: &mut Vec<CatalogViolation>, code: &str, message: String) {
    violations.push(CatalogViolation { code: code.to_string(), message });
}
