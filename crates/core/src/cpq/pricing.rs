//! Tiered unit pricing with multiplicative option modifiers.
//!
//! Pricing never fails. A quantity without an exact tier falls back to the first tier, and
//! option groups without a valid selection contribute no modifier. The degradations are
//! reported on [`PricingOutcome`] so callers can choose lenient ([`calculate_price`]) or strict
//! ([`price_strict`]) handling.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::product::{OptionSelections, Product, ProductId};
use crate::errors::DomainError;

pub const CURRENCY: &str = "JPY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceResult {
    pub unit_price: u64,
    pub total_price: u64,
    pub discount_rate: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TierResolution {
    Exact { quantity: u32 },
    FallbackToFirst { requested: u32, applied: u32 },
    Missing,
}

/// An option group whose selection was absent or named a choice the group does not have.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedSelection {
    pub group: String,
    pub supplied: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceResolution {
    Resolved,
    ResolvedWithDefaults,
    Unpriceable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub product_id: ProductId,
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingOutcome {
    pub result: PriceResult,
    pub tier: TierResolution,
    pub applied_modifier: Decimal,
    pub unmatched: Vec<UnmatchedSelection>,
    pub trace: PricingTrace,
}

impl PricingOutcome {
    pub fn resolution(&self) -> PriceResolution {
        match self.tier {
            TierResolution::Missing => PriceResolution::Unpriceable,
            TierResolution::FallbackToFirst { .. } => PriceResolution::ResolvedWithDefaults,
            TierResolution::Exact { .. } if !self.unmatched.is_empty() => {
                PriceResolution::ResolvedWithDefaults
            }
            TierResolution::Exact { .. } => PriceResolution::Resolved,
        }
    }
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        product: &Product,
        selections: &OptionSelections,
        quantity: u32,
    ) -> PricingOutcome;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        product: &Product,
        selections: &OptionSelections,
        quantity: u32,
    ) -> PricingOutcome {
        price_with_trace(product, selections, quantity)
    }
}

pub fn calculate_price(product: &Product, selections: &OptionSelections, quantity: u32) -> PriceResult {
    price_with_trace(product, selections, quantity).result
}

/// Rejects any input that the lenient path would have silently degraded.
pub fn price_strict(
    product: &Product,
    selections: &OptionSelections,
    quantity: u32,
) -> Result<PriceResult, DomainError> {
    let outcome = price_with_trace(product, selections, quantity);
    match outcome.tier {
        TierResolution::Exact { .. } => {}
        TierResolution::FallbackToFirst { requested, .. } => {
            return Err(DomainError::QuantityNotOffered(requested));
        }
        TierResolution::Missing => {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` has no price tiers",
                product.id
            )));
        }
    }

    if let Some(unmatched) = outcome.unmatched.first() {
        return Err(match &unmatched.supplied {
            Some(choice) => {
                DomainError::UnknownChoice { group: unmatched.group.clone(), choice: choice.clone() }
            }
            None => DomainError::MissingSelection(unmatched.group.clone()),
        });
    }

    Ok(outcome.result)
}

pub fn price_with_trace(
    product: &Product,
    selections: &OptionSelections,
    quantity: u32,
) -> PricingOutcome {
    let mut steps = Vec::new();
    let mut unmatched = Vec::new();
    let mut combined = Decimal::ONE;

    for group in &product.options {
        let supplied = selections.get(&group.id);
        match supplied.and_then(|choice_id| group.choice(choice_id)) {
            Some(choice) => {
                combined *= choice.price_modifier;
                steps.push(step(
                    "modifier",
                    format!("{}={} x{}", group.id, choice.id, choice.price_modifier),
                    combined,
                ));
            }
            None => {
                debug!(
                    event_name = "pricing.selection_unmatched",
                    product_id = %product.id,
                    group = %group.id,
                    supplied = supplied.map(String::as_str).unwrap_or("<none>"),
                    "option group contributes no modifier"
                );
                unmatched.push(UnmatchedSelection { group: group.id.clone(), supplied: supplied.cloned() });
            }
        }
    }

    let Some(first_tier) = product.base_prices.first() else {
        warn!(
            event_name = "pricing.no_tiers",
            product_id = %product.id,
            "product has no price tiers; pricing as zero"
        );
        return PricingOutcome {
            result: PriceResult::default(),
            tier: TierResolution::Missing,
            applied_modifier: Decimal::ONE,
            unmatched,
            trace: trace(product, steps),
        };
    };

    let Some(tier) = product.tier_for(quantity) else {
        warn!(
            event_name = "pricing.tier_fallback",
            product_id = %product.id,
            requested = quantity,
            applied = first_tier.quantity,
            "no exact price tier; falling back to the first tier"
        );
        // The fallback reports the first tier's unmodified price and no discount.
        let unit_price = first_tier.unit_price;
        let total_price = unit_price.saturating_mul(u64::from(quantity));
        steps.push(step(
            "tier_fallback",
            format!("quantity {quantity} not offered; first tier {}", first_tier.quantity),
            Decimal::from(unit_price),
        ));
        steps.push(step("total", format!("unit_price * {quantity}"), Decimal::from(total_price)));

        return PricingOutcome {
            result: PriceResult { unit_price, total_price, discount_rate: 0 },
            tier: TierResolution::FallbackToFirst {
                requested: quantity,
                applied: first_tier.quantity,
            },
            applied_modifier: Decimal::ONE,
            unmatched,
            trace: trace(product, steps),
        };
    };

    steps.insert(
        0,
        step("base", format!("tier {}", tier.quantity), Decimal::from(tier.unit_price)),
    );

    let unit_price = round_to_integer(Decimal::from(tier.unit_price) * combined);
    steps.push(step("unit_price", "round(base * combined_modifier)", Decimal::from(unit_price)));

    let total_price = unit_price.saturating_mul(u64::from(quantity));
    steps.push(step("total", format!("unit_price * {quantity}"), Decimal::from(total_price)));

    PricingOutcome {
        result: PriceResult { unit_price, total_price, discount_rate: discount_rate(combined) },
        tier: TierResolution::Exact { quantity: tier.quantity },
        applied_modifier: combined,
        unmatched,
        trace: trace(product, steps),
    }
}

/// Percentage saved by the combined modifier against the same tier at modifier 1.0.
pub fn discount_rate(combined_modifier: Decimal) -> u32 {
    if combined_modifier >= Decimal::ONE {
        return 0;
    }

    ((Decimal::ONE - combined_modifier) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Formats whole yen with thousands separators, e.g. `¥180,000`.
pub fn format_price(amount: u64) -> String {
    format!("¥{}", group_thousands(amount))
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub(crate) fn round_to_integer(value: Decimal) -> u64 {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_u64().unwrap_or(0)
}

fn step(stage: &str, detail: impl Into<String>, amount: Decimal) -> PricingTraceStep {
    PricingTraceStep { stage: stage.to_string(), detail: detail.into(), amount }
}

fn trace(product: &Product, steps: Vec<PricingTraceStep>) -> PricingTrace {
    PricingTrace { product_id: product.id.clone(), currency: CURRENCY.to_string(), steps }
}
