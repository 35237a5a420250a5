pub mod builtin;
pub mod catalog;
pub mod pricing;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryCalculator, DeliveryResult, DeterministicDeliveryCalculator};
use crate::domain::product::{OptionSelections, Product, ProductId};

use self::{
    catalog::Catalog,
    pricing::{round_to_integer, DeterministicPricingEngine, PricingEngine, PricingOutcome},
};

#[derive(Clone, Debug)]
pub struct EstimateInput<'a> {
    pub catalog: &'a Catalog,
    pub product: &'a Product,
    pub selections: &'a OptionSelections,
    pub quantity: u32,
    /// Without an order date no delivery schedule is computed.
    pub order_date: Option<NaiveDate>,
    pub express: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub product_id: ProductId,
    pub quantity: u32,
    pub pricing: PricingOutcome,
    pub delivery: Option<DeliveryResult>,
    /// Informational surcharge-inclusive total when express service is requested.
    pub express_total: Option<u64>,
}

pub trait EstimateRuntime: Send + Sync {
    fn estimate(&self, input: EstimateInput<'_>) -> Estimate;
}

pub struct DeterministicEstimateRuntime<P, D> {
    pricing_engine: P,
    delivery_calculator: D,
}

impl<P, D> DeterministicEstimateRuntime<P, D> {
    pub fn new(pricing_engine: P, delivery_calculator: D) -> Self {
        Self { pricing_engine, delivery_calculator }
    }
}

impl Default for DeterministicEstimateRuntime<DeterministicPricingEngine, DeterministicDeliveryCalculator> {
    fn default() -> Self {
        Self::new(DeterministicPricingEngine, DeterministicDeliveryCalculator)
    }
}

impl<P, D> EstimateRuntime for DeterministicEstimateRuntime<P, D>
where
    P: PricingEngine,
    D: DeliveryCalculator,
{
    fn estimate(&self, input: EstimateInput<'_>) -> Estimate {
        let pricing = self.pricing_engine.price(input.product, input.selections, input.quantity);
        let schedule = input.catalog.delivery_category(input.product.category);

        let delivery = match (schedule, input.order_date) {
            (Some(schedule), Some(order_date)) => Some(self.delivery_calculator.schedule(
                schedule,
                &input.catalog.busy_periods,
                order_date,
                input.quantity,
                input.express,
            )),
            _ => None,
        };
        let express_total = schedule
            .filter(|_| input.express)
            .map(|schedule| express_total(pricing.result.total_price, schedule.express_rate));

        Estimate {
            product_id: input.product.id.clone(),
            quantity: input.quantity,
            pricing,
            delivery,
            express_total,
        }
    }
}

/// `round(total × express_rate)`, half away from zero.
pub fn express_total(total_price: u64, express_rate: Decimal) -> u64 {
    round_to_integer(Decimal::from(total_price) * express_rate)
}
