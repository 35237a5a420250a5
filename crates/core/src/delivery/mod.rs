//! Business-day delivery scheduling.
//!
//! `total_days = base + quantity surcharge + busy-period surcharge`, counted in weekdays from
//! the order date. Busy periods add days; they do not block days on the calendar.

pub mod calendar;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::delivery::{BusyPeriod, DeliveryCategory};
use crate::domain::product::CategoryId;
use crate::errors::DomainError;

pub use calendar::{add_business_days, find_busy_period, is_business_day, quantity_surcharge_days};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub order_date: NaiveDate,
    pub category: CategoryId,
    pub quantity: u32,
    #[serde(default)]
    pub express: bool,
}

impl DeliveryRequest {
    /// Guards for requests built from external input. The calculator itself assumes valid input.
    pub fn validate(&self, today: NaiveDate) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::ZeroQuantity);
        }
        if self.order_date < today {
            return Err(DomainError::PastOrderDate {
                order_date: self.order_date.to_string(),
                today: today.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub delivery_date: NaiveDate,
    pub total_days: u32,
    pub busy_period: Option<BusyPeriod>,
    pub base_days: u32,
    pub quantity_days: u32,
    pub busy_days: u32,
    pub express: bool,
}

pub trait DeliveryCalculator: Send + Sync {
    fn schedule(
        &self,
        category: &DeliveryCategory,
        busy_periods: &[BusyPeriod],
        order_date: NaiveDate,
        quantity: u32,
        express: bool,
    ) -> DeliveryResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicDeliveryCalculator;

impl DeliveryCalculator for DeterministicDeliveryCalculator {
    fn schedule(
        &self,
        category: &DeliveryCategory,
        busy_periods: &[BusyPeriod],
        order_date: NaiveDate,
        quantity: u32,
        express: bool,
    ) -> DeliveryResult {
        calculate_delivery(category, busy_periods, order_date, quantity, express)
    }
}

pub fn calculate_delivery(
    category: &DeliveryCategory,
    busy_periods: &[BusyPeriod],
    order_date: NaiveDate,
    quantity: u32,
    express: bool,
) -> DeliveryResult {
    let base_days = if express { category.express_days } else { category.standard_days };
    let quantity_days = quantity_surcharge_days(&category.quantity_thresholds, quantity);
    let busy_period = find_busy_period(busy_periods, order_date).cloned();
    let busy_days = busy_period.as_ref().map_or(0, |period| period.additional_days);

    let total_days = base_days.saturating_add(quantity_days).saturating_add(busy_days);
    let delivery_date = add_business_days(order_date, total_days);

    DeliveryResult {
        delivery_date,
        total_days,
        busy_period,
        base_days,
        quantity_days,
        busy_days,
        express,
    }
}
