use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::CategoryId;

/// A quantity band. `max_quantity: None` is the unbounded final band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityThreshold {
    #[serde(default)]
    pub max_quantity: Option<u32>,
    pub additional_days: u32,
}

impl QuantityThreshold {
    pub fn covers(&self, quantity: u32) -> bool {
        self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCategory {
    pub id: CategoryId,
    pub name: String,
    pub standard_days: u32,
    pub express_days: u32,
    pub express_rate: Decimal,
    pub quantity_thresholds: Vec<QuantityThreshold>,
}

/// A month/day pair without a year. Ordering is (month, day), which is what busy-period
/// matching compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { month: date.month(), day: date.day() }
    }

    /// Checked against a leap year so that 02-29 is accepted.
    pub fn is_valid(&self) -> bool {
        NaiveDate::from_ymd_opt(2024, self.month, self.day).is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub label: String,
    pub start: MonthDay,
    pub end: MonthDay,
    pub additional_days: u32,
}

impl BusyPeriod {
    /// Inclusive on both ends, year ignored.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let day = MonthDay::of(date);
        self.start <= day && day <= self.end
    }
}
