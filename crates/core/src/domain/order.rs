use serde::{Deserialize, Serialize};

use crate::cpq::pricing::PriceResult;
use crate::domain::customer::CustomerInfo;
use crate::domain::product::{CategoryId, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOptionLine {
    pub group_id: String,
    pub group_label: String,
    pub choice_id: String,
    pub choice_label: String,
}

/// Everything an order submission carries: the configured product, its price and the customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: CategoryId,
    pub options: Vec<OrderOptionLine>,
    pub quantity: u32,
    pub price: PriceResult,
    pub customer: CustomerInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub accepted: bool,
    pub reference_id: String,
    pub channel: String,
    #[serde(default)]
    pub compose_link: Option<String>,
}
