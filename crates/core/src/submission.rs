use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::cpq::pricing::{format_price, group_thousands};
use crate::domain::order::{OrderData, OrderReceipt};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("order is not submittable: {0}")]
    InvalidOrder(String),
    #[error("order was rejected: {reason}")]
    Rejected { reason: String },
    #[error("order transport failed: {0}")]
    Transport(String),
    #[error("order submission timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
}

/// Hands a confirmed order to whatever accepts orders.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, order: &OrderData) -> Result<OrderReceipt, SubmissionError>;
}

/// Builds a pre-filled `mailto:` compose link. Nothing leaves the process.
#[derive(Clone, Debug)]
pub struct MailtoSubmitter {
    recipient: String,
}

impl MailtoSubmitter {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self { recipient: recipient.into() }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn compose_link(&self, order: &OrderData, reference_id: &str) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            self.recipient,
            urlencoding::encode(&order_subject(order, reference_id)),
            urlencoding::encode(&order_body(order, reference_id)),
        )
    }
}

#[async_trait]
impl OrderSubmitter for MailtoSubmitter {
    async fn submit(&self, order: &OrderData) -> Result<OrderReceipt, SubmissionError> {
        validate_order(order)?;

        let reference_id = generate_reference_id();
        let compose_link = self.compose_link(order, &reference_id);
        Ok(OrderReceipt {
            accepted: true,
            reference_id,
            channel: "mailto".to_string(),
            compose_link: Some(compose_link),
        })
    }
}

pub fn validate_order(order: &OrderData) -> Result<(), SubmissionError> {
    let missing = order.customer.missing_fields();
    if !missing.is_empty() {
        return Err(SubmissionError::InvalidOrder(format!(
            "missing customer fields: {}",
            missing.join(", ")
        )));
    }
    if order.quantity == 0 {
        return Err(SubmissionError::InvalidOrder("quantity must be positive".to_string()));
    }
    Ok(())
}

/// `ORD-` followed by eight uppercase hex digits.
pub fn generate_reference_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", raw[..8].to_ascii_uppercase())
}

pub fn order_subject(order: &OrderData, reference_id: &str) -> String {
    format!(
        "Order request {reference_id}: {} x {}",
        order.product_name,
        group_thousands(u64::from(order.quantity))
    )
}

pub fn order_body(order: &OrderData, reference_id: &str) -> String {
    let mut lines = vec![
        format!("Reference: {reference_id}"),
        String::new(),
        format!("Product: {} ({})", order.product_name, order.product_id),
    ];

    if !order.options.is_empty() {
        lines.push("Options:".to_string());
        for option in &order.options {
            lines.push(format!("  - {}: {}", option.group_label, option.choice_label));
        }
    }

    lines.push(format!("Quantity: {}", group_thousands(u64::from(order.quantity))));
    lines.push(format!("Unit price: {}", format_price(order.price.unit_price)));
    lines.push(format!("Total: {}", format_price(order.price.total_price)));
    if order.price.discount_rate > 0 {
        lines.push(format!("Discount: {}%", order.price.discount_rate));
    }

    let customer = &order.customer;
    lines.push(String::new());
    lines.push(format!("Name: {}", customer.name.trim()));
    lines.push(format!("Email: {}", customer.email.trim()));
    for (label, value) in
        [("Company", &customer.company), ("Phone", &customer.phone), ("Notes", &customer.notes)]
    {
        if let Some(value) = value.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            lines.push(format!("{label}: {value}"));
        }
    }

    lines.join("\n")
}
