use serde::{Deserialize, Serialize};

use crate::cpq::catalog::Catalog;
use crate::cpq::pricing::PriceResult;
use crate::domain::customer::CustomerInfo;
use crate::domain::order::{OrderData, OrderOptionLine, OrderReceipt};
use crate::domain::product::{CategoryId, OptionSelections, ProductId};
use crate::flows::engine::FlowTransitionError;
use crate::handoff::{encode_query, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Estimate,
    Order,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    CategorySelect,
    ProductSelect,
    Configure,
    Review,
    CustomerInfo,
    Confirmation,
    Submitted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FlowEvent {
    SelectCategory(CategoryId),
    SelectProduct(ProductId),
    SelectOption { group: String, choice: String },
    SelectQuantity(u32),
    ConfirmConfiguration,
    ProvideCustomerInfo(CustomerInfo),
    /// Recorded by `FlowEngine::submit_order` once the submitter accepts the order.
    /// Applying it directly is rejected.
    Submit,
    Back,
    Restart,
    Resume(Selection),
}

#[derive(Clone, Copy, Debug)]
pub struct FlowContext<'a> {
    pub catalog: &'a Catalog,
}

impl<'a> FlowContext<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    ClearSelection,
    ResetOptions,
    RecomputePrice,
    ShowEstimate,
    PromptCustomerInfo,
    ShowConfirmation,
    ShowAcknowledgement,
    RestartWizard,
}

/// One immutable snapshot of a wizard. Transitions return a new value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSession {
    pub flow_type: FlowType,
    pub step: FlowStep,
    pub category: Option<CategoryId>,
    pub product_id: Option<ProductId>,
    pub options: OptionSelections,
    pub quantity: Option<u32>,
    pub customer: Option<CustomerInfo>,
    pub price: Option<PriceResult>,
    pub receipt: Option<OrderReceipt>,
}

impl FlowSession {
    pub fn new(flow_type: FlowType) -> Self {
        Self {
            flow_type,
            step: FlowStep::CategorySelect,
            category: None,
            product_id: None,
            options: OptionSelections::new(),
            quantity: None,
            customer: None,
            price: None,
            receipt: None,
        }
    }

    pub fn selection(&self) -> Option<Selection> {
        Some(Selection {
            product_id: self.product_id.clone()?,
            options: self.options.clone(),
            quantity: self.quantity?,
        })
    }

    /// Query string carrying this session's selection to the order page.
    pub fn handoff_query(&self) -> Option<String> {
        let selection = self.selection()?;
        Some(encode_query(&selection.product_id, &selection.options, selection.quantity))
    }

    pub fn order_data(&self, catalog: &Catalog) -> Result<OrderData, FlowTransitionError> {
        let mut missing_fields = Vec::new();
        if self.product_id.is_none() {
            missing_fields.push("product".to_string());
        }
        if self.quantity.is_none() {
            missing_fields.push("quantity".to_string());
        }
        if self.price.is_none() {
            missing_fields.push("price".to_string());
        }
        if self.customer.is_none() {
            missing_fields.push("customer".to_string());
        }

        let (Some(product_id), Some(quantity), Some(price), Some(customer)) =
            (&self.product_id, self.quantity, self.price, &self.customer)
        else {
            return Err(FlowTransitionError::MissingRequiredFields {
                step: self.step,
                missing_fields,
            });
        };

        let product = catalog
            .find(product_id)
            .ok_or_else(|| FlowTransitionError::UnknownProduct(product_id.to_string()))?;

        let options = product
            .options
            .iter()
            .filter_map(|group| {
                let choice = group.choice(self.options.get(&group.id)?)?;
                Some(OrderOptionLine {
                    group_id: group.id.clone(),
                    group_label: group.label.clone(),
                    choice_id: choice.id.clone(),
                    choice_label: choice.label.clone(),
                })
            })
            .collect();

        Ok(OrderData {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            category: product.category,
            options,
            quantity,
            price,
            customer: customer.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowStep,
    pub to: FlowStep,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
    pub session: FlowSession,
}
