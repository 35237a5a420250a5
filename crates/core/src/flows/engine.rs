use thiserror::Error;
use tracing::debug;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::cpq::pricing::{DeterministicPricingEngine, PricingEngine};
use crate::domain::product::{is_offered_quantity, CategoryId, Product};
use crate::errors::{ApplicationError, DomainError};
use crate::flows::states::{
    FlowAction, FlowContext, FlowEvent, FlowSession, FlowStep, FlowType, TransitionOutcome,
};
use crate::submission::{OrderSubmitter, SubmissionError};

pub trait FlowDefinition {
    fn flow_type(&self) -> FlowType;

    fn initial_session(&self) -> FlowSession {
        FlowSession::new(self.flow_type())
    }

    fn transition(
        &self,
        current: &FlowSession,
        event: &FlowEvent,
        context: &FlowContext<'_>,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Category, product, options and quantity, then a read-only estimate.
#[derive(Clone, Debug, Default)]
pub struct EstimateFlow;

impl FlowDefinition for EstimateFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Estimate
    }

    fn transition(
        &self,
        current: &FlowSession,
        event: &FlowEvent,
        context: &FlowContext<'_>,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_wizard(FlowType::Estimate, current, event, context)
    }
}

/// The estimate steps followed by customer details, confirmation and submission.
#[derive(Clone, Debug, Default)]
pub struct OrderFlow;

impl FlowDefinition for OrderFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Order
    }

    fn transition(
        &self,
        current: &FlowSession,
        event: &FlowEvent,
        context: &FlowContext<'_>,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_wizard(FlowType::Order, current, event, context)
    }
}

pub struct FlowEngine<F, P = DeterministicPricingEngine> {
    flow: F,
    pricing: P,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow, pricing: DeterministicPricingEngine }
    }
}

impl<F, P> FlowEngine<F, P>
where
    F: FlowDefinition,
    P: PricingEngine,
{
    pub fn with_pricing_engine(flow: F, pricing: P) -> Self {
        Self { flow, pricing }
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow.flow_type()
    }

    pub fn initial_session(&self) -> FlowSession {
        self.flow.initial_session()
    }

    /// Applies `event` and reprices the resulting session from scratch.
    pub fn apply(
        &self,
        current: &FlowSession,
        event: &FlowEvent,
        context: &FlowContext<'_>,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let mut outcome = self.flow.transition(current, event, context)?;
        self.reprice(&mut outcome.session, context);
        debug!(
            event_name = "flow.transition",
            flow_type = ?self.flow.flow_type(),
            from = ?outcome.from,
            to = ?outcome.to,
            "flow transition applied"
        );
        Ok(outcome)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FlowSession,
        event: &FlowEvent,
        context: &FlowContext<'_>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                let mut event = AuditEvent::new(
                    audit,
                    "flow.transition_applied",
                    AuditCategory::Flow,
                    AuditOutcome::Success,
                )
                .with_metadata("from", format!("{:?}", outcome.from))
                .with_metadata("to", format!("{:?}", outcome.to))
                .with_metadata("event", format!("{:?}", outcome.event));
                if let Some(price) = outcome.session.price {
                    event = event.with_metadata("total_price", price.total_price.to_string());
                }
                sink.emit(event);
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("step", format!("{:?}", current.step))
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// Hands a confirmed session to `submitter` and, once accepted, moves it to `Submitted`.
    pub async fn submit_order<S>(
        &self,
        session: &FlowSession,
        context: &FlowContext<'_>,
        submitter: &S,
    ) -> Result<TransitionOutcome, ApplicationError>
    where
        S: OrderSubmitter + ?Sized,
    {
        if session.step != FlowStep::Confirmation {
            return Err(DomainError::from(FlowTransitionError::NotReadyToSubmit {
                step: session.step,
            })
            .into());
        }

        let order = session.order_data(context.catalog).map_err(DomainError::from)?;
        let receipt = submitter.submit(&order).await?;
        if !receipt.accepted {
            return Err(SubmissionError::Rejected {
                reason: format!("receipt {} was not accepted", receipt.reference_id),
            }
            .into());
        }

        let mut next = session.clone();
        next.receipt = Some(receipt);
        next.step = FlowStep::Submitted;
        self.reprice(&mut next, context);
        debug!(
            event_name = "flow.transition",
            flow_type = ?self.flow.flow_type(),
            from = ?session.step,
            to = ?next.step,
            "order submitted"
        );
        Ok(TransitionOutcome {
            from: session.step,
            to: next.step,
            event: FlowEvent::Submit,
            actions: vec![FlowAction::ShowAcknowledgement],
            session: next,
        })
    }

    fn reprice(&self, session: &mut FlowSession, context: &FlowContext<'_>) {
        session.price = match (&session.product_id, session.quantity) {
            (Some(product_id), Some(quantity)) => context
                .catalog
                .find(product_id)
                .map(|product| self.pricing.price(product, &session.options, quantity).result),
            _ => None,
        };
    }
}

impl Default for FlowEngine<EstimateFlow> {
    fn default() -> Self {
        Self::new(EstimateFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields at {step:?}: {missing_fields:?}")]
    MissingRequiredFields { step: FlowStep, missing_fields: Vec<String> },
    #[error("invalid transition from {step:?} using event {event:?}")]
    InvalidTransition { step: FlowStep, event: FlowEvent },
    #[error("session belongs to the {actual:?} flow, not {expected:?}")]
    FlowTypeMismatch { expected: FlowType, actual: FlowType },
    #[error("unknown product `{0}`")]
    UnknownProduct(String),
    #[error("product `{product}` is not in category `{category}`")]
    ProductNotInCategory { product: String, category: String },
    #[error("product has no option group `{0}`")]
    UnknownOptionGroup(String),
    #[error("option group `{group}` has no choice `{choice}`")]
    UnknownChoice { group: String, choice: String },
    #[error("quantity {0} is not offered")]
    QuantityNotOffered(u32),
    #[error("order cannot be submitted from {step:?}")]
    NotReadyToSubmit { step: FlowStep },
}

fn transition_wizard(
    flow_type: FlowType,
    current: &FlowSession,
    event: &FlowEvent,
    context: &FlowContext<'_>,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        ClearSelection, PromptCustomerInfo, RecomputePrice, ResetOptions, RestartWizard,
        ShowConfirmation, ShowEstimate,
    };
    use FlowEvent::{
        Back, ConfirmConfiguration, ProvideCustomerInfo, Restart, Resume, SelectCategory,
        SelectOption, SelectProduct, SelectQuantity,
    };
    use FlowStep::{
        CategorySelect, Configure, Confirmation, CustomerInfo, ProductSelect, Review, Submitted,
    };

    if current.flow_type != flow_type {
        return Err(FlowTransitionError::FlowTypeMismatch {
            expected: flow_type,
            actual: current.flow_type,
        });
    }

    let invalid =
        || FlowTransitionError::InvalidTransition { step: current.step, event: event.clone() };
    let mut next = current.clone();
    let mut actions = Vec::new();

    match (current.step, event) {
        (Submitted, _) => return Err(invalid()),
        (_, Restart) => {
            next = FlowSession::new(flow_type);
            actions.push(RestartWizard);
        }
        (CategorySelect | ProductSelect | Configure | Review, SelectCategory(category)) => {
            if current.category != Some(*category) {
                next.category = Some(*category);
                next.product_id = None;
                next.options.clear();
                next.quantity = None;
                actions.push(ClearSelection);
            }
            next.step = ProductSelect;
        }
        (ProductSelect | Configure | Review, SelectProduct(product_id)) => {
            let product = context
                .catalog
                .find(product_id)
                .ok_or_else(|| FlowTransitionError::UnknownProduct(product_id.to_string()))?;
            ensure_in_category(product, current.category)?;
            if current.product_id.as_ref() != Some(&product.id) {
                next.product_id = Some(product.id.clone());
                next.options = product.default_selections();
                actions.push(ResetOptions);
            }
            next.step = Configure;
            actions.push(RecomputePrice);
        }
        (Configure, SelectOption { group, choice }) => {
            let product = session_product(current, context)?;
            let option_group = product
                .option_group(group)
                .ok_or_else(|| FlowTransitionError::UnknownOptionGroup(group.clone()))?;
            if option_group.choice(choice).is_none() {
                return Err(FlowTransitionError::UnknownChoice {
                    group: group.clone(),
                    choice: choice.clone(),
                });
            }
            next.options.insert(group.clone(), choice.clone());
            actions.push(RecomputePrice);
        }
        (Configure, SelectQuantity(quantity)) => {
            if !is_offered_quantity(*quantity) {
                return Err(FlowTransitionError::QuantityNotOffered(*quantity));
            }
            next.quantity = Some(*quantity);
            actions.push(RecomputePrice);
        }
        (Configure, ConfirmConfiguration) => {
            let mut missing_fields = Vec::new();
            if current.product_id.is_none() {
                missing_fields.push("product".to_string());
            }
            if current.quantity.is_none() {
                missing_fields.push("quantity".to_string());
            }
            if !missing_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    step: current.step,
                    missing_fields,
                });
            }
            match flow_type {
                FlowType::Estimate => {
                    next.step = Review;
                    actions.push(ShowEstimate);
                }
                FlowType::Order => {
                    next.step = CustomerInfo;
                    actions.push(PromptCustomerInfo);
                }
            }
        }
        (CategorySelect, Resume(selection)) => {
            let product = context.catalog.find(&selection.product_id).ok_or_else(|| {
                FlowTransitionError::UnknownProduct(selection.product_id.to_string())
            })?;
            if !is_offered_quantity(selection.quantity) {
                return Err(FlowTransitionError::QuantityNotOffered(selection.quantity));
            }
            next.category = Some(product.category);
            next.product_id = Some(product.id.clone());
            next.options = product.normalize_selections(&selection.options);
            next.quantity = Some(selection.quantity);
            next.step = Configure;
            actions.push(RecomputePrice);
        }
        (CustomerInfo, ProvideCustomerInfo(customer)) => {
            let missing_fields = customer.missing_fields();
            if !missing_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    step: current.step,
                    missing_fields,
                });
            }
            next.customer = Some(customer.clone());
            next.step = Confirmation;
            actions.push(ShowConfirmation);
        }
        (step, Back) => {
            next.step = previous_step(step).ok_or_else(invalid)?;
        }
        _ => return Err(invalid()),
    }

    Ok(TransitionOutcome {
        from: current.step,
        to: next.step,
        event: event.clone(),
        actions,
        session: next,
    })
}

fn previous_step(step: FlowStep) -> Option<FlowStep> {
    match step {
        FlowStep::ProductSelect => Some(FlowStep::CategorySelect),
        FlowStep::Configure => Some(FlowStep::ProductSelect),
        FlowStep::Review | FlowStep::CustomerInfo => Some(FlowStep::Configure),
        FlowStep::Confirmation => Some(FlowStep::CustomerInfo),
        FlowStep::CategorySelect | FlowStep::Submitted => None,
    }
}

fn session_product<'a>(
    session: &FlowSession,
    context: &FlowContext<'a>,
) -> Result<&'a Product, FlowTransitionError> {
    let Some(product_id) = &session.product_id else {
        return Err(FlowTransitionError::MissingRequiredFields {
            step: session.step,
            missing_fields: vec!["product".to_string()],
        });
    };
    context
        .catalog
        .find(product_id)
        .ok_or_else(|| FlowTransitionError::UnknownProduct(product_id.to_string()))
}

fn ensure_in_category(
    product: &Product,
    category: Option<CategoryId>,
) -> Result<(), FlowTransitionError> {
    match category {
        Some(category) if category != product.category => {
            Err(FlowTransitionError::ProductNotInCategory {
                product: product.id.to_string(),
                category: category.to_string(),
            })
        }
        _ => Ok(()),
    }
}
