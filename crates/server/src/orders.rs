//! `POST /api/v1/orders`: runs a selection and customer through the order flow and submits it.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use promokit_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use promokit_core::flows::{FlowContext, FlowEngine, FlowEvent, FlowStep, OrderFlow};
use promokit_core::{
    decode_query, ApplicationError, Catalog, CustomerInfo, DomainError, OrderReceipt, PriceResult,
    ProductId, Selection, SelectionOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{bad_request, new_correlation_id, reject, ApiFailure};
use crate::bootstrap::AppState;

/// Either a structured `selection` or the `handoff` query string carried over from the
/// estimate page. `selection` wins when both are present.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub selection: Option<Selection>,
    #[serde(default)]
    pub handoff: Option<String>,
    pub customer: CustomerInfo,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderResponse {
    pub receipt: OrderReceipt,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: PriceResult,
    pub step: FlowStep,
    pub correlation_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/api/v1/orders", post(submit_order)).with_state(state)
}

pub async fn submit_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiFailure> {
    let correlation_id = new_correlation_id();
    let audit = AuditContext::new(None, correlation_id.clone(), "api");
    let sink = TracingAuditSink;

    let selection = resolve_selection(&state.catalog, &request, &correlation_id)?;
    let engine = FlowEngine::new(OrderFlow);
    let context = FlowContext::new(&state.catalog);

    let mut session = engine.initial_session();
    for event in [
        FlowEvent::Resume(selection),
        FlowEvent::ConfirmConfiguration,
        FlowEvent::ProvideCustomerInfo(request.customer),
    ] {
        session = engine
            .apply_with_audit(&session, &event, &context, &sink, &audit)
            .map_err(|error| reject(DomainError::from(error).into(), &correlation_id))?
            .session;
    }

    let outcome = match engine.submit_order(&session, &context, state.submitter.as_ref()).await {
        Ok(outcome) => outcome,
        Err(error) => {
            sink.emit(
                AuditEvent::new(
                    &audit,
                    "order.submission_failed",
                    AuditCategory::Submission,
                    AuditOutcome::Failed,
                )
                .with_metadata("mode", state.submission_mode.as_str())
                .with_metadata("error", error.to_string()),
            );
            return Err(reject(error, &correlation_id));
        }
    };

    let submitted = outcome.session;
    let (Some(receipt), Some(product_id), Some(quantity), Some(price)) =
        (submitted.receipt, submitted.product_id, submitted.quantity, submitted.price)
    else {
        return Err(reject(
            ApplicationError::Domain(DomainError::InvariantViolation(
                "submitted session is missing its receipt or selection".to_string(),
            )),
            &correlation_id,
        ));
    };

    sink.emit(
        AuditEvent::new(&audit, "order.submitted", AuditCategory::Submission, AuditOutcome::Success)
            .with_metadata("reference_id", receipt.reference_id.clone())
            .with_metadata("channel", receipt.channel.clone())
            .with_metadata("total_price", price.total_price.to_string()),
    );
    info!(
        event_name = "api.order.submitted",
        correlation_id = %correlation_id,
        reference_id = %receipt.reference_id,
        product_id = %product_id,
        quantity,
        "order submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            receipt,
            product_id,
            quantity,
            price,
            step: submitted.step,
            correlation_id,
        }),
    ))
}

fn resolve_selection(
    catalog: &Catalog,
    request: &OrderRequest,
    correlation_id: &str,
) -> Result<Selection, ApiFailure> {
    if let Some(selection) = &request.selection {
        return Ok(selection.clone());
    }

    let Some(query) = request.handoff.as_deref() else {
        return Err(bad_request("either `selection` or `handoff` is required", correlation_id));
    };
    match decode_query(catalog, query) {
        SelectionOutcome::Unresolvable { reason } => Err(bad_request(
            format!("handoff query does not name an orderable selection: {reason:?}"),
            correlation_id,
        )),
        outcome => outcome.into_selection().ok_or_else(|| {
            bad_request("handoff query does not name an orderable selection", correlation_id)
        }),
    }
}
