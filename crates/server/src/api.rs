//! Read-only JSON API over the catalog and the estimate/delivery calculators.

use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use promokit_core::handoff::{decode_selection, parse_query_string};
use promokit_core::{
    encode_query, format_price, ApplicationError, CategoryId, DeliveryCalculator,
    DeliveryRequest, DeliveryResult, DeterministicDeliveryCalculator,
    DeterministicEstimateRuntime, DomainError, Estimate, EstimateInput, EstimateRuntime,
    InterfaceError, PriceResolution, Product, Selection, SelectionOutcome, UnresolvableReason,
    QUANTITY_TIERS,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::AppState;

const EXPRESS_KEY: &str = "express";
const ORDER_DATE_KEY: &str = "order_date";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Clone, Debug, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub product_count: usize,
    pub standard_days: Option<u32>,
    pub express_days: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategorySummary>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EstimateResponse {
    pub selection: Selection,
    /// Option groups whose supplied value was missing or unknown and fell back to the default.
    pub substituted: Vec<String>,
    pub resolution: PriceResolution,
    pub formatted_total: String,
    pub handoff_query: String,
    pub estimate: Estimate,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeliveryBody {
    pub category: String,
    pub quantity: u32,
    /// Defaults to today.
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub express: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeliveryResponse {
    pub category: CategoryId,
    pub order_date: NaiveDate,
    pub quantity: u32,
    pub delivery: DeliveryResult,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/catalog/categories", get(categories))
        .route("/api/v1/catalog/products", get(products))
        .route("/api/v1/estimate", get(estimate))
        .route("/api/v1/delivery", post(delivery))
        .with_state(state)
}

pub async fn categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let catalog = &state.catalog;
    let categories = catalog
        .categories
        .iter()
        .map(|category| {
            let schedule = catalog.delivery_category(category.id);
            CategorySummary {
                id: category.id,
                name: category.name.clone(),
                description: category.description.clone(),
                product_count: catalog.products_in(category.id).count(),
                standard_days: schedule.map(|schedule| schedule.standard_days),
                express_days: schedule.map(|schedule| schedule.express_days),
            }
        })
        .collect();

    Json(CategoriesResponse { categories })
}

pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsResponse>, ApiFailure> {
    let products = match query.category.as_deref().filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => {
            let category = raw
                .parse::<CategoryId>()
                .map_err(|error| reject(error.into(), &new_correlation_id()))?;
            state.catalog.products_in(category).cloned().collect()
        }
        None => state.catalog.products.clone(),
    };

    Ok(Json(ProductsResponse { products }))
}

/// Takes the same query string the order page receives, plus optional `express` and
/// `order_date`. Without an order date no delivery schedule is returned.
pub async fn estimate(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<EstimateResponse>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let pairs = parse_query_string(query.as_deref().unwrap_or_default());

    let (selection, substituted) = match decode_selection(&state.catalog, &pairs) {
        SelectionOutcome::Resolved { selection } => (selection, Vec::new()),
        SelectionOutcome::ResolvedWithDefaults { selection, substituted } => {
            (selection, substituted)
        }
        SelectionOutcome::Unresolvable { reason } => {
            return Err(bad_request(unresolvable_message(&reason), &correlation_id));
        }
    };

    let express = match first_value(&pairs, EXPRESS_KEY) {
        Some(raw) => parse_flag(raw).ok_or_else(|| {
            bad_request(format!("`express` must be true or false, got `{raw}`"), &correlation_id)
        })?,
        None => false,
    };
    let order_date = match first_value(&pairs, ORDER_DATE_KEY) {
        Some(raw) => Some(raw.trim().parse::<NaiveDate>().map_err(|_| {
            bad_request(format!("`order_date` must be YYYY-MM-DD, got `{raw}`"), &correlation_id)
        })?),
        None => None,
    };

    let Some(product) = state.catalog.find(&selection.product_id) else {
        return Err(reject(
            DomainError::UnknownProduct(selection.product_id.to_string()).into(),
            &correlation_id,
        ));
    };

    if let Some(order_date) = order_date {
        let request = DeliveryRequest {
            order_date,
            category: product.category,
            quantity: selection.quantity,
            express,
        };
        request.validate(today()).map_err(|error| reject(error.into(), &correlation_id))?;
    }

    let estimate = DeterministicEstimateRuntime::default().estimate(EstimateInput {
        catalog: &state.catalog,
        product,
        selections: &selection.options,
        quantity: selection.quantity,
        order_date,
        express,
    });

    info!(
        event_name = "api.estimate.computed",
        correlation_id = %correlation_id,
        product_id = %selection.product_id,
        quantity = selection.quantity,
        total_price = estimate.pricing.result.total_price,
        "estimate computed"
    );

    Ok(Json(EstimateResponse {
        resolution: estimate.pricing.resolution(),
        formatted_total: format_price(estimate.pricing.result.total_price),
        handoff_query: encode_query(&selection.product_id, &selection.options, selection.quantity),
        selection,
        substituted,
        estimate,
    }))
}

pub async fn delivery(
    State(state): State<AppState>,
    Json(body): Json<DeliveryBody>,
) -> Result<Json<DeliveryResponse>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let category = body
        .category
        .parse::<CategoryId>()
        .map_err(|error| reject(error.into(), &correlation_id))?;
    let Some(schedule) = state.catalog.delivery_category(category) else {
        return Err(reject(
            DomainError::UnknownCategory(category.to_string()).into(),
            &correlation_id,
        ));
    };

    let order_date = body.order_date.unwrap_or_else(today);
    DeliveryRequest { order_date, category, quantity: body.quantity, express: body.express }
        .validate(today())
        .map_err(|error| reject(error.into(), &correlation_id))?;

    let delivery = DeterministicDeliveryCalculator.schedule(
        schedule,
        &state.catalog.busy_periods,
        order_date,
        body.quantity,
        body.express,
    );

    info!(
        event_name = "api.delivery.computed",
        correlation_id = %correlation_id,
        category = %category,
        quantity = body.quantity,
        total_days = delivery.total_days,
        "delivery date computed"
    );

    Ok(Json(DeliveryResponse { category, order_date, quantity: body.quantity, delivery }))
}

pub fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

/// Maps an application error onto an HTTP status and a user-safe body.
pub fn reject(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    failure(error.into_interface(correlation_id))
}

pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiFailure {
    failure(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

pub fn failure(error: InterfaceError) -> ApiFailure {
    let (status, detail) = match &error {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message),
        InterfaceError::ServiceUnavailable { message, .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, message)
        }
        InterfaceError::Internal { message, .. } => (StatusCode::INTERNAL_SERVER_ERROR, message),
    };

    warn!(
        event_name = "api.request_rejected",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        detail = %detail,
        "request rejected"
    );

    let body = ApiError {
        error: error.user_message().to_string(),
        detail: detail.clone(),
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body))
}

fn unresolvable_message(reason: &UnresolvableReason) -> String {
    match reason {
        UnresolvableReason::MissingProduct => "`pid` is required".to_string(),
        UnresolvableReason::UnknownProduct(product) => format!("unknown product `{product}`"),
        UnresolvableReason::MissingQuantity => "`qty` is required".to_string(),
        UnresolvableReason::InvalidQuantity(raw) => {
            format!("quantity `{raw}` is not offered (expected one of {QUANTITY_TIERS:?})")
        }
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(candidate, _)| candidate == key).map(|(_, value)| value.as_str())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::{Query, RawQuery, State},
        http::{Request, StatusCode},
        Json,
    };
    use chrono::NaiveDate;
    use promokit_core::config::SubmissionMode;
    use promokit_core::{Catalog, CategoryId, MailtoSubmitter, PriceResolution};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::{categories, delivery, estimate, products, DeliveryBody, ProductsQuery};
    use crate::bootstrap::{router, AppState};

    fn state() -> AppState {
        AppState::new(
            Catalog::builtin(),
            Arc::new(MailtoSubmitter::new("orders@example.co.jp")),
            SubmissionMode::Mailto,
        )
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn categories_list_product_counts_and_lead_times() {
        let Json(payload) = categories(State(state())).await;

        assert_eq!(payload.categories.len(), 6);
        let calendar = &payload.categories[0];
        assert_eq!(calendar.id, CategoryId::Calendar);
        assert_eq!(calendar.product_count, 2);
        assert_eq!(calendar.standard_days, Some(10));
        assert_eq!(calendar.express_days, Some(6));
    }

    #[tokio::test]
    async fn products_filter_by_category() {
        let Json(payload) = products(
            State(state()),
            Query(ProductsQuery { category: Some("acrylic".to_string()) }),
        )
        .await
        .expect("known category");

        let ids: Vec<&str> = payload.products.iter().map(|product| product.id.as_str()).collect();
        assert_eq!(ids, vec!["acrylic-keychain", "acrylic-stand"]);

        let Json(all) =
            products(State(state()), Query(ProductsQuery::default())).await.expect("all products");
        assert_eq!(all.products.len(), 9);
    }

    #[tokio::test]
    async fn products_reject_unknown_category() {
        let (status, Json(error)) = products(
            State(state()),
            Query(ProductsQuery { category: Some("mugs".to_string()) }),
        )
        .await
        .expect_err("unknown category");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.detail.contains("mugs"));
        assert!(error.correlation_id.starts_with("req-"));
    }

    #[tokio::test]
    async fn estimate_prices_reference_calendar() {
        let Json(payload) = estimate(
            State(state()),
            RawQuery(Some("pid=calendar-desk&qty=1000&opt_type=ring&opt_print=color4".to_string())),
        )
        .await
        .expect("estimate");

        assert_eq!(payload.estimate.pricing.result.unit_price, 180);
        assert_eq!(payload.estimate.pricing.result.total_price, 180_000);
        assert_eq!(payload.estimate.pricing.result.discount_rate, 0);
        assert_eq!(payload.resolution, PriceResolution::Resolved);
        assert_eq!(payload.formatted_total, "¥180,000");
        assert_eq!(payload.handoff_query, "pid=calendar-desk&qty=1000&opt_print=color4&opt_type=ring");
        assert!(payload.substituted.is_empty());
        assert!(payload.estimate.delivery.is_none());
    }

    #[tokio::test]
    async fn estimate_with_order_date_and_express_schedules_delivery() {
        let Json(payload) = estimate(
            State(state()),
            RawQuery(Some(
                "pid=acrylic-keychain&qty=300&opt_size=bogus&opt_print=single&opt_finish=clear&order_date=2030-10-01"
                    .to_string(),
            )),
        )
        .await
        .expect("estimate");

        assert_eq!(payload.substituted, vec!["size".to_string()]);
        assert_eq!(payload.resolution, PriceResolution::Resolved);
        assert_eq!(payload.estimate.pricing.result.total_price, 87_000);
        let delivery = payload.estimate.delivery.expect("delivery scheduled");
        assert_eq!(delivery.total_days, 10);
        assert_eq!(delivery.delivery_date, date(2030, 10, 15));
        assert_eq!(payload.estimate.express_total, None);

        let Json(express) = estimate(
            State(state()),
            RawQuery(Some("pid=acrylic-keychain&qty=300&express=true".to_string())),
        )
        .await
        .expect("express estimate");
        assert_eq!(express.estimate.express_total, Some(130_500));
    }

    #[tokio::test]
    async fn estimate_rejects_unresolvable_selection() {
        let (status, Json(error)) = estimate(
            State(state()),
            RawQuery(Some("pid=calendar-desk&qty=250".to_string())),
        )
        .await
        .expect_err("quantity off the enumeration");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.detail.contains("250"));
        assert_eq!(error.error, "The request could not be processed. Check inputs and try again.");

        let (status, _) = estimate(State(state()), RawQuery(None)).await.expect_err("no pid");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn estimate_rejects_past_order_date() {
        let (status, Json(error)) = estimate(
            State(state()),
            RawQuery(Some("pid=calendar-desk&qty=100&order_date=2001-01-01".to_string())),
        )
        .await
        .expect_err("past order date");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.detail.contains("in the past"));
    }

    #[tokio::test]
    async fn delivery_adds_busy_period_days() {
        let Json(payload) = delivery(
            State(state()),
            Json(DeliveryBody {
                category: "sticker".to_string(),
                quantity: 500,
                order_date: Some(date(2030, 12, 2)),
                express: false,
            }),
        )
        .await
        .expect("delivery");

        assert_eq!(payload.delivery.total_days, 10);
        assert_eq!(payload.delivery.busy_days, 5);
        assert_eq!(payload.delivery.delivery_date, date(2030, 12, 16));
        assert_eq!(
            payload.delivery.busy_period.map(|period| period.label),
            Some("Year-end rush".to_string())
        );
    }

    #[tokio::test]
    async fn delivery_rejects_zero_quantity() {
        let (status, Json(error)) = delivery(
            State(state()),
            Json(DeliveryBody {
                category: "towel".to_string(),
                quantity: 0,
                order_date: None,
                express: false,
            }),
        )
        .await
        .expect_err("zero quantity");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.detail.contains("greater than zero"));
    }

    #[tokio::test]
    async fn router_serves_estimate_over_http() {
        let response = router(state())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/estimate?pid=uchiwa-poly&qty=100&opt_shape=diecut&opt_print=double")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["estimate"]["pricing"]["result"]["unit_price"], 273);
        assert_eq!(payload["estimate"]["pricing"]["result"]["total_price"], 27_300);
    }

    #[tokio::test]
    async fn router_answers_unknown_route_with_not_found() {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/v1/quotes").body(Body::empty()).expect("request"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
