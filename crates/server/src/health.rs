use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use promokit_core::Catalog;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub submission: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.catalog);
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "promokit-server runtime initialized".to_string(),
        },
        catalog,
        submission: HealthCheck {
            status: "ready",
            detail: format!("orders are submitted via {}", state.submission_mode.as_str()),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(catalog: &Catalog) -> HealthCheck {
    if catalog.products.is_empty() {
        return HealthCheck { status: "degraded", detail: "catalog has no products".to_string() };
    }

    let validation = catalog.validate();
    match validation.violations.first() {
        None => HealthCheck {
            status: "ready",
            detail: format!("{} products available", catalog.products.len()),
        },
        Some(first) => HealthCheck {
            status: "degraded",
            detail: format!(
                "catalog has {} violations; first: {}",
                validation.violations.len(),
                first.message
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use promokit_core::config::SubmissionMode;
    use promokit_core::{Catalog, MailtoSubmitter};

    use crate::bootstrap::AppState;
    use crate::health::health;

    fn state(catalog: Catalog) -> AppState {
        AppState::new(
            catalog,
            Arc::new(MailtoSubmitter::new("orders@example.co.jp")),
            SubmissionMode::Mailto,
        )
    }

    #[tokio::test]
    async fn health_returns_ready_with_builtin_catalog() {
        let (status, Json(payload)) = health(State(state(Catalog::builtin()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.status, "ready");
        assert_eq!(payload.catalog.detail, "9 products available");
        assert_eq!(payload.submission.detail, "orders are submitted via mailto");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_for_empty_catalog() {
        let (status, Json(payload)) = health(State(state(Catalog::default()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
