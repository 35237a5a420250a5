//! Webhook order submission.
//!
//! The order is POSTed as JSON to the configured endpoint. Transport failures, timeouts and
//! 5xx answers are retried with doubling backoff up to `max_retries`; 4xx answers are final.
//! Any 2xx answer is final: the order has been taken, whatever the body says.

use std::time::Duration;

use async_trait::async_trait;
use promokit_core::config::SubmissionConfig;
use promokit_core::submission::{generate_reference_id, validate_order};
use promokit_core::{OrderData, OrderReceipt, OrderSubmitter, SubmissionError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const BASE_RETRY_DELAY_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum WebhookSetupError {
    #[error("submission.webhook_url is required for webhook submission")]
    MissingEndpoint,
    #[error("http client could not be built: {0}")]
    Client(#[source] reqwest::Error),
}

pub struct WebhookOrderSubmitter {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    reference_id: &'a str,
    order: &'a OrderData,
}

/// Optional acknowledgement body. An empty or non-JSON 2xx body counts as accepted.
#[derive(Debug, Default, Deserialize)]
struct WebhookAck {
    #[serde(default)]
    accepted: Option<bool>,
    #[serde(default)]
    reference_id: Option<String>,
}

impl WebhookOrderSubmitter {
    pub fn from_config(config: &SubmissionConfig) -> Result<Self, WebhookSetupError> {
        let endpoint = config
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(WebhookSetupError::MissingEndpoint)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(WebhookSetupError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_once(&self, payload: &WebhookPayload<'_>) -> Result<WebhookAck, SubmissionError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                SubmissionError::Timeout { after_secs: self.timeout_secs }
            } else {
                SubmissionError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if status.is_client_error() {
            return Err(SubmissionError::Rejected {
                reason: format!("order endpoint answered {status}"),
            });
        }
        if !status.is_success() {
            return Err(SubmissionError::Transport(format!("order endpoint answered {status}")));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    event_name = "submission.webhook.ack_unread",
                    correlation_id = %payload.reference_id,
                    error = %error,
                    "order endpoint accepted the order but its body could not be read"
                );
                String::new()
            }
        };
        Ok(parse_ack(&body, payload.reference_id))
    }
}

#[async_trait]
impl OrderSubmitter for WebhookOrderSubmitter {
    async fn submit(&self, order: &OrderData) -> Result<OrderReceipt, SubmissionError> {
        validate_order(order)?;

        let reference_id = generate_reference_id();
        let payload = WebhookPayload { reference_id: &reference_id, order };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post_once(&payload).await {
                Ok(ack) => {
                    info!(
                        event_name = "submission.webhook.delivered",
                        correlation_id = %reference_id,
                        attempt,
                        "order delivered to webhook"
                    );
                    return Ok(OrderReceipt {
                        accepted: ack.accepted.unwrap_or(true),
                        reference_id: ack.reference_id.unwrap_or(reference_id),
                        channel: "webhook".to_string(),
                        compose_link: None,
                    });
                }
                Err(error) if is_retryable(&error) && attempt <= self.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        event_name = "submission.webhook.retrying",
                        correlation_id = %reference_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "webhook delivery failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!(
                        event_name = "submission.webhook.failed",
                        correlation_id = %reference_id,
                        attempt,
                        error = %error,
                        "webhook delivery gave up"
                    );
                    return Err(error);
                }
            }
        }
    }
}

fn parse_ack(body: &str, reference_id: &str) -> WebhookAck {
    if body.trim().is_empty() {
        return WebhookAck::default();
    }
    match serde_json::from_str(body) {
        Ok(ack) => ack,
        Err(error) => {
            warn!(
                event_name = "submission.webhook.ack_unparsed",
                correlation_id = %reference_id,
                error = %error,
                "order endpoint accepted the order with a non-JSON body"
            );
            WebhookAck::default()
        }
    }
}

fn is_retryable(error: &SubmissionError) -> bool {
    matches!(error, SubmissionError::Transport(_) | SubmissionError::Timeout { .. })
}

fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(6);
    Duration::from_millis(BASE_RETRY_DELAY_MS * 2u64.pow(exponent))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{extract::State, http::StatusCode, routing::post, Router};
    use promokit_core::config::{AppConfig, SubmissionMode};
    use promokit_core::{
        CategoryId, CustomerInfo, OrderData, OrderSubmitter, PriceResult, ProductId,
        SubmissionError,
    };

    use super::{is_retryable, parse_ack, retry_delay, WebhookOrderSubmitter, WebhookSetupError};

    type Answers = Arc<Vec<(StatusCode, &'static str)>>;

    async fn hook(
        State((hits, answers)): State<(Arc<AtomicUsize>, Answers)>,
    ) -> (StatusCode, &'static str) {
        let hit = hits.fetch_add(1, Ordering::SeqCst);
        answers[hit.min(answers.len() - 1)]
    }

    /// Serves `/hook` locally, answering hit `n` with `answers[n]`; the last answer repeats.
    async fn spawn_endpoint(answers: Vec<(StatusCode, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/hook", post(hook))
            .with_state((hits.clone(), Arc::new(answers)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{address}/hook"), hits)
    }

    fn submitter(endpoint: String, max_retries: u32) -> WebhookOrderSubmitter {
        let mut config = AppConfig::default().submission;
        config.mode = SubmissionMode::Webhook;
        config.webhook_url = Some(endpoint);
        config.timeout_secs = 5;
        config.max_retries = max_retries;
        WebhookOrderSubmitter::from_config(&config).expect("client builds")
    }

    fn order() -> OrderData {
        OrderData {
            product_id: ProductId::new("towel-face"),
            product_name: "Face towel".to_string(),
            category: CategoryId::Towel,
            options: Vec::new(),
            quantity: 500,
            price: PriceResult { unit_price: 320, total_price: 160_000, discount_rate: 0 },
            customer: CustomerInfo {
                name: "Aiko Tanaka".to_string(),
                email: "aiko@example.co.jp".to_string(),
                company: None,
                phone: None,
                notes: None,
            },
        }
    }

    #[test]
    fn setup_requires_endpoint() {
        let mut config = AppConfig::default().submission;
        config.mode = SubmissionMode::Webhook;
        config.webhook_url = Some("   ".to_string());

        let error = WebhookOrderSubmitter::from_config(&config).err().expect("missing endpoint");
        assert!(matches!(error, WebhookSetupError::MissingEndpoint));
    }

    #[test]
    fn setup_keeps_trimmed_endpoint() {
        let mut config = AppConfig::default().submission;
        config.mode = SubmissionMode::Webhook;
        config.webhook_url = Some(" https://orders.example.com/hook ".to_string());

        let submitter = WebhookOrderSubmitter::from_config(&config).expect("client builds");
        assert_eq!(submitter.endpoint(), "https://orders.example.com/hook");
    }

    #[test]
    fn empty_or_plain_text_body_is_an_accepting_ack() {
        let ack = parse_ack("  ", "ORD-1");
        assert_eq!(ack.accepted, None);
        assert_eq!(ack.reference_id, None);

        let ack = parse_ack(r#"{"accepted":false,"reference_id":"EXT-9"}"#, "ORD-1");
        assert_eq!(ack.accepted, Some(false));
        assert_eq!(ack.reference_id.as_deref(), Some("EXT-9"));

        let ack = parse_ack("<html>", "ORD-1");
        assert_eq!(ack.accepted, None);
    }

    #[tokio::test]
    async fn plain_text_success_is_delivered_exactly_once() {
        let (endpoint, hits) = spawn_endpoint(vec![(StatusCode::OK, "OK")]).await;

        let receipt = submitter(endpoint, 2).submit(&order()).await.expect("order accepted");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(receipt.accepted);
        assert_eq!(receipt.channel, "webhook");
        assert!(receipt.reference_id.starts_with("ORD-"));
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_accepted() {
        let (endpoint, hits) = spawn_endpoint(vec![
            (StatusCode::SERVICE_UNAVAILABLE, ""),
            (StatusCode::BAD_GATEWAY, ""),
            (StatusCode::OK, r#"{"reference_id":"EXT-42"}"#),
        ])
        .await;

        let receipt = submitter(endpoint, 2).submit(&order()).await.expect("order accepted");

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(receipt.reference_id, "EXT-42");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (endpoint, hits) =
            spawn_endpoint(vec![(StatusCode::UNPROCESSABLE_ENTITY, "bad order")]).await;

        let error = submitter(endpoint, 3).submit(&order()).await.expect_err("rejected");

        assert!(matches!(error, SubmissionError::Rejected { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_transport_failures_are_retried() {
        assert!(is_retryable(&SubmissionError::Transport("reset".to_string())));
        assert!(is_retryable(&SubmissionError::Timeout { after_secs: 10 }));
        assert!(!is_retryable(&SubmissionError::Rejected { reason: "400".to_string() }));
        assert!(!is_retryable(&SubmissionError::InvalidOrder("email".to_string())));
    }

    #[test]
    fn retry_delay_doubles() {
        assert_eq!(retry_delay(1), Duration::from_millis(200));
        assert_eq!(retry_delay(2), Duration::from_millis(400));
        assert_eq!(retry_delay(3), Duration::from_millis(800));
    }
}
