use std::sync::Arc;

use axum::Router;
use promokit_core::config::{AppConfig, ConfigError, LoadOptions, SubmissionConfig, SubmissionMode};
use promokit_core::{Catalog, CatalogError, MailtoSubmitter, OrderSubmitter};
use thiserror::Error;
use tracing::info;

use crate::submission::{WebhookOrderSubmitter, WebhookSetupError};
use crate::{api, health, orders};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub submitter: Arc<dyn OrderSubmitter>,
    pub submission_mode: SubmissionMode,
}

impl AppState {
    pub fn new(catalog: Catalog, submitter: Arc<dyn OrderSubmitter>, mode: SubmissionMode) -> Self {
        Self { catalog: Arc::new(catalog), submitter, submission_mode: mode }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog load failed: {0}")]
    Catalog(#[source] CatalogError),
    #[error("order submitter setup failed: {0}")]
    Submitter(#[from] WebhookSetupError),
}

impl Application {
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }
}

pub fn router(state: AppState) -> Router {
    health::router(state.clone()).merge(api::router(state.clone())).merge(orders::router(state))
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = config.catalog.load_catalog().map_err(BootstrapError::Catalog)?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        source = config
            .catalog
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "builtin".to_string()),
        products = catalog.products.len(),
        "catalog loaded"
    );

    let submitter = build_submitter(&config.submission)?;
    info!(
        event_name = "system.bootstrap.submitter_ready",
        correlation_id = "bootstrap",
        mode = config.submission.mode.as_str(),
        "order submitter ready"
    );

    let state = AppState::new(catalog, submitter, config.submission.mode);
    Ok(Application { config, state })
}

fn build_submitter(config: &SubmissionConfig) -> Result<Arc<dyn OrderSubmitter>, BootstrapError> {
    let submitter: Arc<dyn OrderSubmitter> = match config.mode {
        SubmissionMode::Mailto => Arc::new(MailtoSubmitter::new(config.recipient.clone())),
        SubmissionMode::Webhook => Arc::new(WebhookOrderSubmitter::from_config(config)?),
    };
    Ok(submitter)
}
