use std::time::Instant;

use chrono::NaiveDate;
use promokit_core::config::{AppConfig, LoadOptions};
use promokit_core::cpq::catalog::Catalog;
use promokit_core::cpq::pricing::calculate_price;
use promokit_core::delivery::calculate_delivery;
use promokit_core::domain::customer::CustomerInfo;
use promokit_core::flows::{FlowContext, FlowEngine, FlowEvent, FlowSession, OrderFlow};
use promokit_core::handoff::{decode_query, encode_query};
use promokit_core::submission::MailtoSubmitter;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

const CATALOG_CHECKS: [&str; 4] =
    ["pricing_reference", "delivery_reference", "handoff_round_trip", "order_flow"];

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(pass("config_validation", elapsed_ms, "configuration loaded and validated"));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(fail("config_validation", elapsed_ms, error.to_string()));
            checks.push(skipped("catalog_load"));
            checks.extend(CATALOG_CHECKS.into_iter().map(skipped));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let catalog = match timed_check(|| config.catalog.load_catalog()) {
        Ok((elapsed_ms, catalog)) => {
            let message = format!("{} products loaded", catalog.products.len());
            checks.push(pass("catalog_load", elapsed_ms, message));
            catalog
        }
        Err((elapsed_ms, error)) => {
            checks.push(fail("catalog_load", elapsed_ms, error.to_string()));
            checks.extend(CATALOG_CHECKS.into_iter().map(skipped));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    checks.push(run_check("pricing_reference", || pricing_reference(&catalog)));
    checks.push(run_check("delivery_reference", || delivery_reference(&catalog)));
    checks.push(run_check("handoff_round_trip", || handoff_round_trip(&catalog)));
    checks.push(run_check("order_flow", || order_flow(&catalog, &config)));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn pricing_reference(catalog: &Catalog) -> Result<String, String> {
    let product = catalog
        .products
        .first()
        .ok_or_else(|| "catalog has no products".to_string())?;
    let tier = product
        .base_prices
        .iter()
        .find(|tier| tier.quantity == 1000)
        .ok_or_else(|| format!("`{}` has no 1000 tier", product.id))?;

    let price = calculate_price(product, &product.default_selections(), tier.quantity);
    if price.unit_price != tier.unit_price || price.discount_rate != 0 {
        return Err(format!(
            "`{}` default price {} does not match tier price {}",
            product.id, price.unit_price, tier.unit_price
        ));
    }
    Ok(format!("`{}` x {} priced at tier price {}", product.id, tier.quantity, tier.unit_price))
}

fn delivery_reference(catalog: &Catalog) -> Result<String, String> {
    let schedule = catalog
        .delivery_categories
        .first()
        .ok_or_else(|| "catalog has no delivery categories".to_string())?;
    // A Monday outside the builtin busy periods.
    let order_date =
        NaiveDate::from_ymd_opt(2026, 10, 19).ok_or_else(|| "invalid reference date".to_string())?;

    let result = calculate_delivery(schedule, &catalog.busy_periods, order_date, 100, false);
    if result.delivery_date <= order_date {
        return Err(format!("delivery date {} is not after the order date", result.delivery_date));
    }
    Ok(format!(
        "{} x 100 from {order_date}: {} business days",
        schedule.id, result.total_days
    ))
}

fn handoff_round_trip(catalog: &Catalog) -> Result<String, String> {
    for product in &catalog.products {
        let options = product.default_selections();
        let query = encode_query(&product.id, &options, 500);
        let decoded = decode_query(catalog, &query)
            .into_selection()
            .ok_or_else(|| format!("`{query}` did not decode"))?;
        if decoded.product_id != product.id || decoded.options != options {
            return Err(format!("`{query}` decoded to a different selection"));
        }
    }
    Ok(format!("{} products round-tripped", catalog.products.len()))
}

fn order_flow(catalog: &Catalog, config: &AppConfig) -> Result<String, String> {
    let product = catalog
        .products
        .first()
        .ok_or_else(|| "catalog has no products".to_string())?;
    let engine = FlowEngine::new(OrderFlow);
    let context = FlowContext::new(catalog);
    let events = [
        FlowEvent::SelectCategory(product.category),
        FlowEvent::SelectProduct(product.id.clone()),
        FlowEvent::SelectQuantity(100),
        FlowEvent::ConfirmConfiguration,
        FlowEvent::ProvideCustomerInfo(CustomerInfo {
            name: "Smoke Test".to_string(),
            email: "smoke@example.com".to_string(),
            ..CustomerInfo::default()
        }),
    ];

    let mut session: FlowSession = engine.initial_session();
    for event in &events {
        session = engine.apply(&session, event, &context).map_err(|error| error.to_string())?.session;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;
    let submitter = MailtoSubmitter::new(config.submission.recipient.clone());
    let outcome = runtime
        .block_on(engine.submit_order(&session, &context, &submitter))
        .map_err(|error| error.to_string())?;

    let receipt = outcome.session.receipt.ok_or_else(|| "no receipt recorded".to_string())?;
    Ok(format!(
        "{} order composed as {} via {}",
        product.category, receipt.reference_id, receipt.channel
    ))
}

fn run_check(name: &'static str, check: impl FnOnce() -> Result<String, String>) -> SmokeCheck {
    match timed_check(check) {
        Ok((elapsed_ms, message)) => pass(name, elapsed_ms, message),
        Err((elapsed_ms, message)) => fail(name, elapsed_ms, message),
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn pass(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn fail(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
