use chrono::NaiveDate;
use clap::Args;
use promokit_core::cpq::catalog::Catalog;
use promokit_core::cpq::pricing::{format_price, group_thousands, price_strict, PriceResolution};
use promokit_core::cpq::{DeterministicEstimateRuntime, EstimateInput, EstimateRuntime};
use promokit_core::domain::product::{OptionSelections, Product};
use promokit_core::errors::DomainError;
use promokit_core::handoff::encode_query;
use serde::Serialize;

use crate::commands::delivery::DeliveryReport;
use crate::commands::{invalid_input, load_catalog, parse_option_pairs, today, CommandResult};

const COMMAND: &str = "estimate";

#[derive(Debug, Clone, Args)]
pub struct EstimateArgs {
    #[arg(long, help = "Product id, e.g. calendar-desk")]
    pub product: String,
    #[arg(long, help = "Quantity (100, 300, 500, 1000, 3000 or 5000)")]
    pub quantity: u32,
    #[arg(long = "option", value_name = "GROUP=CHOICE", help = "Option choice; repeatable")]
    pub options: Vec<String>,
    #[arg(long, help = "Request express production")]
    pub express: bool,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Order date used for the delivery schedule (default: today)")]
    pub order_date: Option<NaiveDate>,
    #[arg(long, help = "Fail instead of falling back on unoffered quantities or unknown choices")]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    product_id: String,
    product_name: String,
    quantity: u32,
    unit_price: u64,
    total_price: u64,
    discount_rate: u32,
    formatted_total: String,
    resolution: PriceResolution,
    unmatched_groups: Vec<String>,
    express_total: Option<u64>,
    delivery: Option<DeliveryReport>,
    handoff_query: String,
}

pub fn run(args: &EstimateArgs) -> CommandResult {
    match load_catalog(COMMAND) {
        Ok((_, catalog)) => execute(&catalog, args, today()),
        Err(result) => result,
    }
}

pub fn execute(catalog: &Catalog, args: &EstimateArgs, today: NaiveDate) -> CommandResult {
    let Some(product) = catalog.find_by_str(args.product.trim()) else {
        return invalid_input(COMMAND, DomainError::UnknownProduct(args.product.clone()).to_string());
    };
    if args.quantity == 0 {
        return invalid_input(COMMAND, DomainError::ZeroQuantity.to_string());
    }
    let supplied = match parse_option_pairs(&args.options) {
        Ok(supplied) => supplied,
        Err(message) => return invalid_input(COMMAND, message),
    };
    let order_date = args.order_date.unwrap_or(today);
    if order_date < today {
        let error = DomainError::PastOrderDate {
            order_date: order_date.to_string(),
            today: today.to_string(),
        };
        return invalid_input(COMMAND, error.to_string());
    }

    let selections = with_defaults(product, supplied);
    if args.strict {
        if let Err(error) = price_strict(product, &selections, args.quantity) {
            return invalid_input(COMMAND, error.to_string());
        }
    }

    let estimate = DeterministicEstimateRuntime::default().estimate(EstimateInput {
        catalog,
        product,
        selections: &selections,
        quantity: args.quantity,
        order_date: Some(order_date),
        express: args.express,
    });

    let result = estimate.pricing.result;
    let report = EstimateReport {
        product_id: product.id.to_string(),
        product_name: product.name.clone(),
        quantity: args.quantity,
        unit_price: result.unit_price,
        total_price: result.total_price,
        discount_rate: result.discount_rate,
        formatted_total: format_price(result.total_price),
        resolution: estimate.pricing.resolution(),
        unmatched_groups: estimate.pricing.unmatched.iter().map(|u| u.group.clone()).collect(),
        express_total: estimate.express_total,
        delivery: estimate
            .delivery
            .as_ref()
            .map(|delivery| DeliveryReport::new(order_date, delivery)),
        handoff_query: encode_query(
            &product.id,
            &product.normalize_selections(&selections),
            args.quantity,
        ),
    };

    let summary = format!(
        "{} x {}: {} ({} per unit)",
        product.name,
        group_thousands(u64::from(args.quantity)),
        format_price(result.total_price),
        format_price(result.unit_price),
    );
    CommandResult::report(COMMAND, summary, &report)
}

/// Starts from the product's default choices and lays the supplied choices over them.
fn with_defaults(product: &Product, supplied: OptionSelections) -> OptionSelections {
    let mut selections = product.default_selections();
    selections.extend(supplied);
    selections
}
