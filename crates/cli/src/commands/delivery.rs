use chrono::NaiveDate;
use clap::Args;
use promokit_core::cpq::catalog::Catalog;
use promokit_core::delivery::{calculate_delivery, DeliveryRequest, DeliveryResult};
use promokit_core::domain::product::CategoryId;
use serde::Serialize;

use crate::commands::{invalid_input, load_catalog, today, CommandResult};

const COMMAND: &str = "delivery";

#[derive(Debug, Clone, Args)]
pub struct DeliveryArgs {
    #[arg(long, help = "Delivery category: calendar, uchiwa, acrylic, towel, sticker or bag")]
    pub category: String,
    #[arg(long)]
    pub quantity: u32,
    #[arg(long, help = "Use the express lead time")]
    pub express: bool,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Order date; defaults to today")]
    pub order_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeliveryReport {
    order_date: NaiveDate,
    delivery_date: NaiveDate,
    total_days: u32,
    base_days: u32,
    quantity_days: u32,
    busy_days: u32,
    busy_period: Option<String>,
    express: bool,
}

impl DeliveryReport {
    pub(crate) fn new(order_date: NaiveDate, result: &DeliveryResult) -> Self {
        Self {
            order_date,
            delivery_date: result.delivery_date,
            total_days: result.total_days,
            base_days: result.base_days,
            quantity_days: result.quantity_days,
            busy_days: result.busy_days,
            busy_period: result.busy_period.as_ref().map(|period| period.label.clone()),
            express: result.express,
        }
    }
}

pub fn run(args: &DeliveryArgs) -> CommandResult {
    match load_catalog(COMMAND) {
        Ok((_, catalog)) => execute(&catalog, args, today()),
        Err(result) => result,
    }
}

pub fn execute(catalog: &Catalog, args: &DeliveryArgs, today: NaiveDate) -> CommandResult {
    let category = match args.category.parse::<CategoryId>() {
        Ok(category) => category,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };
    let request = DeliveryRequest {
        order_date: args.order_date.unwrap_or(today),
        category,
        quantity: args.quantity,
        express: args.express,
    };
    if let Err(error) = request.validate(today) {
        return invalid_input(COMMAND, error.to_string());
    }

    let Some(schedule) = catalog.delivery_category(category) else {
        return CommandResult::failure(
            COMMAND,
            "catalog",
            format!("catalog has no delivery schedule for `{category}`"),
            3,
        );
    };

    let result = calculate_delivery(
        schedule,
        &catalog.busy_periods,
        request.order_date,
        request.quantity,
        request.express,
    );
    let mut summary = format!(
        "{}: {} business days, delivery on {}",
        schedule.name, result.total_days, result.delivery_date
    );
    if let Some(period) = &result.busy_period {
        summary.push_str(&format!(" (includes {} +{} days)", period.label, period.additional_days));
    }

    CommandResult::report(COMMAND, summary, &DeliveryReport::new(request.order_date, &result))
}
