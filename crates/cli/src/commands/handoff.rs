use clap::Subcommand;
use promokit_core::cpq::catalog::Catalog;
use promokit_core::domain::product::{is_offered_quantity, ProductId};
use promokit_core::handoff::{decode_query, encode_query, SelectionOutcome};

use crate::commands::{invalid_input, load_catalog, parse_option_pairs, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum HandoffCommand {
    #[command(about = "Encode a selection as an order-page query string")]
    Encode {
        #[arg(long)]
        product: String,
        #[arg(long)]
        quantity: u32,
        #[arg(long = "option", value_name = "GROUP=CHOICE")]
        options: Vec<String>,
    },
    #[command(about = "Decode a query string against the catalog, filling option defaults")]
    Decode {
        #[arg(help = "Query string, with or without the leading `?`")]
        query: String,
    },
}

pub fn run(command: &HandoffCommand) -> CommandResult {
    match load_catalog("handoff") {
        Ok((_, catalog)) => execute(&catalog, command),
        Err(result) => result,
    }
}

pub fn execute(catalog: &Catalog, command: &HandoffCommand) -> CommandResult {
    match command {
        HandoffCommand::Encode { product, quantity, options } => {
            encode(catalog, product, *quantity, options)
        }
        HandoffCommand::Decode { query } => decode(catalog, query),
    }
}

fn encode(catalog: &Catalog, product: &str, quantity: u32, options: &[String]) -> CommandResult {
    const COMMAND: &str = "handoff encode";

    let supplied = match parse_option_pairs(options) {
        Ok(supplied) => supplied,
        Err(message) => return invalid_input(COMMAND, message),
    };
    if !is_offered_quantity(quantity) {
        return invalid_input(COMMAND, format!("quantity {quantity} is not offered"));
    }

    // Known products get their options normalized so the order page sees a full selection.
    let (product_id, options) = match catalog.find_by_str(product.trim()) {
        Some(known) => (known.id.clone(), known.normalize_selections(&supplied)),
        None => (ProductId::new(product.trim()), supplied),
    };

    CommandResult::success(COMMAND, encode_query(&product_id, &options, quantity))
}

fn decode(catalog: &Catalog, query: &str) -> CommandResult {
    const COMMAND: &str = "handoff decode";

    let outcome = decode_query(catalog, query);
    let summary = match &outcome {
        SelectionOutcome::Resolved { selection } => {
            format!("resolved {} x {}", selection.product_id, selection.quantity)
        }
        SelectionOutcome::ResolvedWithDefaults { selection, substituted } => format!(
            "resolved {} x {} with defaults for {}",
            selection.product_id,
            selection.quantity,
            substituted.join(", ")
        ),
        SelectionOutcome::Unresolvable { reason } => {
            return CommandResult::failure(
                COMMAND,
                "unresolvable_selection",
                format!("no usable selection: {reason:?}"),
                4,
            );
        }
    };

    CommandResult::report(COMMAND, summary, &outcome)
}

#[cfg(test)]
mod tests {
    use promokit_core::cpq::catalog::Catalog;
    use serde_json::Value;

    use super::{execute, HandoffCommand};

    fn last_json(output: &str) -> Value {
        serde_json::from_str(output.lines().last().unwrap_or_default()).expect("json line")
    }

    #[test]
    fn encode_fills_defaults_for_known_products() {
        let catalog = Catalog::builtin();
        let result = execute(
            &catalog,
            &HandoffCommand::Encode {
                product: "calendar-desk".to_string(),
                quantity: 1000,
                options: vec!["type=case".to_string()],
            },
        );

        assert_eq!(result.exit_code, 0);
        assert_eq!(
            last_json(&result.output)["message"],
            "pid=calendar-desk&qty=1000&opt_print=color4&opt_type=case"
        );
    }

    #[test]
    fn decode_reports_substituted_groups() {
        let catalog = Catalog::builtin();
        let result = execute(
            &catalog,
            &HandoffCommand::Decode { query: "?pid=uchiwa-poly&qty=300&opt_shape=star".to_string() },
        );

        assert_eq!(result.exit_code, 0);
        let data = &last_json(&result.output)["data"];
        assert_eq!(data["status"], "resolved_with_defaults");
        assert_eq!(data["selection"]["options"]["shape"], "standard");
    }

    #[test]
    fn decode_fails_for_unknown_products() {
        let catalog = Catalog::builtin();
        let result =
            execute(&catalog, &HandoffCommand::Decode { query: "pid=mug&qty=100".to_string() });

        assert_eq!(result.exit_code, 4);
        assert_eq!(last_json(&result.output)["error_class"], "unresolvable_selection");
    }
}
