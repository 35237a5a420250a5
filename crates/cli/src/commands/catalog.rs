use clap::Args;
use promokit_core::cpq::catalog::Catalog;
use promokit_core::cpq::pricing::format_price;
use promokit_core::domain::product::CategoryId;
use serde::Serialize;

use crate::commands::{invalid_input, load_catalog, CommandResult};

const COMMAND: &str = "catalog";

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    #[arg(long, help = "Only list products in this category")]
    pub category: Option<String>,
    #[arg(long, help = "Check catalog invariants instead of listing products")]
    pub validate: bool,
}

#[derive(Debug, Serialize)]
struct ProductSummary {
    id: String,
    name: String,
    category: CategoryId,
    option_groups: Vec<String>,
    price_range: String,
}

pub fn run(args: &CatalogArgs) -> CommandResult {
    match load_catalog(COMMAND) {
        Ok((_, catalog)) => execute(&catalog, args),
        Err(result) => result,
    }
}

pub fn execute(catalog: &Catalog, args: &CatalogArgs) -> CommandResult {
    if args.validate {
        let validation = catalog.validate();
        if !validation.valid {
            let message = validation
                .violations
                .iter()
                .map(|violation| format!("{}: {}", violation.code, violation.message))
                .collect::<Vec<_>>()
                .join("; ");
            return CommandResult::failure(COMMAND, "catalog_validation", message, 3);
        }
        return CommandResult::success(
            COMMAND,
            format!("catalog valid: {} products", catalog.products.len()),
        );
    }

    let filter = match args.category.as_deref().map(str::parse::<CategoryId>).transpose() {
        Ok(filter) => filter,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let products: Vec<ProductSummary> = catalog
        .products
        .iter()
        .filter(|product| filter.map_or(true, |category| product.category == category))
        .map(|product| {
            let low = product.base_prices.iter().map(|tier| tier.unit_price).min().unwrap_or(0);
            let high = product.base_prices.iter().map(|tier| tier.unit_price).max().unwrap_or(0);
            ProductSummary {
                id: product.id.to_string(),
                name: product.name.clone(),
                category: product.category,
                option_groups: product.options.iter().map(|group| group.id.clone()).collect(),
                price_range: format!("{}-{}", format_price(low), format_price(high)),
            }
        })
        .collect();

    let summary = match filter {
        Some(category) => format!("{} products in {category}", products.len()),
        None => format!("{} products", products.len()),
    };
    CommandResult::report(COMMAND, summary, &products)
}

#[cfg(test)]
mod tests {
    use promokit_core::cpq::catalog::Catalog;

    use super::{execute, CatalogArgs};

    #[test]
    fn lists_products_filtered_by_category() {
        let catalog = Catalog::builtin();
        let result = execute(
            &catalog,
            &CatalogArgs { category: Some("calendar".to_string()), validate: false },
        );

        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("2 products in calendar"));
        assert!(result.output.contains("\"price_range\":\"¥130-¥320\""));
    }

    #[test]
    fn builtin_catalog_validates() {
        let result =
            execute(&Catalog::builtin(), &CatalogArgs { category: None, validate: true });
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn unknown_category_is_invalid_input() {
        let result = execute(
            &Catalog::builtin(),
            &CatalogArgs { category: Some("mugs".to_string()), validate: false },
        );
        assert_eq!(result.exit_code, 4);
    }
}
