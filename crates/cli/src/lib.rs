pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::catalog::CatalogArgs;
use crate::commands::delivery::DeliveryArgs;
use crate::commands::estimate::EstimateArgs;
use crate::commands::handoff::HandoffCommand;

#[derive(Debug, Parser)]
#[command(
    name = "promokit",
    about = "Promokit estimate and delivery CLI",
    long_about = "Price promotional goods, schedule delivery dates, inspect the catalog and check runtime readiness.",
    after_help = "Examples:\n  promokit estimate --product calendar-desk --quantity 1000 --option type=case\n  promokit delivery --category acrylic --quantity 300 --order-date 2026-11-02\n  promokit handoff decode 'pid=uchiwa-poly&qty=100'\n  promokit doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a product configuration and optionally schedule its delivery")]
    Estimate(EstimateArgs),
    #[command(about = "Compute the business-day delivery date for a category and quantity")]
    Delivery(DeliveryArgs),
    #[command(about = "Encode or decode the estimate-to-order query string")]
    Handoff {
        #[command(subcommand)]
        command: HandoffCommand,
    },
    #[command(about = "List catalog products or validate catalog invariants")]
    Catalog(CatalogArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog integrity and submission readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run end-to-end reference checks with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Estimate(args) => commands::estimate::run(&args),
        Command::Delivery(args) => commands::delivery::run(&args),
        Command::Handoff { command } => commands::handoff::run(&command),
        Command::Catalog(args) => commands::catalog::run(&args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Smoke => commands::smoke::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
