pub mod catalog;
pub mod config;
pub mod delivery;
pub mod doctor;
pub mod estimate;
pub mod handoff;
pub mod smoke;

use chrono::NaiveDate;
use promokit_core::config::{AppConfig, LoadOptions};
use promokit_core::cpq::catalog::Catalog;
use promokit_core::domain::product::OptionSelections;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandReport<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// A human summary line followed by the JSON report on the last line.
    pub fn report<T: Serialize>(command: &str, summary: impl Into<String>, data: &T) -> Self {
        let report = CommandReport { command, status: "ok", data };
        match serde_json::to_string(&report) {
            Ok(machine) => Self { exit_code: 0, output: format!("{}\n{machine}", summary.into()) },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }
}

/// Loads config and the configured catalog, mapping failures to the shared exit codes.
pub(crate) fn load_catalog(command: &str) -> Result<(AppConfig, Catalog), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;
    let catalog = config.catalog.load_catalog().map_err(|error| {
        CommandResult::failure(command, "catalog", format!("catalog issue: {error}"), 3)
    })?;
    Ok((config, catalog))
}

pub(crate) fn invalid_input(command: &str, message: impl Into<String>) -> CommandResult {
    CommandResult::failure(command, "invalid_input", message, 4)
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parses `group=choice` pairs; the first value for a group wins.
pub fn parse_option_pairs(pairs: &[String]) -> Result<OptionSelections, String> {
    let mut selections = OptionSelections::new();
    for pair in pairs {
        let Some((group, choice)) = pair.split_once('=') else {
            return Err(format!("option `{pair}` must be written as group=choice"));
        };
        let (group, choice) = (group.trim(), choice.trim());
        if group.is_empty() || choice.is_empty() {
            return Err(format!("option `{pair}` must be written as group=choice"));
        }
        selections.entry(group.to_string()).or_insert_with(|| choice.to_string());
    }
    Ok(selections)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::parse_option_pairs;

    #[test]
    fn option_pairs_keep_first_value_per_group() {
        let parsed = parse_option_pairs(&[
            "type=case".to_string(),
            " print = mono ".to_string(),
            "type=ring".to_string(),
        ])
        .expect("valid pairs");

        assert_eq!(parsed.get("type").map(String::as_str), Some("case"));
        assert_eq!(parsed.get("print").map(String::as_str), Some("mono"));
    }

    #[test]
    fn option_pairs_require_an_equals_sign() {
        assert!(parse_option_pairs(&["glitter".to_string()]).is_err());
        assert!(parse_option_pairs(&["=glitter".to_string()]).is_err());
    }
}
