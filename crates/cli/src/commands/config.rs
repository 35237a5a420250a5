use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use promokit_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let catalog_path = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());
    let port = config.server.port.to_string();
    let graceful_shutdown_secs = config.server.graceful_shutdown_secs.to_string();
    let timeout_secs = config.submission.timeout_secs.to_string();
    let max_retries = config.submission.max_retries.to_string();
    let log_format = format!("{:?}", config.logging.format);
    let api_key = if config.submission.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields = [
        Field { key_path: "catalog.path", env_keys: &["PROMOKIT_CATALOG_PATH"], value: &catalog_path },
        Field {
            key_path: "server.bind_address",
            env_keys: &["PROMOKIT_SERVER_BIND_ADDRESS"],
            value: &config.server.bind_address,
        },
        Field { key_path: "server.port", env_keys: &["PROMOKIT_SERVER_PORT"], value: &port },
        Field {
            key_path: "server.graceful_shutdown_secs",
            env_keys: &["PROMOKIT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: &graceful_shutdown_secs,
        },
        Field {
            key_path: "submission.mode",
            env_keys: &["PROMOKIT_SUBMISSION_MODE"],
            value: config.submission.mode.as_str(),
        },
        Field {
            key_path: "submission.recipient",
            env_keys: &["PROMOKIT_SUBMISSION_RECIPIENT"],
            value: &config.submission.recipient,
        },
        Field {
            key_path: "submission.webhook_url",
            env_keys: &["PROMOKIT_SUBMISSION_WEBHOOK_URL"],
            value: config.submission.webhook_url.as_deref().unwrap_or("<unset>"),
        },
        Field {
            key_path: "submission.api_key",
            env_keys: &["PROMOKIT_SUBMISSION_API_KEY"],
            value: api_key,
        },
        Field {
            key_path: "submission.timeout_secs",
            env_keys: &["PROMOKIT_SUBMISSION_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "submission.max_retries",
            env_keys: &["PROMOKIT_SUBMISSION_MAX_RETRIES"],
            value: &max_retries,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["PROMOKIT_LOGGING_LEVEL", "PROMOKIT_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["PROMOKIT_LOGGING_FORMAT", "PROMOKIT_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key_path,
            field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("promokit.toml"), PathBuf::from("config/promokit.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn nested_key_paths_are_found_in_the_file_document() {
        let doc: Value = "[submission]\nmode = \"webhook\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "submission.mode"));
        assert!(!contains_path(&doc, "submission.recipient"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
