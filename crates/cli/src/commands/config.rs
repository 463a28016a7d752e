use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use storefront_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    };

    push(
        "storage.backend",
        config.storage.backend.as_str().to_string(),
        &["STOREFRONT_STORAGE_BACKEND"],
    );
    push(
        "storage.data_dir",
        config.storage.data_dir.display().to_string(),
        &["STOREFRONT_STORAGE_DATA_DIR"],
    );
    push("database.url", redact_url(&config.database.url), &["STOREFRONT_DATABASE_URL"]);
    push(
        "database.max_connections",
        config.database.max_connections.to_string(),
        &["STOREFRONT_DATABASE_MAX_CONNECTIONS"],
    );
    push(
        "database.timeout_secs",
        config.database.timeout_secs.to_string(),
        &["STOREFRONT_DATABASE_TIMEOUT_SECS"],
    );
    push(
        "server.bind_address",
        config.server.bind_address.clone(),
        &["STOREFRONT_SERVER_BIND_ADDRESS"],
    );
    push("server.port", config.server.port.to_string(), &["STOREFRONT_SERVER_PORT"]);
    push(
        "server.graceful_shutdown_secs",
        config.server.graceful_shutdown_secs.to_string(),
        &["STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );
    push(
        "catalog.default_page_size",
        config.catalog.default_page_size.to_string(),
        &["STOREFRONT_CATALOG_DEFAULT_PAGE_SIZE"],
    );
    push(
        "catalog.max_page_size",
        config.catalog.max_page_size.to_string(),
        &["STOREFRONT_CATALOG_MAX_PAGE_SIZE"],
    );
    push(
        "logging.level",
        config.logging.level.clone(),
        &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format).to_lowercase(),
        &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
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

/// Hides credentials embedded in a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => url.to_string(),
    }
}
