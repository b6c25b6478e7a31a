pub mod retry;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

/// Load the run configuration from a YAML file, with `SCRAPER__*`
/// environment variables taking precedence (e.g. `SCRAPER__SCAN_DEPTH=500`).
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<Config> {
    let config_path = config_path.as_ref();
    info!("Config path: {}", config_path.to_string_lossy());

    let config = config::Config::builder()
        .add_source(config::File::from(config_path).format(config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("SCRAPER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .context("failed to read config file")?;

    config
        .try_deserialize()
        .context("failed to parse config")
}

pub(crate) fn strip_html(error: &str) -> String {
    // If the error contains HTML tags, extract just the text content
    if error.contains("<!doctype html>") || error.contains("<html>") {
        // Remove all HTML tags and return the first non-empty line of text
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        // Return original error if no HTML
        error.to_string()
    }
}
