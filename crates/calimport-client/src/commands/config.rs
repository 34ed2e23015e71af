//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout, with plain-text tokens masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let problems = problems(config);
    if problems.is_empty() {
        println!("Configuration is valid.");
        return Ok(());
    }

    for problem in &problems {
        eprintln!("  - {}", problem);
    }
    Err(ClientError::Config(format!(
        "{} problem(s) found",
        problems.len()
    )))
}

/// Collects every problem in the configuration.
fn problems(config: &ClientConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = config.pipeline() {
        problems.push(e);
    }

    if config.feed.url.is_some()
        && let Err(e) = config.feed.to_feed_config()
    {
        problems.push(e);
    }

    if config.export.is_configured()
        && let Err(e) = config.export.to_export_config()
    {
        problems.push(e);
    }

    problems
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
