//! Logging initialization

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter directive in effect: `--debug` forces debug, then RUST_LOG, then
/// the configured level
pub fn filter_directive(settings: &LoggingConfig, debug: bool, rust_log: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| settings.level.clone())
}

/// Install the global tracing subscriber
///
/// With `logging.file` set, logs are appended to that file without ANSI
/// codes; otherwise they go to stderr.
pub fn init_logging(settings: &LoggingConfig, debug: bool) -> Result<()> {
    let directive = filter_directive(settings, debug, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter: {}", directive))?;

    match &settings.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_env_filter(filter)
                .with_ansi(false) // No ANSI codes in log file
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        }
    }

    tracing::debug!("Logging initialized with filter '{}'", directive);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        let settings = LoggingConfig::default();
        assert_eq!(filter_directive(&settings, false, None), "info");
        assert_eq!(
            filter_directive(&settings, false, Some("kubechat=trace".to_string())),
            "kubechat=trace"
        );
        assert_eq!(
            filter_directive(&settings, true, Some("warn".to_string())),
            "debug"
        );
        assert_eq!(filter_directive(&settings, false, Some("  ".to_string())), "info");
    }
}
