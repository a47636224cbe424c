// src/logging.rs
use crate::config::LoggingConfig;
use crate::error::{Result, SplitError};
use chrono::Local;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, Naming};
use log::info;

const LOG_PREFIX: &str = "xrandr_split";

/// Initialize logging system
///
/// The shim lives inside arbitrary client processes, so it only ever logs to a file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if !config.is_enabled() {
        return Ok(());
    }

    let timestamp = Local::now().format("%Y-%m-%d_%H_%M_%S").to_string();
    let log_filename = format!("{}_{}_{}", LOG_PREFIX, std::process::id(), timestamp);

    Logger::try_with_str(&config.level)
        .map_err(|e| SplitError::config(format!("Failed to create logger: {}", e)))?
        .format(flexi_logger::detailed_format)
        .log_to_file(
            FileSpec::default()
                .directory(&config.directory)
                .basename(log_filename)
                .suffix("log"),
        )
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .start()
        .map_err(|e| SplitError::config(format!("Failed to start logger: {}", e)))?;

    info!("[logging] started, level {}", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_logger_is_noop() {
        let config = LoggingConfig {
            level: "OFF".to_string(),
            ..LoggingConfig::default()
        };
        assert!(init(&config).is_ok());
    }
}
