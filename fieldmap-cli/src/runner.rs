//! CLI runner for common setup.
//!
//! Loads the config file and initializes logging for commands that run the
//! engine.

use std::path::{Path, PathBuf};

use fieldmap::config::{config_file_path, ConfigFile};
use fieldmap::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log file writer alive while the runner exists
    logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load config (from `config_path` or the default location) and start
    /// logging to the file it names.
    pub fn new(config_path: Option<&Path>, debug: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard =
            init_logging(&config.logging.file, debug).map_err(CliError::LoggingInit)?;

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("FieldMap v{}", fieldmap::VERSION);
        info!(
            command,
            config = %self.config_path.display(),
            log_file = %self.logging_guard.path().display(),
            "FieldMap CLI starting"
        );
    }
}
