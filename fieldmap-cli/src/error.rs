//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::io;
use std::process;

use fieldmap::config::ConfigFileError;
use fieldmap::refresh::FetchError;
use fieldmap::surface::SurfaceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Configuration file could not be read, parsed or written
    Config(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to build the backend client
    Backend(FetchError),
    /// The map surface could not be mounted
    Surface(SurfaceError),
    /// Tokio runtime or task failure
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in your config file, or print the defaults with:");
                eprintln!("  fieldmap config show --defaults");
            }
            CliError::Config(ConfigFileError::AlreadyExists(_)) => {
                eprintln!();
                eprintln!("Pass --force to overwrite it with defaults.");
            }
            CliError::Backend(_) => {
                eprintln!();
                eprintln!("Check api_url and api_token in the [refresh] section of config.ini.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Backend(e) => write!(f, "Failed to create backend client: {}", e),
            CliError::Surface(e) => write!(f, "Failed to start map engine: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Backend(e) => Some(e),
            CliError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Backend(e)
    }
}

impl From<SurfaceError> for CliError {
    fn from(e: SurfaceError) -> Self {
        CliError::Surface(e)
    }
}
