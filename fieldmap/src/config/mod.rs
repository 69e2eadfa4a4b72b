//! User configuration.
//!
//! The INI file at `~/.fieldmap/config.ini` overlays the component defaults.
//! Every key is optional.
//!
//! # Example
//!
//! ```
//! use fieldmap::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str("[map]\nfix_zoom = 17\n").unwrap();
//! assert_eq!(config.viewport_config().fix_zoom, 17);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{DEFAULT_LOG_FILE_NAME, MAX_ZOOM};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, LocationSettings, LoggingSettings, MapSettings, RefreshSettings};
