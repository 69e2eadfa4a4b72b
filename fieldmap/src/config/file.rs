//! Reading and writing `config.ini`.
//!
//! A missing file is not an error: every key has a default, so an absent
//! file loads as [`ConfigFile::default`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;

/// Name of the per-user config directory under `$HOME`.
const CONFIG_DIR_NAME: &str = ".fieldmap";

/// Name of the config file inside [`config_directory`].
const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Malformed INI: {0}")]
    Syntax(#[from] ini::ParseError),

    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Refusing to replace a file the user already has.
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Load `~/.fieldmap/config.ini`, or defaults when it is absent.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load `path`, or defaults when it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        super::parser::parse_ini(&ini)
    }

    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)?;
        super::parser::parse_ini(&ini)
    }

    /// Write the commented INI form to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigFileError::Write { path, source }
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_error(dir))?;
        }
        fs::write(path, self.to_config_string()).map_err(write_error(path))
    }

    /// Write defaults to `path` unless a file is already there.
    pub fn init_at(path: &Path) -> Result<Self, ConfigFileError> {
        if path.exists() {
            return Err(ConfigFileError::AlreadyExists(path.to_path_buf()));
        }
        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }
}

/// `~/.fieldmap`, or `./.fieldmap` when the home directory is unknown.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}
