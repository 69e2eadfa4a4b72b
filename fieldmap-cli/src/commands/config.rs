//! Configuration management CLI commands.
//!
//! Provides `config show`, `config path` and `config init`.

use std::path::PathBuf;

use clap::Subcommand;
use fieldmap::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as INI
    Show {
        /// Config file to read instead of ~/.fieldmap/config.ini
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the built-in defaults, ignoring any config file
        #[arg(long)]
        defaults: bool,
    },

    /// Show the configuration file path
    Path,

    /// Write a commented config file with default values
    Init {
        /// Where to write (defaults to ~/.fieldmap/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { config, defaults } => run_show(config, defaults),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init { config, force } => run_init(config, force),
    }
}

fn run_show(path: Option<PathBuf>, defaults: bool) -> Result<(), CliError> {
    let config = if defaults {
        ConfigFile::default()
    } else {
        ConfigFile::load_from(&path.unwrap_or_else(config_file_path))?
    };
    print!("{}", config.to_config_string());
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist; defaults are in use)");
    }
    Ok(())
}

fn run_init(path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    if force {
        ConfigFile::default().save_to(&path)?;
    } else {
        ConfigFile::init_at(&path)?;
    }
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
