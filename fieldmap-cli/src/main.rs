//! FieldMap CLI - headless host for the map engine
//!
//! Runs the engine against the configured backend with a simulated location
//! sensor and a recording canvas, and manages the config file.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(version = fieldmap::VERSION)]
#[command(about = "Live overlay map engine for field-safety dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine headless until Ctrl-C or --duration elapses
    Run {
        /// Config file to use instead of ~/.fieldmap/config.ini
        #[arg(long)]
        config: Option<PathBuf>,

        /// Simulated device latitude (defaults to the map's default center)
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Simulated device longitude (defaults to the map's default center)
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Accuracy of the simulated single-shot fix in meters
        #[arg(long, default_value = "25")]
        accuracy: f64,

        /// Accuracy of a refined reading delivered during the watch window
        #[arg(long)]
        refined_accuracy: Option<f64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            lat,
            lon,
            accuracy,
            refined_accuracy,
            duration,
            debug,
        } => commands::run::run(RunArgs {
            config,
            lat,
            lon,
            accuracy,
            refined_accuracy,
            duration,
            debug,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
