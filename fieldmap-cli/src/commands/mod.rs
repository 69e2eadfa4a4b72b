//! CLI command implementations.
//!
//! - [`config`] - Configuration management (show, path, init)
//! - [`run`] - Run the engine headless

pub mod config;
pub mod run;
