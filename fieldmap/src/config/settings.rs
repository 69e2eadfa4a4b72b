//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types; conversions into component configs live at
//! the bottom of this file.

use std::path::PathBuf;
use std::time::Duration;

use crate::geo::GeoPoint;
use crate::location::LocationConfig;
use crate::refresh::RefreshConfig;
use crate::viewport::ViewportConfig;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Map view settings
    pub map: MapSettings,
    /// Location acquisition settings
    pub location: LocationSettings,
    /// Overlay refresh settings
    pub refresh: RefreshSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Map view configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Latitude of the center shown before a fix settles
    pub default_latitude: f64,
    /// Longitude of the center shown before a fix settles
    pub default_longitude: f64,
    /// Zoom shown before a fix settles
    pub default_zoom: u8,
    /// Zoom used when centring on a fix
    pub fix_zoom: u8,
    /// Padding ratio around fitted bounds
    pub fit_padding: f64,
}

/// Location acquisition configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    /// Single-shot request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum age of a cached single-shot result in seconds
    pub maximum_age_secs: u64,
    /// Refinement watch window in seconds
    pub watch_window_secs: u64,
    /// Accuracy (meters) at or below which a fix settles immediately
    pub settle_accuracy_m: f64,
    /// Accuracy (meters) at or below which a fix is reported as good
    pub good_accuracy_m: f64,
    /// Ratio of the baseline accuracy a watch reading must reach
    pub improvement_factor: f64,
}

/// Overlay refresh configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSettings {
    /// Backend base URL
    pub api_url: String,
    /// Bearer token (optional)
    pub api_token: Option<String>,
    /// Seconds between scheduled refreshes
    pub interval_secs: u64,
    /// HTTP timeout per request in seconds
    pub request_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl From<&MapSettings> for ViewportConfig {
    fn from(settings: &MapSettings) -> Self {
        Self {
            default_center: GeoPoint {
                latitude: settings.default_latitude,
                longitude: settings.default_longitude,
            },
            default_zoom: settings.default_zoom,
            fix_zoom: settings.fix_zoom,
            fit_padding: settings.fit_padding,
        }
    }
}

impl From<&LocationSettings> for LocationConfig {
    fn from(settings: &LocationSettings) -> Self {
        Self {
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            maximum_age: Duration::from_secs(settings.maximum_age_secs),
            watch_window: Duration::from_secs(settings.watch_window_secs),
            settle_accuracy_m: settings.settle_accuracy_m,
            good_accuracy_m: settings.good_accuracy_m,
            improvement_factor: settings.improvement_factor,
        }
    }
}

impl From<&RefreshSettings> for RefreshConfig {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs),
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

impl ConfigFile {
    pub fn viewport_config(&self) -> ViewportConfig {
        ViewportConfig::from(&self.map)
    }

    pub fn location_config(&self) -> LocationConfig {
        LocationConfig::from(&self.location)
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig::from(&self.refresh)
    }
}
