//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::defaults::MAX_ZOOM;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::geo::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a value, mapping failures to `InvalidValue` with `reason`.
fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_in_range(
    section: &str,
    key: &str,
    value: &str,
    min: f64,
    max: f64,
    reason: &str,
) -> Result<f64, ConfigFileError> {
    let parsed: f64 = parse_value(section, key, value, reason)?;
    if parsed.is_finite() && (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(invalid(section, key, value, reason))
    }
}

fn parse_positive_secs(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    let reason = "must be a positive integer (seconds)";
    let parsed: u64 = parse_value(section, key, value, reason)?;
    if parsed == 0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

fn parse_zoom(section: &str, key: &str, value: &str) -> Result<u8, ConfigFileError> {
    let reason = "must be an integer between 0 and 22";
    let parsed: u8 = parse_value(section, key, value, reason)?;
    if parsed > MAX_ZOOM {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [map] section
    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = section.get("default_latitude") {
            config.map.default_latitude = parse_in_range(
                "map",
                "default_latitude",
                v,
                MIN_LAT,
                MAX_LAT,
                "must be a latitude between -90 and 90",
            )?;
        }
        if let Some(v) = section.get("default_longitude") {
            config.map.default_longitude = parse_in_range(
                "map",
                "default_longitude",
                v,
                MIN_LON,
                MAX_LON,
                "must be a longitude between -180 and 180",
            )?;
        }
        if let Some(v) = section.get("default_zoom") {
            config.map.default_zoom = parse_zoom("map", "default_zoom", v)?;
        }
        if let Some(v) = section.get("fix_zoom") {
            config.map.fix_zoom = parse_zoom("map", "fix_zoom", v)?;
        }
        if let Some(v) = section.get("fit_padding") {
            config.map.fit_padding = parse_in_range(
                "map",
                "fit_padding",
                v,
                0.0,
                1.0,
                "must be a ratio between 0.0 and 1.0",
            )?;
        }
    }

    // [location] section
    if let Some(section) = ini.section(Some("location")) {
        if let Some(v) = section.get("request_timeout_secs") {
            config.location.request_timeout_secs =
                parse_positive_secs("location", "request_timeout_secs", v)?;
        }
        if let Some(v) = section.get("maximum_age_secs") {
            config.location.maximum_age_secs = parse_value(
                "location",
                "maximum_age_secs",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("watch_window_secs") {
            config.location.watch_window_secs =
                parse_positive_secs("location", "watch_window_secs", v)?;
        }
        if let Some(v) = section.get("settle_accuracy_m") {
            config.location.settle_accuracy_m = parse_in_range(
                "location",
                "settle_accuracy_m",
                v,
                0.0,
                f64::MAX,
                "must be a non-negative number of meters",
            )?;
        }
        if let Some(v) = section.get("good_accuracy_m") {
            config.location.good_accuracy_m = parse_in_range(
                "location",
                "good_accuracy_m",
                v,
                0.0,
                f64::MAX,
                "must be a non-negative number of meters",
            )?;
        }
        if let Some(v) = section.get("improvement_factor") {
            let factor = parse_in_range(
                "location",
                "improvement_factor",
                v,
                0.0,
                1.0,
                "must be a ratio greater than 0.0 and at most 1.0",
            )?;
            if factor == 0.0 {
                return Err(invalid(
                    "location",
                    "improvement_factor",
                    v,
                    "must be a ratio greater than 0.0 and at most 1.0",
                ));
            }
            config.location.improvement_factor = factor;
        }
    }

    // [refresh] section
    if let Some(section) = ini.section(Some("refresh")) {
        if let Some(v) = section.get("api_url") {
            let v = v.trim();
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(
                    "refresh",
                    "api_url",
                    v,
                    "must be an http:// or https:// URL",
                ));
            }
            config.refresh.api_url = v.to_string();
        }
        if let Some(v) = section.get("api_token") {
            let v = v.trim();
            if !v.is_empty() {
                config.refresh.api_token = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("interval_secs") {
            config.refresh.interval_secs = parse_positive_secs("refresh", "interval_secs", v)?;
        }
        if let Some(v) = section.get("request_timeout_secs") {
            config.refresh.request_timeout_secs =
                parse_positive_secs("refresh", "request_timeout_secs", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
