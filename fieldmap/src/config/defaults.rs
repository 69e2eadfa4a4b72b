//! Default values and constants for all configuration settings.
//!
//! Component defaults are re-exported from the components themselves so the
//! config file and the library can never disagree.

use super::file::config_directory;
use super::settings::*;

pub use crate::location::{
    DEFAULT_GOOD_ACCURACY_M, DEFAULT_IMPROVEMENT_FACTOR, DEFAULT_MAXIMUM_AGE_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SETTLE_ACCURACY_M, DEFAULT_WATCH_WINDOW_SECS,
};
pub use crate::refresh::{DEFAULT_API_URL, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_SECS};
pub use crate::viewport::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, DEFAULT_FIT_PADDING, DEFAULT_FIX_ZOOM, DEFAULT_ZOOM,
};

/// Highest zoom level accepted in the config file.
pub const MAX_ZOOM: u8 = 22;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "fieldmap.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            map: MapSettings {
                default_latitude: DEFAULT_CENTER_LAT,
                default_longitude: DEFAULT_CENTER_LON,
                default_zoom: DEFAULT_ZOOM,
                fix_zoom: DEFAULT_FIX_ZOOM,
                fit_padding: DEFAULT_FIT_PADDING,
            },
            location: LocationSettings {
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                maximum_age_secs: DEFAULT_MAXIMUM_AGE_SECS,
                watch_window_secs: DEFAULT_WATCH_WINDOW_SECS,
                settle_accuracy_m: DEFAULT_SETTLE_ACCURACY_M,
                good_accuracy_m: DEFAULT_GOOD_ACCURACY_M,
                improvement_factor: DEFAULT_IMPROVEMENT_FACTOR,
            },
            refresh: RefreshSettings {
                api_url: DEFAULT_API_URL.to_string(),
                api_token: None,
                interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
                request_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
