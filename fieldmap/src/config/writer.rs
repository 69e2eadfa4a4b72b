//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let api_token = config.refresh.api_token.as_deref().unwrap_or("");

    format!(
        r#"[map]
; Map center shown until a location fix settles
default_latitude = {}
default_longitude = {}
; Zoom shown until a fix settles (0-22)
default_zoom = {}
; Zoom used when centring on a fix (0-22)
fix_zoom = {}
; Padding around fitted bounds as a ratio of the span
fit_padding = {}

[location]
; Single-shot request timeout (seconds)
request_timeout_secs = {}
; Accept cached single-shot results up to this age (seconds)
maximum_age_secs = {}
; How long to watch for a better reading after a coarse fix (seconds)
watch_window_secs = {}
; A fix at or below this accuracy settles immediately (meters)
settle_accuracy_m = {}
; Fixes at or below this accuracy are reported as good (meters)
good_accuracy_m = {}
; A watch reading at most this fraction of the initial accuracy also settles
improvement_factor = {}

[refresh]
; Backend base URL
api_url = {}
; Bearer token (leave empty for none)
api_token = {}
; Seconds between overlay refreshes
interval_secs = {}
; HTTP timeout per request (seconds)
request_timeout_secs = {}

[logging]
file = {}
"#,
        config.map.default_latitude,
        config.map.default_longitude,
        config.map.default_zoom,
        config.map.fix_zoom,
        config.map.fit_padding,
        config.location.request_timeout_secs,
        config.location.maximum_age_secs,
        config.location.watch_window_secs,
        config.location.settle_accuracy_m,
        config.location.good_accuracy_m,
        config.location.improvement_factor,
        config.refresh.api_url,
        api_token,
        config.refresh.interval_secs,
        config.refresh.request_timeout_secs,
        path_to_string(&config.logging.file),
    )
}
