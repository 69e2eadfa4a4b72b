//! Map viewport control.
//!
//! Decides where the map looks: the settled fix when there is one, the
//! configured default otherwise. Recentres once per transition into
//! `Settled` and fits the view to tracked persons after a refresh.

use crate::geo::{GeoBounds, GeoPoint};
use crate::location::{Fix, SensorState};
use crate::surface::{MapSurface, SurfaceError};

/// Default map center (New York City).
pub const DEFAULT_CENTER_LAT: f64 = 40.7128;
pub const DEFAULT_CENTER_LON: f64 = -74.0060;

/// Default zoom without a fix.
pub const DEFAULT_ZOOM: u8 = 13;

/// Zoom used when centring on a fix.
pub const DEFAULT_FIX_ZOOM: u8 = 16;

/// Padding applied around fitted bounds, as a ratio of the span.
pub const DEFAULT_FIT_PADDING: f64 = 0.1;

/// Viewport configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    /// Center used until a fix settles.
    pub default_center: GeoPoint,
    /// Zoom used until a fix settles.
    pub default_zoom: u8,
    /// Zoom used when centring on a fix.
    pub fix_zoom: u8,
    /// Padding ratio for `fit_to_bounds`.
    pub fit_padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            default_center: GeoPoint {
                latitude: DEFAULT_CENTER_LAT,
                longitude: DEFAULT_CENTER_LON,
            },
            default_zoom: DEFAULT_ZOOM,
            fix_zoom: DEFAULT_FIX_ZOOM,
            fit_padding: DEFAULT_FIT_PADDING,
        }
    }
}

/// Chooses center and zoom and issues view commands.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    fix: Option<Fix>,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self { config, fix: None }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// The fix currently driving the view, if the sensor is settled.
    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }

    /// Center and zoom the map should show right now.
    pub fn target_view(&self) -> (GeoPoint, u8) {
        match &self.fix {
            Some(fix) => (fix.position, self.config.fix_zoom),
            None => (self.config.default_center, self.config.default_zoom),
        }
    }

    /// Track a sensor transition.
    ///
    /// Returns true when the transition recentred the map.
    pub fn on_location_state(
        &mut self,
        surface: &mut MapSurface,
        state: &SensorState,
    ) -> Result<bool, SurfaceError> {
        match state {
            SensorState::Settled(fix) => {
                self.fix = Some(fix.clone());
                surface.set_view(fix.position, self.config.fix_zoom)?;
                tracing::debug!(
                    center = %fix.position,
                    zoom = self.config.fix_zoom,
                    "Recentred on fix"
                );
                Ok(true)
            }
            // A new episode or a failure: fall back to the default center
            // for future decisions but leave the current view alone.
            _ => {
                self.fix = None;
                Ok(false)
            }
        }
    }

    /// Fit the view to the padded box around `points`.
    ///
    /// Returns false (and issues nothing) when there are no points.
    pub fn fit_to_bounds<I>(&self, surface: &mut MapSurface, points: I) -> Result<bool, SurfaceError>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let Some(bounds) = GeoBounds::from_points(points) else {
            return Ok(false);
        };
        let padded = bounds.padded(self.config.fit_padding);
        surface.fit_bounds(&padded)?;
        tracing::debug!(
            south = padded.south,
            west = padded.west,
            north = padded.north,
            east = padded.east,
            "Fitted view to bounds"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationError;
    use crate::surface::{CanvasOp, RecordingCanvas};

    fn setup() -> (ViewportController, MapSurface, RecordingCanvas) {
        let controller = ViewportController::new(ViewportConfig::default());
        let canvas = RecordingCanvas::new();
        let mut surface = MapSurface::new(canvas.clone());
        let (center, zoom) = controller.target_view();
        surface.mount(center, zoom).unwrap();
        canvas.clear_ops();
        (controller, surface, canvas)
    }

    #[test]
    fn test_default_view_without_fix() {
        let (controller, _surface, canvas) = setup();
        let (center, zoom) = controller.target_view();
        assert_eq!(center.latitude, DEFAULT_CENTER_LAT);
        assert_eq!(zoom, DEFAULT_ZOOM);
        assert_eq!(canvas.view().map(|(_, z)| z), Some(DEFAULT_ZOOM));
    }

    #[test]
    fn test_settled_fix_recentres_at_fix_zoom() {
        let (mut controller, mut surface, canvas) = setup();
        let here = GeoPoint::new(-1.29, 36.82).unwrap();
        let state = SensorState::Settled(Fix::now(here, 30.0));

        assert!(controller.on_location_state(&mut surface, &state).unwrap());
        assert_eq!(
            canvas.ops(),
            vec![CanvasOp::SetView {
                center: here,
                zoom: DEFAULT_FIX_ZOOM
            }]
        );
        assert_eq!(controller.target_view(), (here, DEFAULT_FIX_ZOOM));
    }

    #[test]
    fn test_failure_keeps_view_and_reverts_target() {
        let (mut controller, mut surface, canvas) = setup();
        let state = SensorState::Failed(LocationError::PermissionDenied);

        assert!(!controller.on_location_state(&mut surface, &state).unwrap());
        assert_eq!(canvas.op_count(), 0);
        assert_eq!(controller.target_view().1, DEFAULT_ZOOM);
    }

    #[test]
    fn test_fit_to_bounds_pads_box() {
        let (controller, mut surface, canvas) = setup();
        let points = vec![
            GeoPoint::new(10.0, 20.0).unwrap(),
            GeoPoint::new(12.0, 24.0).unwrap(),
        ];

        assert!(controller.fit_to_bounds(&mut surface, points).unwrap());
        let fitted = canvas.fitted_bounds().unwrap();
        assert!((fitted.south - 9.8).abs() < 1e-9);
        assert!((fitted.north - 12.2).abs() < 1e-9);
        assert!((fitted.west - 19.6).abs() < 1e-9);
        assert!((fitted.east - 24.4).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_bounds_without_points_is_noop() {
        let (controller, mut surface, canvas) = setup();
        assert!(!controller
            .fit_to_bounds(&mut surface, Vec::<GeoPoint>::new())
            .unwrap());
        assert_eq!(canvas.op_count(), 0);
    }
}
