//! Host rendering canvas interface.

use crate::geo::{GeoBounds, GeoPoint};
use crate::overlay::EntityKind;

use super::types::{ClickCallback, Geometry, LayerHandle, LayerStyle, PopupContent};

/// Primitive map operations provided by the host.
///
/// Implementations wrap a concrete map widget. The engine only ever talks to
/// a canvas through [`super::MapSurface`], which owns its lifecycle and
/// guards every call with the liveness flag.
pub trait MapCanvas: Send {
    /// Create the map instance.
    fn create(&mut self, center: GeoPoint, zoom: u8);

    /// Destroy the map instance along with every attached layer.
    fn destroy(&mut self);

    /// Attach a new layer and return its handle.
    fn add_layer(
        &mut self,
        kind: EntityKind,
        id: &str,
        geometry: &Geometry,
        style: &LayerStyle,
    ) -> LayerHandle;

    /// Detach and destroy a layer.
    fn remove_layer(&mut self, handle: LayerHandle);

    /// Attach popup content to a layer.
    fn bind_popup(&mut self, handle: LayerHandle, content: &PopupContent);

    /// Register the click handler of a layer.
    fn on_click(&mut self, handle: LayerHandle, callback: ClickCallback);

    /// Move the view.
    fn set_view(&mut self, center: GeoPoint, zoom: u8);

    /// Fit the view to a bounding box.
    fn fit_bounds(&mut self, bounds: &GeoBounds);
}
