//! In-memory canvas that records every operation.
//!
//! Backs the headless CLI host and the test suite. Clones share the same
//! recording, so a test can keep one clone while the engine owns another.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::geo::{GeoBounds, GeoPoint};
use crate::overlay::EntityKind;

use super::canvas::MapCanvas;
use super::types::{ClickCallback, Geometry, LayerHandle, LayerStyle, PopupContent};

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Create { center: GeoPoint, zoom: u8 },
    Destroy,
    AddLayer {
        handle: LayerHandle,
        kind: EntityKind,
        id: String,
    },
    RemoveLayer(LayerHandle),
    BindPopup(LayerHandle),
    OnClick(LayerHandle),
    SetView { center: GeoPoint, zoom: u8 },
    FitBounds(GeoBounds),
}

impl CanvasOp {
    /// Returns true for operations that change the layer set.
    pub fn is_layer_op(&self) -> bool {
        matches!(
            self,
            Self::AddLayer { .. } | Self::RemoveLayer(_) | Self::BindPopup(_) | Self::OnClick(_)
        )
    }
}

/// A layer currently attached to the recording canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLayer {
    pub kind: EntityKind,
    pub id: String,
    pub geometry: Geometry,
    pub style: LayerStyle,
    pub popup: Option<PopupContent>,
}

#[derive(Default)]
struct Recording {
    ops: Vec<CanvasOp>,
    next_handle: u64,
    created: bool,
    layers: BTreeMap<LayerHandle, RecordedLayer>,
    clicks: HashMap<LayerHandle, ClickCallback>,
    view: Option<(GeoPoint, u8)>,
    fitted: Option<GeoBounds>,
}

/// Canvas that records calls instead of drawing.
#[derive(Clone, Default)]
pub struct RecordingCanvas {
    inner: Arc<Mutex<Recording>>,
}

impl std::fmt::Debug for RecordingCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recording = self.lock();
        f.debug_struct("RecordingCanvas")
            .field("ops", &recording.ops.len())
            .field("layers", &recording.layers.len())
            .finish()
    }
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        // A panicking test thread must not hide the recording from others.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every operation so far, in order.
    pub fn ops(&self) -> Vec<CanvasOp> {
        self.lock().ops.clone()
    }

    /// Number of operations so far.
    pub fn op_count(&self) -> usize {
        self.lock().ops.len()
    }

    /// Forget recorded operations (attached layers are kept).
    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Returns true while the map instance exists.
    pub fn is_created(&self) -> bool {
        self.lock().created
    }

    /// Attached layers ordered by handle.
    pub fn layers(&self) -> Vec<(LayerHandle, RecordedLayer)> {
        self.lock()
            .layers
            .iter()
            .map(|(handle, layer)| (*handle, layer.clone()))
            .collect()
    }

    pub fn layer_count(&self) -> usize {
        self.lock().layers.len()
    }

    pub fn layer(&self, handle: LayerHandle) -> Option<RecordedLayer> {
        self.lock().layers.get(&handle).cloned()
    }

    /// Handle of the attached layer drawing `(kind, id)`.
    pub fn find_layer(&self, kind: EntityKind, id: &str) -> Option<LayerHandle> {
        self.lock()
            .layers
            .iter()
            .find(|(_, layer)| layer.kind == kind && layer.id == id)
            .map(|(handle, _)| *handle)
    }

    /// The click handler registered for a layer.
    pub fn click_handler(&self, handle: LayerHandle) -> Option<ClickCallback> {
        self.lock().clicks.get(&handle).cloned()
    }

    /// Simulate a user click. Returns false if the layer has no handler.
    pub fn click(&self, handle: LayerHandle) -> bool {
        // Call outside the lock; the handler may re-enter the canvas.
        match self.click_handler(handle) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Last view set through `create` or `set_view`.
    pub fn view(&self) -> Option<(GeoPoint, u8)> {
        self.lock().view
    }

    /// Last bounds passed to `fit_bounds`.
    pub fn fitted_bounds(&self) -> Option<GeoBounds> {
        self.lock().fitted
    }
}

impl MapCanvas for RecordingCanvas {
    fn create(&mut self, center: GeoPoint, zoom: u8) {
        let mut recording = self.lock();
        recording.created = true;
        recording.view = Some((center, zoom));
        recording.ops.push(CanvasOp::Create { center, zoom });
    }

    fn destroy(&mut self) {
        let mut recording = self.lock();
        recording.created = false;
        recording.layers.clear();
        recording.clicks.clear();
        recording.ops.push(CanvasOp::Destroy);
    }

    fn add_layer(
        &mut self,
        kind: EntityKind,
        id: &str,
        geometry: &Geometry,
        style: &LayerStyle,
    ) -> LayerHandle {
        let mut recording = self.lock();
        recording.next_handle += 1;
        let handle = LayerHandle::new(recording.next_handle);
        recording.layers.insert(
            handle,
            RecordedLayer {
                kind,
                id: id.to_string(),
                geometry: *geometry,
                style: style.clone(),
                popup: None,
            },
        );
        recording.ops.push(CanvasOp::AddLayer {
            handle,
            kind,
            id: id.to_string(),
        });
        handle
    }

    fn remove_layer(&mut self, handle: LayerHandle) {
        let mut recording = self.lock();
        recording.layers.remove(&handle);
        recording.clicks.remove(&handle);
        recording.ops.push(CanvasOp::RemoveLayer(handle));
    }

    fn bind_popup(&mut self, handle: LayerHandle, content: &PopupContent) {
        let mut recording = self.lock();
        if let Some(layer) = recording.layers.get_mut(&handle) {
            layer.popup = Some(content.clone());
        }
        recording.ops.push(CanvasOp::BindPopup(handle));
    }

    fn on_click(&mut self, handle: LayerHandle, callback: ClickCallback) {
        let mut recording = self.lock();
        recording.clicks.insert(handle, callback);
        recording.ops.push(CanvasOp::OnClick(handle));
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        let mut recording = self.lock();
        recording.view = Some((center, zoom));
        recording.ops.push(CanvasOp::SetView { center, zoom });
    }

    fn fit_bounds(&mut self, bounds: &GeoBounds) {
        let mut recording = self.lock();
        recording.fitted = Some(*bounds);
        recording.ops.push(CanvasOp::FitBounds(*bounds));
    }
}
