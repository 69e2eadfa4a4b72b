//! Map surface lifecycle.
//!
//! [`MapSurface`] owns the single live map instance: it creates it on mount,
//! destroys it on unmount and is the only holder of [`LayerHandle`]s. Every
//! operation after unmount fails with [`SurfaceError::NotMounted`], and click
//! handlers registered through the surface become no-ops once it is dead.

mod canvas;
mod recording;
mod types;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::geo::{GeoBounds, GeoPoint};
use crate::overlay::EntityKind;

pub use canvas::MapCanvas;
pub use recording::{CanvasOp, RecordedLayer, RecordingCanvas};
pub use types::{ClickCallback, Color, Geometry, LayerHandle, LayerStyle, PopupContent};

/// Map surface errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The map instance does not exist (never mounted or already torn down).
    #[error("Map surface is not mounted")]
    NotMounted,

    /// `mount` was called on a live surface.
    #[error("Map surface is already mounted")]
    AlreadyMounted,

    /// The handle does not belong to a layer on this surface.
    #[error("Unknown layer handle: {0}")]
    UnknownLayer(LayerHandle),
}

/// Shared view of whether the surface is still alive.
///
/// Cloned into callbacks and background tasks so late deliveries can bail
/// out after teardown.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, alive: bool) {
        self.0.store(alive, Ordering::Release);
    }
}

/// Owner of the live map instance and its layers.
pub struct MapSurface {
    canvas: Box<dyn MapCanvas>,
    liveness: Liveness,
    layers: HashSet<LayerHandle>,
}

impl std::fmt::Debug for MapSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSurface")
            .field("alive", &self.liveness.is_alive())
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl MapSurface {
    /// Wrap a host canvas. Nothing is drawn until [`mount`](Self::mount).
    pub fn new(canvas: impl MapCanvas + 'static) -> Self {
        Self {
            canvas: Box::new(canvas),
            liveness: Liveness::default(),
            layers: HashSet::new(),
        }
    }

    /// Create the map instance.
    pub fn mount(&mut self, center: GeoPoint, zoom: u8) -> Result<(), SurfaceError> {
        if self.is_alive() {
            return Err(SurfaceError::AlreadyMounted);
        }
        // Callbacks from a previous mount keep the old, dead flag.
        self.liveness = Liveness::default();
        self.canvas.create(center, zoom);
        self.liveness.set(true);
        info!(center = %center, zoom, "Map surface mounted");
        Ok(())
    }

    /// Destroy the map instance and every layer on it.
    ///
    /// Idempotent. After this returns, click handlers registered through the
    /// surface do nothing.
    pub fn unmount(&mut self) {
        if !self.is_alive() {
            return;
        }
        self.liveness.set(false);
        self.canvas.destroy();
        let dropped = self.layers.len();
        self.layers.clear();
        info!(layers = dropped, "Map surface unmounted");
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Liveness flag of the current mount.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Number of attached layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn ensure_alive(&self) -> Result<(), SurfaceError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SurfaceError::NotMounted)
        }
    }

    fn ensure_layer(&self, handle: LayerHandle) -> Result<(), SurfaceError> {
        self.ensure_alive()?;
        if self.layers.contains(&handle) {
            Ok(())
        } else {
            Err(SurfaceError::UnknownLayer(handle))
        }
    }

    pub fn add_layer(
        &mut self,
        kind: EntityKind,
        id: &str,
        geometry: &Geometry,
        style: &LayerStyle,
    ) -> Result<LayerHandle, SurfaceError> {
        self.ensure_alive()?;
        let handle = self.canvas.add_layer(kind, id, geometry, style);
        self.layers.insert(handle);
        Ok(handle)
    }

    pub fn remove_layer(&mut self, handle: LayerHandle) -> Result<(), SurfaceError> {
        self.ensure_layer(handle)?;
        self.canvas.remove_layer(handle);
        self.layers.remove(&handle);
        Ok(())
    }

    pub fn bind_popup(
        &mut self,
        handle: LayerHandle,
        content: &PopupContent,
    ) -> Result<(), SurfaceError> {
        self.ensure_layer(handle)?;
        self.canvas.bind_popup(handle, content);
        Ok(())
    }

    /// Register a click handler, gated on this mount's liveness.
    pub fn on_click(
        &mut self,
        handle: LayerHandle,
        callback: ClickCallback,
    ) -> Result<(), SurfaceError> {
        self.ensure_layer(handle)?;
        let liveness = self.liveness.clone();
        self.canvas.on_click(
            handle,
            Arc::new(move || {
                if liveness.is_alive() {
                    callback();
                } else {
                    debug!("Click on torn-down surface ignored");
                }
            }),
        );
        Ok(())
    }

    pub fn set_view(&mut self, center: GeoPoint, zoom: u8) -> Result<(), SurfaceError> {
        self.ensure_alive()?;
        self.canvas.set_view(center, zoom);
        Ok(())
    }

    pub fn fit_bounds(&mut self, bounds: &GeoBounds) -> Result<(), SurfaceError> {
        self.ensure_alive()?;
        self.canvas.fit_bounds(bounds);
        Ok(())
    }
}

impl Drop for MapSurface {
    fn drop(&mut self) {
        self.unmount();
    }
}
