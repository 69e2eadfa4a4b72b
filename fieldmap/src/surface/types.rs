//! Drawing primitives understood by every map canvas.

use std::fmt;
use std::sync::Arc;

use crate::geo::GeoPoint;

/// Opaque handle to one layer attached to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(u64);

impl LayerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Shape of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// A marker or badge anchored at a point.
    Point(GeoPoint),
    /// A circle of `radius_m` meters.
    Circle { center: GeoPoint, radius_m: f64 },
}

impl Geometry {
    /// The anchor point of the shape.
    pub fn anchor(&self) -> GeoPoint {
        match self {
            Self::Point(point) => *point,
            Self::Circle { center, .. } => *center,
        }
    }
}

/// Palette used by overlay styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Green,
    Yellow,
    Red,
    Blue,
    Gray,
}

impl Color {
    /// CSS hex value.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Green => "#22c55e",
            Self::Yellow => "#eab308",
            Self::Red => "#ef4444",
            Self::Blue => "#3b82f6",
            Self::Gray => "#6b7280",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Gray => "gray",
        };
        write!(f, "{}", name)
    }
}

/// Visual style of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub color: Color,
    /// Fill opacity for area shapes, 0.0-1.0.
    pub fill_opacity: f64,
    /// Dashed outline.
    pub dashed: bool,
    /// Text drawn inside the marker (badge initials).
    pub label: Option<String>,
}

impl LayerStyle {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            fill_opacity: 1.0,
            dashed: false,
            label: None,
        }
    }

    pub fn with_fill_opacity(mut self, opacity: f64) -> Self {
        self.fill_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_dashed(mut self, dashed: bool) -> Self {
        self.dashed = dashed;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Content of the popup shown when a layer is opened.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopupContent {
    pub title: String,
    /// `(label, value)` rows.
    pub rows: Vec<(String, String)>,
}

impl PopupContent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push((label.into(), value.into()));
        self
    }

    /// Value of the first row with `label`.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for PopupContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for (label, value) in &self.rows {
            write!(f, "\n{}: {}", label, value)?;
        }
        Ok(())
    }
}

/// Closure invoked when the user clicks a layer.
pub type ClickCallback = Arc<dyn Fn() + Send + Sync>;
