//! Coordinate transform and overlay synchronization engine
//!
//! Engine text items are mapped into raster space ([`geometry`], [`mask`]),
//! kept in a single-writer [`model`], mutated by pointer-driven
//! [`controllers`], and kept in step with the displayed page by the
//! [`render`] lifecycle and the [`session`] coordinator.

pub mod controllers;
pub mod elements;
pub mod engine;
pub mod geometry;
pub mod mask;
pub mod model;
pub mod render;
pub mod session;
pub mod zoom;

pub use elements::{
    Color, ElementId, MaskRect, Placement, Positioned, Shape, ShapeKind, ShapeStyle, TextOrigin,
    TextRun, TextStyle,
};
pub use engine::{
    DocumentWriter, LoadError, PageSize, Raster, RenderEngine, RenderError, RenderedPage,
    TextItem, Viewport, render_target,
};
pub use geometry::{GeometryError, Matrix, Point, Rect, ShapeGeometry};
pub use model::{EditSet, OverlayError, OverlayModel, OverlaySnapshot};
pub use render::{Effect, LoadId, RenderPhase, RenderTarget, RetryToken, SessionId};
pub use session::{EditorConfig, EditorSession, PageView, Signals, Tool};
pub use zoom::Zoom;
