//! Shape drawing with live preview

use crate::overlay::elements::{ShapeKind, ShapeStyle};
use crate::overlay::geometry::{Point, ShapeGeometry, shape_geometry};

use super::InteractionError;

/// Drags this short or shorter are treated as mis-clicks
pub const DEFAULT_MIN_DRAG_PX: f32 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ShapeDrawState {
    #[default]
    Idle,
    /// Pointer is down, not yet moved
    Drawing {
        kind: ShapeKind,
        style: ShapeStyle,
        start: Point,
    },
    /// Pointer moved; `current` is the latest position
    Previewing {
        kind: ShapeKind,
        style: ShapeStyle,
        start: Point,
        current: Point,
    },
}

/// A finished drag that cleared the distance threshold
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDraft {
    pub kind: ShapeKind,
    pub style: ShapeStyle,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug)]
pub struct ShapeController {
    state: ShapeDrawState,
    min_drag_px: f32,
}

impl Default for ShapeController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DRAG_PX)
    }
}

impl ShapeController {
    #[must_use]
    pub fn new(min_drag_px: f32) -> Self {
        Self {
            state: ShapeDrawState::Idle,
            min_drag_px,
        }
    }

    pub fn state(&self) -> &ShapeDrawState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        !matches!(self.state, ShapeDrawState::Idle)
    }

    /// Pointer down: start a new shape at `at`
    pub fn begin(
        &mut self,
        tool_active: bool,
        at: Point,
        kind: ShapeKind,
        style: ShapeStyle,
    ) -> Result<(), InteractionError> {
        if !tool_active {
            return Err(InteractionError::ToolInactive);
        }
        if self.is_drawing() {
            return Err(InteractionError::AlreadyDrawing);
        }
        self.state = ShapeDrawState::Drawing {
            kind,
            style,
            start: at,
        };
        Ok(())
    }

    /// Pointer move: returns the preview geometry, if drawing
    pub fn update(&mut self, at: Point) -> Option<ShapeGeometry> {
        self.state = match self.state {
            ShapeDrawState::Idle => return None,
            ShapeDrawState::Drawing { kind, style, start }
            | ShapeDrawState::Previewing {
                kind, style, start, ..
            } => ShapeDrawState::Previewing {
                kind,
                style,
                start,
                current: at,
            },
        };
        self.preview()
    }

    /// Geometry of the shape being drawn
    pub fn preview(&self) -> Option<ShapeGeometry> {
        match self.state {
            ShapeDrawState::Previewing {
                kind,
                style,
                start,
                current,
            } => Some(shape_geometry(kind, start, current, style.stroke_width)),
            _ => None,
        }
    }

    /// Pointer up: returns a draft when the drag exceeded the threshold
    pub fn finish(&mut self) -> Option<ShapeDraft> {
        let (kind, style, start, end) = match std::mem::take(&mut self.state) {
            ShapeDrawState::Idle => return None,
            ShapeDrawState::Drawing { kind, style, start } => (kind, style, start, start),
            ShapeDrawState::Previewing {
                kind,
                style,
                start,
                current,
            } => (kind, style, start, current),
        };

        if start.distance_to(&end) <= self.min_drag_px {
            return None;
        }
        Some(ShapeDraft {
            kind,
            style,
            start,
            end,
        })
    }

    pub fn cancel(&mut self) {
        self.state = ShapeDrawState::Idle;
    }
}
