//! Pointer and keyboard interaction state machines
//!
//! Each controller is an explicit FSM with named states. Controllers never
//! touch the overlay model; they return what should be committed and the
//! session applies it.

mod free_text;
mod selection;
mod shape;

pub use free_text::{FreeTextController, FreeTextOutcome, FreeTextState};
pub use selection::{ClickOutcome, SelectionController, SelectionState};
pub use shape::{DEFAULT_MIN_DRAG_PX, ShapeController, ShapeDraft, ShapeDrawState};

/// Keys the controllers react to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    /// Enter with Shift held: inserts a newline instead of committing
    ShiftEnter,
    Escape,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    #[error("the tool is not active")]
    ToolInactive,

    #[error("a shape is already being drawn")]
    AlreadyDrawing,

    #[error("no text is being placed")]
    NotPlacing,

    #[error("no element is being edited")]
    NotEditing,
}
