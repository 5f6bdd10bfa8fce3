//! Messages exchanged with the render worker

use std::sync::Arc;

use crate::overlay::engine::{LoadError, RenderError, RenderedPage};
use crate::overlay::render::{LoadId, RenderTarget, SessionId};

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Open a document from bytes, replacing the current one
    Load { load: LoadId, bytes: Arc<Vec<u8>> },

    /// Rasterize a page and extract its text items
    Render {
        session: SessionId,
        target: RenderTarget,
        editor_width_px: f32,
    },

    /// Abandon a session if it has not started yet
    Cancel(SessionId),

    /// Shutdown the worker
    Shutdown,
}

/// Errors raised inside the mupdf engine
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

impl From<WorkerFault> for RenderError {
    fn from(fault: WorkerFault) -> Self {
        RenderError::engine(fault.to_string())
    }
}

impl From<WorkerFault> for LoadError {
    fn from(fault: WorkerFault) -> Self {
        LoadError::Parse(fault.to_string())
    }
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// The document opened
    DocumentLoaded { load: LoadId, page_count: usize },

    /// The document could not be opened
    LoadFailed { load: LoadId, error: LoadError },

    /// A session finished
    Page {
        session: SessionId,
        page: Box<RenderedPage>,
    },

    /// A session was dropped before it ran
    Cancelled(SessionId),

    /// A session failed
    Error {
        session: SessionId,
        error: RenderError,
    },
}
