//! mupdf rendering backend
//!
//! [`MupdfEngine`] implements the overlay's `RenderEngine` trait; the
//! [`RenderService`] runs it on a worker thread and drives an `EditorSession`
//! with the results.

mod cache;
mod engine;
mod request;
mod service;
mod worker;

pub use cache::TextCache;
pub use engine::{MupdfEngine, MupdfPage};
pub use request::{RenderRequest, RenderResponse, WorkerFault};
pub use service::RenderService;
pub use worker::render_worker;

/// Pages whose extracted text is kept in memory
pub const DEFAULT_TEXT_CACHE_SIZE: usize = 32;
