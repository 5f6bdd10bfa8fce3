// Export modules for use in tests and the CLI
pub mod export;
pub mod notification;
pub mod overlay;
pub mod panic_handler;
pub mod settings;

#[cfg(feature = "pdf")]
pub mod pdf;

// Re-export the editing surface
pub use overlay::{EditorConfig, EditorSession, Signals, Tool};
