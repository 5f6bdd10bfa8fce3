pub mod filename;
pub mod manifest;

pub use filename::{edited_file_name, sanitize_filename};
pub use manifest::{ExportError, MANIFEST_FORMAT, ManifestWriter, write_output};
