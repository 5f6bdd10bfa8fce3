//! JSON edit manifest
//!
//! [`ManifestWriter`] is the document writer used by the CLI. Instead of
//! rewriting PDF content streams it records every applied [`EditSet`] next to
//! a fingerprint of the source bytes, so a later pass (or another tool) can
//! replay the edits onto exactly the document they were made against.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::overlay::engine::DocumentWriter;
use crate::overlay::model::EditSet;

pub const MANIFEST_FORMAT: &str = "pdf-overlay/edits";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no document was loaded for editing")]
    NotLoaded,

    #[error("source document is empty")]
    EmptySource,

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct SourceFingerprint {
    bytes: usize,
    md5: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    format: &'static str,
    version: u32,
    created_at: DateTime<Utc>,
    source: &'a SourceFingerprint,
    pages: &'a [EditSet],
}

/// Collects edit sets per page and serializes them as JSON
#[derive(Debug, Default)]
pub struct ManifestWriter {
    source: Option<SourceFingerprint>,
    pages: Vec<EditSet>,
}

impl ManifestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit sets applied so far, one per page, in page order
    pub fn pages(&self) -> &[EditSet] {
        &self.pages
    }
}

impl DocumentWriter for ManifestWriter {
    type Error = ExportError;

    fn load_for_editing(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        if bytes.is_empty() {
            return Err(ExportError::EmptySource);
        }
        let fingerprint = SourceFingerprint {
            bytes: bytes.len(),
            md5: format!("{:x}", md5::compute(bytes)),
        };
        // Reloading the same document keeps edits made to other pages
        if self.source.as_ref() != Some(&fingerprint) {
            self.pages.clear();
        }
        debug!("Loaded {} bytes for editing (md5 {})", fingerprint.bytes, fingerprint.md5);
        self.source = Some(fingerprint);
        Ok(())
    }

    fn apply(&mut self, edits: &EditSet) -> Result<(), ExportError> {
        if self.source.is_none() {
            return Err(ExportError::NotLoaded);
        }
        // The session hands over the full state of a page, so replace rather than merge
        self.pages.retain(|page| page.page != edits.page);
        if !edits.is_empty() {
            self.pages.push(edits.clone());
            self.pages.sort_by_key(|page| page.page);
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, ExportError> {
        let source = self.source.as_ref().ok_or(ExportError::NotLoaded)?;
        let manifest = Manifest {
            format: MANIFEST_FORMAT,
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            source,
            pages: &self.pages,
        };
        Ok(serde_json::to_vec_pretty(&manifest)?)
    }
}

/// Write serialized output, creating parent directories as needed
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |source| ExportError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    fs::write(path, bytes).map_err(write_err)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
