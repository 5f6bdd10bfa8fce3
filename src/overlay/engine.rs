//! Collaborator interfaces: the rendering engine and the document writer
//!
//! The overlay core never parses PDF bytes itself. A [`RenderEngine`] turns
//! bytes into pages, rasters and positioned text items; a [`DocumentWriter`]
//! receives the finished [`EditSet`](super::model::EditSet) at apply time.

use serde::Serialize;

use super::geometry::Matrix;
use super::model::EditSet;

/// Document bytes could not be opened
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("document could not be parsed: {0}")]
    Parse(String),

    #[error("document has no pages")]
    Empty,

    #[error("document could not be read: {0}")]
    Io(String),
}

/// The engine failed while producing a page
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("no document is loaded")]
    NoDocument,

    #[error("rendering engine: {0}")]
    Engine(String),

    #[error("malformed viewport transform {0:?}")]
    MalformedViewport([f32; 6]),
}

impl RenderError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

/// Page size in the engine's unscaled units
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Mapping from page space to raster pixels for one render
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Viewport {
    /// Uniform page-unit to pixel factor
    pub scale: f32,
    /// Page space (top-left origin, y down) to raster pixels
    pub transform: Matrix,
    pub width_px: f32,
    pub height_px: f32,
}

impl Viewport {
    /// Scale the page so that its width fills `editor_width_px * zoom`
    #[must_use]
    pub fn fit_width(page: PageSize, editor_width_px: f32, zoom: f32) -> Self {
        let base = if page.width > 0.0 {
            editor_width_px / page.width
        } else {
            1.0
        };
        let scale = base * zoom;
        Self {
            scale,
            transform: Matrix::scale(scale, scale),
            width_px: page.width * scale,
            height_px: page.height * scale,
        }
    }

    /// Viewport that leaves page coordinates untouched
    #[must_use]
    pub fn identity(width_px: f32, height_px: f32) -> Self {
        Self {
            scale: 1.0,
            transform: Matrix::identity(),
            width_px,
            height_px,
        }
    }
}

/// One text run as reported by the engine, in page space
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextItem {
    pub text: String,
    /// Content transform placing the run's baseline origin in page space
    pub transform: Matrix,
    /// Advance width in page units
    pub width: f32,
    /// Run height in page units
    pub height: f32,
    pub font_name: Option<String>,
}

/// Raw RGB raster of a rendered page
#[derive(Clone, PartialEq)]
pub struct Raster {
    /// 3 bytes per pixel: R, G, B
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Everything one successful render produced
#[derive(Clone, Debug)]
pub struct RenderedPage {
    pub page: usize,
    pub zoom: f32,
    pub viewport: Viewport,
    pub raster: Raster,
    pub items: Vec<TextItem>,
}

/// Rasterizer and text extractor for fixed-layout documents.
///
/// Page numbers are 1-based. Implementations decide how long a call takes;
/// cancellation is handled above this trait by session identifiers.
pub trait RenderEngine {
    type Document;
    type Page;

    fn load_document(&mut self, bytes: &[u8]) -> Result<Self::Document, LoadError>;

    fn page_count(&self, doc: &Self::Document) -> usize;

    fn get_page(&mut self, doc: &Self::Document, page: usize) -> Result<Self::Page, RenderError>;

    fn page_size(&self, page: &Self::Page) -> Result<PageSize, RenderError>;

    fn render(&mut self, page: &Self::Page, viewport: &Viewport) -> Result<Raster, RenderError>;

    fn text_content(&mut self, page: &Self::Page) -> Result<Vec<TextItem>, RenderError>;
}

/// Render `page` at `zoom`, fitting the page width to `editor_width_px`
pub fn render_target<E: RenderEngine>(
    engine: &mut E,
    doc: &E::Document,
    page: usize,
    zoom: f32,
    editor_width_px: f32,
) -> Result<RenderedPage, RenderError> {
    let page_count = engine.page_count(doc);
    if page == 0 || page > page_count {
        return Err(RenderError::PageOutOfRange { page, page_count });
    }

    let handle = engine.get_page(doc, page)?;
    let viewport = Viewport::fit_width(engine.page_size(&handle)?, editor_width_px, zoom);
    if !viewport.transform.is_finite() {
        return Err(RenderError::MalformedViewport(viewport.transform.to_array()));
    }

    let raster = engine.render(&handle, &viewport)?;
    let items = engine.text_content(&handle)?;

    Ok(RenderedPage {
        page,
        zoom,
        viewport,
        raster,
        items,
    })
}

/// Mutation library that persists overlay edits into document bytes.
///
/// Opaque to the overlay core: it is handed the edit set at apply time and
/// asked for the resulting bytes.
pub trait DocumentWriter {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_for_editing(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    fn apply(&mut self, edits: &EditSet) -> Result<(), Self::Error>;

    fn serialize(&self) -> Result<Vec<u8>, Self::Error>;
}
