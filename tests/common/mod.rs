#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pdf_overlay::overlay::{
    EditorSession, Effect, LoadError, LoadId, Matrix, PageSize, Raster, RenderEngine,
    RenderError, RenderTarget, RenderedPage, SessionId, TextItem, Viewport,
};

/// Horizontal text item with its baseline origin at (x, y)
pub fn text_item(text: &str, x: f32, y: f32, size: f32, width: f32) -> TextItem {
    TextItem {
        text: text.to_string(),
        transform: Matrix::new(size, 0.0, 0.0, size, x, y),
        width,
        height: size,
        font_name: Some("Helvetica".to_string()),
    }
}

/// A rendered page in identity page space, as the session would receive it
pub fn rendered(target: RenderTarget, items: Vec<TextItem>) -> RenderedPage {
    RenderedPage {
        page: target.page,
        zoom: target.zoom,
        viewport: Viewport::identity(612.0, 792.0),
        raster: Raster {
            pixels: vec![255; 3],
            width_px: 1,
            height_px: 1,
        },
        items,
    }
}

pub fn started(effects: &[Effect]) -> Vec<(SessionId, RenderTarget)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::StartRender { session, target } => Some((*session, *target)),
            _ => None,
        })
        .collect()
}

pub fn only_start(effects: &[Effect]) -> (SessionId, RenderTarget) {
    let starts = started(effects);
    assert_eq!(starts.len(), 1, "expected exactly one render in {effects:?}");
    starts[0]
}

/// Start loading a new document and return the id its answer must carry
pub fn begin_load(session: &mut EditorSession) -> LoadId {
    let effects = session.begin_load();
    effects
        .iter()
        .find_map(|e| match e {
            Effect::StartLoad(load) => Some(*load),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no load started in {effects:?}"))
}

#[derive(Clone, Debug)]
pub struct FakePage {
    pub size: PageSize,
    pub items: Vec<TextItem>,
}

/// Scripted engine: fixed pages, optional failures, counts renders
#[derive(Clone, Debug, Default)]
pub struct FakeEngine {
    pages: Vec<FakePage>,
    failing_pages: HashSet<usize>,
    reject_load: Option<LoadError>,
    renders: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, width: f32, height: f32, items: Vec<TextItem>) -> Self {
        self.pages.push(FakePage {
            size: PageSize { width, height },
            items,
        });
        self
    }

    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn rejecting_load(mut self, error: LoadError) -> Self {
        self.reject_load = Some(error);
        self
    }

    /// Shared counter of completed rasterizations
    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.renders)
    }
}

impl RenderEngine for FakeEngine {
    type Document = usize;
    type Page = usize;

    fn load_document(&mut self, bytes: &[u8]) -> Result<usize, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        if let Some(error) = &self.reject_load {
            return Err(error.clone());
        }
        Ok(self.pages.len())
    }

    fn page_count(&self, doc: &usize) -> usize {
        *doc
    }

    fn get_page(&mut self, doc: &usize, page: usize) -> Result<usize, RenderError> {
        if page == 0 || page > *doc {
            return Err(RenderError::PageOutOfRange {
                page,
                page_count: *doc,
            });
        }
        Ok(page)
    }

    fn page_size(&self, page: &usize) -> Result<PageSize, RenderError> {
        Ok(self.pages[page - 1].size)
    }

    fn render(&mut self, page: &usize, viewport: &Viewport) -> Result<Raster, RenderError> {
        if self.failing_pages.contains(page) {
            return Err(RenderError::engine(format!("page {page} is corrupt")));
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        let width_px = viewport.width_px.round() as u32;
        let height_px = viewport.height_px.round() as u32;
        Ok(Raster {
            pixels: vec![255; (width_px * height_px * 3) as usize],
            width_px,
            height_px,
        })
    }

    fn text_content(&mut self, page: &usize) -> Result<Vec<TextItem>, RenderError> {
        Ok(self.pages[page - 1].items.clone())
    }
}
