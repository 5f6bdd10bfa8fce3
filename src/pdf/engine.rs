//! mupdf-backed [`RenderEngine`]

use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix as FzMatrix, Page, Pixmap, TextPageFlags};

use crate::overlay::engine::{
    LoadError, PageSize, Raster, RenderEngine, RenderError, TextItem, Viewport,
};
use crate::overlay::geometry::Matrix;

use super::cache::TextCache;
use super::request::WorkerFault;

const PDF_MAGIC: &str = "application/pdf";

/// A loaded page plus its 1-based number, used as the text cache key
pub struct MupdfPage {
    number: usize,
    page: Page,
}

/// Rasterizes pages and extracts text lines with mupdf.
///
/// mupdf handles are not `Send`; construct the engine on the thread that uses it.
pub struct MupdfEngine {
    text_cache: TextCache,
}

impl MupdfEngine {
    #[must_use]
    pub fn new(text_cache_size: usize) -> Self {
        Self {
            text_cache: TextCache::new(text_cache_size),
        }
    }
}

impl Default for MupdfEngine {
    fn default() -> Self {
        Self::new(super::DEFAULT_TEXT_CACHE_SIZE)
    }
}

impl RenderEngine for MupdfEngine {
    type Document = Document;
    type Page = MupdfPage;

    fn load_document(&mut self, bytes: &[u8]) -> Result<Document, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        let doc = Document::from_bytes(bytes, PDF_MAGIC).map_err(WorkerFault::from)?;
        let page_count = doc.page_count().map_err(WorkerFault::from)?;
        if page_count <= 0 {
            return Err(LoadError::Empty);
        }
        self.text_cache.invalidate_all();
        Ok(doc)
    }

    fn page_count(&self, doc: &Document) -> usize {
        doc.page_count().map_or(0, |n| n.max(0) as usize)
    }

    fn get_page(&mut self, doc: &Document, page: usize) -> Result<MupdfPage, RenderError> {
        let index = page
            .checked_sub(1)
            .and_then(|i| i32::try_from(i).ok())
            .ok_or(RenderError::PageOutOfRange {
                page,
                page_count: self.page_count(doc),
            })?;
        let loaded = doc.load_page(index).map_err(WorkerFault::from)?;
        Ok(MupdfPage {
            number: page,
            page: loaded,
        })
    }

    fn page_size(&self, page: &MupdfPage) -> Result<PageSize, RenderError> {
        let bounds = page.page.bounds().map_err(WorkerFault::from)?;
        Ok(PageSize {
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
        })
    }

    fn render(&mut self, page: &MupdfPage, viewport: &Viewport) -> Result<Raster, RenderError> {
        let transform = FzMatrix::new_scale(viewport.scale, viewport.scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = page
            .page
            .to_pixmap(&transform, &rgb, false, false)
            .map_err(WorkerFault::from)?;

        Ok(Raster {
            pixels: pixmap_to_rgb(&pixmap)?,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
        })
    }

    fn text_content(&mut self, page: &MupdfPage) -> Result<Vec<TextItem>, RenderError> {
        if let Some(cached) = self.text_cache.get(page.number) {
            return Ok(cached.as_ref().clone());
        }
        let items = extract_text_items(&page.page)?;
        Ok(self.text_cache.insert(page.number, items).as_ref().clone())
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}

/// One [`TextItem`] per text line, positioned at the first glyph's baseline
fn extract_text_items(page: &Page) -> Result<Vec<TextItem>, WorkerFault> {
    let text_page = page.to_text_page(TextPageFlags::empty())?;
    let mut items = Vec::new();

    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Text {
            continue;
        }
        for line in block.lines() {
            let glyphs: Vec<(char, f32, f32, f32)> = line
                .chars()
                .filter_map(|ch| {
                    let origin = ch.origin();
                    ch.char().map(|c| (c, origin.x, origin.y, ch.size()))
                })
                .collect();
            let (Some(first), Some(last)) = (glyphs.first(), glyphs.last()) else {
                continue;
            };
            let text: String = glyphs.iter().map(|g| g.0).collect();
            if text.trim().is_empty() {
                continue;
            }

            let (_, x0, y0, size) = *first;
            let (_, x1, y1, _) = *last;
            let (dx, dy) = (x1 - x0, y1 - y0);
            let bbox = line.bounds();

            let (transform, width) = if dy.abs() <= f32::EPSILON {
                (Matrix::new(size, 0.0, 0.0, size, x0, y0), bbox.x1 - x0)
            } else {
                // Rotated baseline: orient the run along the first-to-last glyph direction
                let angle = dy.atan2(dx);
                let (sin, cos) = angle.sin_cos();
                let advance = (dx * dx + dy * dy).sqrt() + size * 0.5;
                (
                    Matrix::new(size * cos, size * sin, -size * sin, size * cos, x0, y0),
                    advance,
                )
            };

            items.push(TextItem {
                text,
                transform,
                width: width.max(0.0),
                height: size,
                font_name: None,
            });
        }
    }

    Ok(items)
}
