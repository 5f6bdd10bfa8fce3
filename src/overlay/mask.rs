//! Mask derivation and text-run construction
//!
//! A page render yields engine text items in page space. Each item is mapped
//! to an extracted [`TextRun`] in raster space and, from that run, to one
//! [`MaskRect`] that hides the original glyph ink. Items with bad geometry are
//! skipped individually so one broken run cannot blank the page.

use log::warn;

use super::elements::{
    ElementId, FontStyle, FontWeight, MaskRect, Placement, SourceText, TextOrigin, TextRun,
    TextStyle,
};
use super::engine::{TextItem, Viewport};
use super::geometry::{GeometryError, Matrix, Point, decompose_transform};

/// Masks start this fraction of the run height above the baseline
pub const MASK_LIFT: f32 = 0.9;
/// Mask height as a multiple of the run height
pub const MASK_HEIGHT_FACTOR: f32 = 1.5;
/// Mask width as a multiple of the run width
pub const MASK_WIDTH_FACTOR: f32 = 1.05;

const FALLBACK_FONT_FAMILY: &str = "sans-serif";

/// Extracted runs and their masks, always the same length
#[derive(Clone, Debug, Default)]
pub struct TextLayer {
    pub runs: Vec<TextRun>,
    pub masks: Vec<MaskRect>,
    /// Indices of engine items that were skipped
    pub skipped: Vec<usize>,
}

#[must_use]
pub fn text_run_id(index: usize) -> ElementId {
    ElementId::new(format!("text-{index}"))
}

#[must_use]
pub fn mask_id(index: usize) -> ElementId {
    ElementId::new(format!("mask-{index}"))
}

/// Occluding rectangle for one extracted run.
///
/// Returns `None` for custom runs and for runs without an extent.
#[must_use]
pub fn derive_mask(run: &TextRun) -> Option<MaskRect> {
    if !run.is_extracted() {
        return None;
    }
    let width = run.placement.width?;
    let height = run.placement.height?;

    Some(MaskRect {
        id: ElementId::new(format!("mask-{}", run.id.suffix())),
        x: run.placement.x,
        y: run.placement.y - height * MASK_LIFT,
        width: width * MASK_WIDTH_FACTOR,
        height: height * MASK_HEIGHT_FACTOR,
        rotation_degrees: run.placement.rotation_degrees,
    })
}

/// Batch form of [`derive_mask`], one mask per extracted run
#[must_use]
pub fn derive_masks(runs: &[TextRun]) -> Vec<MaskRect> {
    runs.iter().filter_map(derive_mask).collect()
}

/// Convert one engine item into an extracted run in raster space
pub fn text_run_from_item(
    index: usize,
    item: &TextItem,
    viewport: &Viewport,
) -> Result<TextRun, GeometryError> {
    let combined = Matrix::compose(&viewport.transform, &item.transform);
    let decomposed = decompose_transform(&combined)?;

    let determinant = combined.determinant();
    if determinant == 0.0 {
        return Err(GeometryError::Degenerate { determinant });
    }

    let width = item.width * viewport.scale;
    let height = item.height * viewport.scale;
    if !(width.is_finite() && height.is_finite()) || width < 0.0 || height <= 0.0 {
        return Err(GeometryError::EmptyExtent { width, height });
    }

    let style = TextStyle {
        font_family: item
            .font_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_FONT_FAMILY.to_string()),
        font_size_px: decomposed.scale_y,
        font_weight: FontWeight::Normal,
        font_style: FontStyle::Normal,
        ..TextStyle::default()
    };

    let position = Point::new(decomposed.x_px, decomposed.y_px);
    Ok(TextRun {
        id: text_run_id(index),
        placement: Placement {
            x: position.x,
            y: position.y,
            width: Some(width),
            height: Some(height),
            rotation_degrees: decomposed.rotation_degrees,
        },
        text: item.text.clone(),
        style,
        scale_x: decomposed.scale_x,
        scale_y: decomposed.scale_y,
        origin: TextOrigin::Extracted,
        source: Some(SourceText {
            text: item.text.clone(),
            position,
        }),
    })
}

/// Build the run and mask collections for a freshly rendered page
#[must_use]
pub fn build_text_layer(items: &[TextItem], viewport: &Viewport) -> TextLayer {
    let mut layer = TextLayer::default();

    for (index, item) in items.iter().enumerate() {
        let run = match text_run_from_item(index, item, viewport) {
            Ok(run) => run,
            Err(e) => {
                warn!("Skipping text run {index} ({:?}): {e}", item.text);
                layer.skipped.push(index);
                continue;
            }
        };

        // Runs always carry an extent, so a mask always exists
        match derive_mask(&run) {
            Some(mask) => {
                layer.runs.push(run);
                layer.masks.push(mask);
            }
            None => layer.skipped.push(index),
        }
    }

    debug_assert_eq!(layer.runs.len(), layer.masks.len());
    layer
}
