//! Overlay element model
//!
//! Single owner of every overlay collection plus the selection slot and the
//! unsaved-changes flag. Controllers describe what they want to change; only
//! the operations here write.

use serde::Serialize;

use super::elements::{
    ElementId, MaskRect, Placement, Positioned, Shape, ShapeKind, ShapeStyle, TextOrigin,
    TextRun, TextStyle,
};
use super::geometry::{Point, normalize_box};
use super::mask::TextLayer;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("no overlay element with id '{0}'")]
    UnknownElement(ElementId),

    #[error("element '{0}' has no editable text")]
    NotEditable(ElementId),

    #[error("element '{0}' cannot be selected")]
    NotSelectable(ElementId),
}

/// Read-only copy of the overlay, handed to the UI shell for drawing
#[derive(Clone, Debug, Default, Serialize)]
pub struct OverlaySnapshot {
    pub text_runs: Vec<TextRun>,
    pub masks: Vec<MaskRect>,
    pub masks_visible: bool,
    pub custom_text: Vec<TextRun>,
    pub shapes: Vec<Shape>,
    pub selected: Option<ElementId>,
    pub unsaved_changes: bool,
}

/// Extracted run whose text or position differs from the engine's report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextEdit {
    pub id: ElementId,
    pub original_text: String,
    pub original_position: Point,
    pub text: String,
    pub placement: Placement,
    pub style: TextStyle,
}

/// Everything the document writer needs to persist
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EditSet {
    pub page: usize,
    pub zoom: f32,
    pub text_edits: Vec<TextEdit>,
    pub custom_text: Vec<TextRun>,
    pub shapes: Vec<Shape>,
}

impl EditSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_edits.is_empty() && self.custom_text.is_empty() && self.shapes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct OverlayModel {
    text_runs: Vec<TextRun>,
    masks: Vec<MaskRect>,
    custom_text: Vec<TextRun>,
    shapes: Vec<Shape>,
    selected: Option<ElementId>,
    unsaved: bool,
    show_original: bool,
    next_custom_id: u64,
    next_shape_id: u64,
}

impl OverlayModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything; used when a new document is loaded
    pub fn reset(&mut self) {
        *self = Self {
            show_original: self.show_original,
            ..Self::default()
        };
    }

    /// Replace the extracted runs and their masks in one step
    pub fn replace_extracted(&mut self, layer: TextLayer) {
        debug_assert_eq!(layer.runs.len(), layer.masks.len());
        self.text_runs = layer.runs;
        self.masks = layer.masks;
    }

    pub fn clear_extracted(&mut self) {
        self.text_runs.clear();
        self.masks.clear();
    }

    pub fn text_runs(&self) -> &[TextRun] {
        &self.text_runs
    }

    pub fn masks(&self) -> &[MaskRect] {
        &self.masks
    }

    pub fn custom_text(&self) -> &[TextRun] {
        &self.custom_text
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Clear the unsaved flag after a successful apply or download
    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn masks_visible(&self) -> bool {
        !self.show_original
    }

    /// Show or hide the original glyphs under the masks
    pub fn set_show_original(&mut self, show: bool) {
        self.show_original = show;
    }

    pub fn toggle_show_original(&mut self) -> bool {
        self.show_original = !self.show_original;
        self.show_original
    }

    // Selection

    pub fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    /// Select a text element, replacing any previous selection
    pub fn select(&mut self, id: &ElementId) -> Result<(), OverlayError> {
        if self.find_text(id).is_none() {
            return Err(if self.find_shape(id).is_some() {
                OverlayError::NotSelectable(id.clone())
            } else {
                OverlayError::UnknownElement(id.clone())
            });
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // Lookup

    pub fn find_text(&self, id: &ElementId) -> Option<&TextRun> {
        self.text_runs
            .iter()
            .chain(self.custom_text.iter())
            .find(|run| &run.id == id)
    }

    pub fn find_shape(&self, id: &ElementId) -> Option<&Shape> {
        self.shapes.iter().find(|shape| &shape.id == id)
    }

    /// Top-left corner of any element
    pub fn position_of(&self, id: &ElementId) -> Option<Point> {
        self.find_text(id)
            .map(Positioned::position)
            .or_else(|| self.find_shape(id).map(Positioned::position))
    }

    fn find_text_mut(&mut self, id: &ElementId) -> Option<&mut TextRun> {
        self.text_runs
            .iter_mut()
            .chain(self.custom_text.iter_mut())
            .find(|run| &run.id == id)
    }

    fn find_positioned_mut(&mut self, id: &ElementId) -> Option<&mut dyn Positioned> {
        if let Some(run) = self
            .text_runs
            .iter_mut()
            .chain(self.custom_text.iter_mut())
            .find(|run| &run.id == id)
        {
            return Some(run as &mut dyn Positioned);
        }
        self.shapes
            .iter_mut()
            .find(|shape| &shape.id == id)
            .map(|shape| shape as &mut dyn Positioned)
    }

    // Commits

    /// Replace the text of a run
    pub fn set_text(&mut self, id: &ElementId, text: impl Into<String>) -> Result<(), OverlayError> {
        let text = text.into();
        let run = self.find_text_mut(id).ok_or_else(|| {
            OverlayError::UnknownElement(id.clone())
        })?;
        run.text = text;
        self.unsaved = true;
        Ok(())
    }

    /// Empty a run's text without removing the run
    pub fn delete_text(&mut self, id: &ElementId) -> Result<(), OverlayError> {
        if self.find_text(id).is_none() {
            return Err(if self.find_shape(id).is_some() {
                OverlayError::NotEditable(id.clone())
            } else {
                OverlayError::UnknownElement(id.clone())
            });
        }
        self.set_text(id, String::new())
    }

    /// Move any element's top-left corner
    pub fn move_element(&mut self, id: &ElementId, to: Point) -> Result<(), OverlayError> {
        let element = self
            .find_positioned_mut(id)
            .ok_or_else(|| OverlayError::UnknownElement(id.clone()))?;
        element.move_to(to);
        self.unsaved = true;
        Ok(())
    }

    /// Add a free-text run at `at`
    pub fn add_custom_text(&mut self, at: Point, text: impl Into<String>, style: TextStyle) -> ElementId {
        self.next_custom_id += 1;
        let id = ElementId::new(format!("custom-text-{}", self.next_custom_id));
        self.custom_text.push(TextRun {
            id: id.clone(),
            placement: Placement::at(at),
            text: text.into(),
            scale_x: 1.0,
            scale_y: 1.0,
            style,
            origin: TextOrigin::Custom,
            source: None,
        });
        self.unsaved = true;
        id
    }

    /// Add a shape dragged from `start` to `end`
    pub fn add_shape(&mut self, kind: ShapeKind, start: Point, end: Point, style: ShapeStyle) -> ElementId {
        self.next_shape_id += 1;
        let id = ElementId::new(format!("shape-{}", self.next_shape_id));
        let bounds = normalize_box(start, end);
        self.shapes.push(Shape {
            id: id.clone(),
            kind,
            placement: Placement {
                x: bounds.x,
                y: bounds.y,
                width: Some(bounds.width),
                height: Some(bounds.height),
                rotation_degrees: 0.0,
            },
            start,
            end,
            style,
        });
        self.unsaved = true;
        id
    }

    /// Keep custom text and shapes registered to the page after a zoom change
    pub fn rescale_user_elements(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 || (factor - 1.0).abs() < f32::EPSILON {
            return;
        }
        for run in &mut self.custom_text {
            run.placement.x *= factor;
            run.placement.y *= factor;
            run.style.font_size_px *= factor;
        }
        for shape in &mut self.shapes {
            shape.rescale(factor);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            text_runs: self.text_runs.clone(),
            masks: self.masks.clone(),
            masks_visible: self.masks_visible(),
            custom_text: self.custom_text.clone(),
            shapes: self.shapes.clone(),
            selected: self.selected.clone(),
            unsaved_changes: self.unsaved,
        }
    }

    /// Collect edits for the document writer
    #[must_use]
    pub fn edit_set(&self, page: usize, zoom: f32) -> EditSet {
        let text_edits = self
            .text_runs
            .iter()
            .filter(|run| run.is_modified())
            .filter_map(|run| {
                let source = run.source.as_ref()?;
                Some(TextEdit {
                    id: run.id.clone(),
                    original_text: source.text.clone(),
                    original_position: source.position,
                    text: run.text.clone(),
                    placement: run.placement,
                    style: run.style.clone(),
                })
            })
            .collect();

        EditSet {
            page,
            zoom,
            text_edits,
            custom_text: self.custom_text.clone(),
            shapes: self.shapes.clone(),
        }
    }
}
