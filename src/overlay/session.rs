//! Editor session: the single context object for one open document
//!
//! `EditorSession` owns the overlay model, the render lifecycle and the three
//! interaction controllers. It watches the document-ready flag, page number
//! and zoom factor, turns changes into render requests, and applies render
//! results and controller commits to the model. Nothing else writes the model.
//!
//! The session never performs I/O. Methods that can start, cancel or schedule
//! renders return the [`Effect`]s a host (e.g. `crate::pdf::RenderService`)
//! must carry out; completions come back through [`EditorSession::on_render_complete`]
//! and friends.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::notification::{NoticeLevel, Notices};

use super::controllers::{
    ClickOutcome, FreeTextController, FreeTextOutcome, FreeTextState, InteractionError, Key,
    SelectionController, SelectionState, ShapeController, ShapeDrawState,
};
use super::elements::{ElementId, ShapeKind, ShapeStyle, TextStyle};
use super::engine::{DocumentWriter, LoadError, Raster, RenderError, RenderedPage, Viewport};
use super::geometry::{Point, ShapeGeometry};
use super::mask::build_text_layer;
use super::model::{EditSet, OverlayError, OverlayModel, OverlaySnapshot};
use super::render::{
    Command, DEFAULT_RETRY_DELAYS, Effect, LoadId, RenderLifecycle, RenderPhase, RenderTarget,
    RetryPolicy, RetryToken, SessionId,
};
use super::zoom::Zoom;

pub const EDIT_TIP: &str = "Click on any text to edit it!";

/// Tunables for one editor session
#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    /// Page width in pixels at zoom 1.0
    pub editor_width_px: f32,
    pub default_zoom: f32,
    pub retry_delays: Vec<Duration>,
    pub min_shape_drag_px: f32,
    pub text_style: TextStyle,
    /// Kind drawn when a shape is requested without one
    pub shape_kind: ShapeKind,
    pub shape_style: ShapeStyle,
    pub show_original_text: bool,
    pub edit_tip_duration: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            editor_width_px: 1000.0,
            default_zoom: 1.0,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            min_shape_drag_px: super::controllers::DEFAULT_MIN_DRAG_PX,
            text_style: TextStyle::default(),
            shape_kind: ShapeKind::Rectangle,
            shape_style: ShapeStyle::default(),
            show_original_text: false,
            edit_tip_duration: Duration::from_secs(5),
        }
    }
}

/// Active editing tool. Switching tools resets every in-progress interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    None,
    Text,
    Shape(ShapeKind),
}

/// The three externally driven inputs the session reconciles
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    pub document_ready: bool,
    /// 1-based
    pub page: usize,
    pub zoom: f32,
}

/// The raster currently on screen and the viewport it was produced with
#[derive(Clone, Debug)]
pub struct PageView {
    pub page: usize,
    pub zoom: f32,
    pub viewport: Viewport,
    pub raster: Raster,
}

pub struct EditorSession {
    config: EditorConfig,
    model: OverlayModel,
    lifecycle: RenderLifecycle,
    signals: Signals,
    tool: Tool,
    free_text: FreeTextController,
    pending_text_style: TextStyle,
    shapes: ShapeController,
    selection: SelectionController,
    notices: Notices,
    view: Option<PageView>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let mut model = OverlayModel::new();
        model.set_show_original(config.show_original_text);
        Self {
            lifecycle: RenderLifecycle::new(config.retry_delays.clone()),
            signals: Signals {
                document_ready: false,
                page: 1,
                zoom: Zoom::clamp_factor(config.default_zoom),
            },
            tool: Tool::None,
            free_text: FreeTextController::new(),
            pending_text_style: config.text_style.clone(),
            shapes: ShapeController::new(config.min_shape_drag_px),
            selection: SelectionController::new(),
            notices: Notices::new(config.edit_tip_duration),
            view: None,
            model,
            config,
        }
    }

    // Accessors

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &OverlayModel {
        &self.model
    }

    pub fn signals(&self) -> Signals {
        self.signals
    }

    pub fn page(&self) -> usize {
        self.signals.page
    }

    pub fn zoom(&self) -> f32 {
        self.signals.zoom
    }

    pub fn page_count(&self) -> usize {
        self.lifecycle.page_count()
    }

    pub fn phase(&self) -> RenderPhase {
        self.lifecycle.phase()
    }

    pub fn lifecycle(&self) -> &RenderLifecycle {
        &self.lifecycle
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Raster and viewport of the last accepted render
    pub fn page_view(&self) -> Option<&PageView> {
        self.view.as_ref()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn free_text_state(&self) -> &FreeTextState {
        self.free_text.state()
    }

    pub fn shape_state(&self) -> &ShapeDrawState {
        self.shapes.state()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.model.has_unsaved_changes()
    }

    #[must_use]
    pub fn snapshot(&self) -> OverlaySnapshot {
        self.model.snapshot()
    }

    // Document lifecycle

    /// A new document is being opened: drop every overlay collection.
    ///
    /// The effects end with [`Effect::StartLoad`]; the engine's answer must be
    /// reported with that id.
    #[must_use]
    pub fn begin_load(&mut self) -> Vec<Effect> {
        info!("Loading new document");
        self.model.reset();
        self.reset_interactions();
        self.view = None;
        self.notices.rearm();
        self.signals = Signals {
            document_ready: false,
            page: 1,
            zoom: Zoom::clamp_factor(self.config.default_zoom),
        };
        self.lifecycle.apply(Command::BeginLoad)
    }

    /// The engine parsed the document; marks it ready and renders page 1.
    /// Answers to a superseded load are ignored.
    #[must_use]
    pub fn document_loaded(&mut self, load: LoadId, page_count: usize) -> Vec<Effect> {
        if self.lifecycle.pending_load() != Some(load) {
            debug!("Ignoring document from superseded load {load:?}");
            return vec![];
        }
        if page_count == 0 {
            return self.load_failed(load, &LoadError::Empty);
        }
        info!("Document loaded with {page_count} pages");
        let _ = self
            .lifecycle
            .apply(Command::DocumentLoaded { load, page_count });
        self.set_document_ready(true)
    }

    #[must_use]
    pub fn load_failed(&mut self, load: LoadId, err: &LoadError) -> Vec<Effect> {
        if self.lifecycle.pending_load() != Some(load) {
            debug!("Ignoring failure of superseded load {load:?}: {err}");
            return vec![];
        }
        error!("Failed to load document: {err}");
        self.model.reset();
        self.reset_interactions();
        self.view = None;
        self.signals.document_ready = false;
        self.notices
            .notify(format!("Failed to load PDF: {err}"), NoticeLevel::Error);
        self.lifecycle.apply(Command::LoadFailed(load))
    }

    // Signal reconciliation

    /// Reconcile a new set of signals with the current one.
    ///
    /// Any change clears the selection. The document becoming ready issues a
    /// render with stabilization retries; a page or zoom change alone issues a
    /// single render. The ready flag cannot be raised before a document has
    /// loaded.
    #[must_use]
    pub fn observe(&mut self, next: Signals) -> Vec<Effect> {
        let next = Signals {
            document_ready: next.document_ready && self.lifecycle.has_document(),
            zoom: Zoom::clamp_factor(next.zoom),
            ..next
        };
        let prev = self.signals;
        if prev == next {
            return vec![];
        }
        self.signals = next;
        self.reset_interactions();

        if next.zoom != prev.zoom && prev.zoom > 0.0 {
            self.model.rescale_user_elements(next.zoom / prev.zoom);
        }
        if !next.document_ready {
            return vec![];
        }

        let policy = if prev.document_ready {
            RetryPolicy::Single
        } else {
            RetryPolicy::Stabilize
        };
        self.issue_render(RenderTarget::new(next.page, next.zoom), policy)
    }

    #[must_use]
    pub fn set_document_ready(&mut self, ready: bool) -> Vec<Effect> {
        self.observe(Signals {
            document_ready: ready,
            ..self.signals
        })
    }

    /// Navigate to a 1-based page; out-of-range pages are ignored
    #[must_use]
    pub fn go_to_page(&mut self, page: usize) -> Vec<Effect> {
        if page == 0 || page > self.page_count() {
            debug!("Ignoring navigation to page {page} of {}", self.page_count());
            return vec![];
        }
        self.observe(Signals {
            page,
            ..self.signals
        })
    }

    #[must_use]
    pub fn set_zoom(&mut self, zoom: f32) -> Vec<Effect> {
        self.observe(Signals {
            zoom,
            ..self.signals
        })
    }

    #[must_use]
    pub fn zoom_in(&mut self) -> Vec<Effect> {
        let mut zoom = Zoom::new(self.signals.zoom);
        self.set_zoom(zoom.step_in())
    }

    #[must_use]
    pub fn zoom_out(&mut self) -> Vec<Effect> {
        let mut zoom = Zoom::new(self.signals.zoom);
        self.set_zoom(zoom.step_out())
    }

    /// Render `page` at `zoom` once, superseding whatever is in flight
    #[must_use]
    pub fn request_render(&mut self, page: usize, zoom: f32) -> Vec<Effect> {
        let next = Signals {
            page,
            zoom: Zoom::clamp_factor(zoom),
            ..self.signals
        };
        if next != self.signals {
            return self.observe(next);
        }
        if !self.lifecycle.has_document() {
            return vec![];
        }
        self.reset_interactions();
        self.issue_render(RenderTarget::new(next.page, next.zoom), RetryPolicy::Single)
    }

    fn issue_render(&mut self, target: RenderTarget, policy: RetryPolicy) -> Vec<Effect> {
        debug!("Requesting render of page {} at {:.2} ({policy:?})", target.page, target.zoom);
        self.model.clear_extracted();
        self.lifecycle.apply(Command::RequestRender { target, policy })
    }

    // Render results

    /// A render finished. Results of superseded sessions are dropped.
    #[must_use]
    pub fn on_render_complete(&mut self, session: SessionId, page: RenderedPage) -> Vec<Effect> {
        let effects = self.lifecycle.apply(Command::Completed(session));
        self.absorb(effects, Some(page))
    }

    #[must_use]
    pub fn on_render_failed(&mut self, session: SessionId, err: &RenderError) -> Vec<Effect> {
        let effects = self.lifecycle.apply(Command::Failed(session));
        if effects.iter().any(|e| matches!(e, Effect::DiscardPage(_))) {
            error!("Render session {session:?} failed: {err}");
            self.notices
                .notify(format!("Failed to render page: {err}"), NoticeLevel::Error);
        }
        self.absorb(effects, None)
    }

    pub fn on_render_cancelled(&mut self, session: SessionId) {
        let _ = self.lifecycle.apply(Command::Cancelled(session));
    }

    /// A stabilization timer fired
    #[must_use]
    pub fn on_retry_due(&mut self, token: RetryToken) -> Vec<Effect> {
        self.lifecycle.apply(Command::RetryDue(token))
    }

    /// Handle page-level effects here and hand the rest to the host
    fn absorb(&mut self, effects: Vec<Effect>, mut page: Option<RenderedPage>) -> Vec<Effect> {
        let mut host = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::AcceptPage(session) => match page.take() {
                    Some(rendered) => self.accept(rendered),
                    None => warn!("Session {session:?} accepted without a page"),
                },
                Effect::DiscardPage(_) => {
                    self.model.clear_extracted();
                    self.view = None;
                }
                other => host.push(other),
            }
        }
        host
    }

    fn accept(&mut self, rendered: RenderedPage) {
        let layer = build_text_layer(&rendered.items, &rendered.viewport);
        if !layer.skipped.is_empty() {
            warn!(
                "Skipped {} of {} text runs on page {}",
                layer.skipped.len(),
                rendered.items.len(),
                rendered.page
            );
        }
        let has_text = !layer.runs.is_empty();
        debug!(
            "Accepted page {} at {:.2}: {} runs",
            rendered.page,
            rendered.zoom,
            layer.runs.len()
        );
        self.model.replace_extracted(layer);
        self.view = Some(PageView {
            page: rendered.page,
            zoom: rendered.zoom,
            viewport: rendered.viewport,
            raster: rendered.raster,
        });

        if has_text {
            self.notices
                .notify_once(EDIT_TIP, NoticeLevel::Info, self.config.edit_tip_duration);
        }
    }

    // Tools

    pub fn set_tool(&mut self, tool: Tool) {
        debug!("Tool {:?} -> {tool:?}", self.tool);
        self.tool = tool;
        self.reset_interactions();
    }

    fn reset_interactions(&mut self) {
        self.free_text.deactivate();
        self.shapes.cancel();
        self.selection.clear();
        self.model.clear_selection();
    }

    // Free text

    /// Click on the page with the text tool: open an input at `at`.
    /// Ends any drag, inline edit or shape in progress.
    pub fn place_text(&mut self, at: Point, style: TextStyle) -> bool {
        let placed = self.free_text.click(self.tool == Tool::Text, at);
        if placed {
            self.pending_text_style = style;
            self.shapes.cancel();
            self.clear_selection();
        }
        placed
    }

    pub fn type_text(&mut self, text: &str) -> Result<(), InteractionError> {
        self.free_text.input(text)
    }

    /// Key pressed in the free-text input. Returns the new run on commit.
    pub fn text_key(&mut self, key: Key) -> Option<ElementId> {
        let outcome = self.free_text.key(key);
        self.commit_free_text(outcome)
    }

    /// The free-text input lost focus
    pub fn blur_text(&mut self) -> Option<ElementId> {
        let outcome = self.free_text.blur();
        self.commit_free_text(outcome)
    }

    fn commit_free_text(&mut self, outcome: FreeTextOutcome) -> Option<ElementId> {
        match outcome {
            FreeTextOutcome::Committed { at, text } => {
                let style = std::mem::replace(
                    &mut self.pending_text_style,
                    self.config.text_style.clone(),
                );
                Some(self.model.add_custom_text(at, text, style))
            }
            FreeTextOutcome::Discarded | FreeTextOutcome::Pending => None,
        }
    }

    // Shapes

    /// Switch to the shape tool; `None` picks the configured default kind
    pub fn select_shape_tool(&mut self, kind: Option<ShapeKind>) -> ShapeKind {
        let kind = kind.unwrap_or(self.config.shape_kind);
        self.set_tool(Tool::Shape(kind));
        kind
    }

    /// Pointer down with the shape tool. Ends any drag, inline edit or text
    /// placement in progress.
    pub fn begin_shape(
        &mut self,
        at: Point,
        kind: ShapeKind,
        style: ShapeStyle,
    ) -> Result<(), InteractionError> {
        let active = matches!(self.tool, Tool::Shape(_));
        self.shapes.begin(active, at, kind, style)?;
        self.free_text.deactivate();
        self.clear_selection();
        Ok(())
    }

    pub fn update_shape_preview(&mut self, at: Point) -> Option<ShapeGeometry> {
        self.shapes.update(at)
    }

    pub fn shape_preview(&self) -> Option<ShapeGeometry> {
        self.shapes.preview()
    }

    /// Pointer released. Creates a shape unless the drag was a mis-click.
    pub fn commit_shape(&mut self) -> Option<ElementId> {
        let draft = self.shapes.finish()?;
        Some(
            self.model
                .add_shape(draft.kind, draft.start, draft.end, draft.style),
        )
    }

    // Selection, drag and inline editing

    /// Select a text element directly
    pub fn select(&mut self, id: &ElementId) -> Result<(), OverlayError> {
        self.model.select(id)?;
        self.selection.select(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.model.clear_selection();
    }

    /// Click on an element: select first, edit on a second click
    pub fn click(&mut self, id: &ElementId) -> Result<ClickOutcome, OverlayError> {
        let text = match self.model.find_text(id) {
            Some(run) => run.text.clone(),
            None if self.model.find_shape(id).is_some() => {
                return Err(OverlayError::NotSelectable(id.clone()));
            }
            None => return Err(OverlayError::UnknownElement(id.clone())),
        };
        let outcome = self.selection.click(id, &text);
        if let ClickOutcome::Selected(selected) = &outcome {
            self.model.select(selected)?;
        }
        Ok(outcome)
    }

    /// Pointer down on an element; starts a drag if it is the selected one.
    /// A started drag ends any shape or text placement in progress.
    pub fn begin_drag(&mut self, id: &ElementId, pointer: Point) -> Result<bool, OverlayError> {
        let origin = self
            .model
            .position_of(id)
            .ok_or_else(|| OverlayError::UnknownElement(id.clone()))?;
        let dragging = self.selection.pointer_down(id, pointer, origin);
        if dragging {
            self.shapes.cancel();
            self.free_text.deactivate();
        }
        Ok(dragging)
    }

    /// Pointer moved during a drag: returns where the element is drawn now
    pub fn drag_to(&mut self, pointer: Point) -> Option<Point> {
        self.selection.pointer_move(pointer)
    }

    pub fn drag_position(&self) -> Option<Point> {
        self.selection.drag_position()
    }

    /// Pointer released: writes the dragged position into the model
    pub fn commit_drag(&mut self) -> Result<Option<Point>, OverlayError> {
        match self.selection.pointer_up() {
            Some((id, to)) => {
                self.model.move_element(&id, to)?;
                Ok(Some(to))
            }
            None => Ok(None),
        }
    }

    pub fn edit_input(&mut self, text: &str) -> Result<(), InteractionError> {
        self.selection.edit_input(text)
    }

    /// The inline editor lost focus: commit if the text changed
    pub fn blur_edit(&mut self) -> Result<Option<ElementId>, OverlayError> {
        match self.selection.blur() {
            Some((id, text)) => {
                self.model.set_text(&id, text)?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    pub fn edit_text(&mut self, id: &ElementId, text: impl Into<String>) -> Result<(), OverlayError> {
        self.model.set_text(id, text)
    }

    pub fn delete_text(&mut self, id: &ElementId) -> Result<(), OverlayError> {
        self.model.delete_text(id)
    }

    /// Delete key: empty the selected run unless an input has keyboard focus
    pub fn delete_selected(&mut self, input_focused: bool) -> Result<Option<ElementId>, OverlayError> {
        let focused = input_focused || self.free_text.is_placing() || self.selection.is_editing();
        let Some(id) = self.selection.delete_target(focused) else {
            return Ok(None);
        };
        self.model.delete_text(&id)?;
        Ok(Some(id))
    }

    pub fn toggle_original_text(&mut self) -> bool {
        let showing = self.model.toggle_show_original();
        debug!("Original text {}", if showing { "shown" } else { "hidden" });
        showing
    }

    // Apply

    #[must_use]
    pub fn edit_set(&self) -> EditSet {
        self.model.edit_set(self.signals.page, self.signals.zoom)
    }

    /// Hand the current edits to `writer` and return the new document bytes.
    /// The unsaved flag is cleared only when every step succeeds.
    pub fn apply_changes<W: DocumentWriter>(
        &mut self,
        writer: &mut W,
        original: &[u8],
    ) -> Result<Vec<u8>, W::Error> {
        let edits = self.edit_set();
        writer.load_for_editing(original)?;
        writer.apply(&edits)?;
        let bytes = writer.serialize()?;
        self.model.mark_saved();
        info!(
            "Applied {} text edits, {} custom runs, {} shapes",
            edits.text_edits.len(),
            edits.custom_text.len(),
            edits.shapes.len()
        );
        Ok(bytes)
    }
}
