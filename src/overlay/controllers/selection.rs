//! Selection, inline editing and dragging of text runs

use crate::overlay::elements::ElementId;
use crate::overlay::geometry::Point;

use super::InteractionError;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(ElementId),
    /// Inline input open on `id`; `original` is the text when editing began
    Editing {
        id: ElementId,
        draft: String,
        original: String,
    },
    /// Pointer held on `id`; `grab_offset` is pointer minus element origin
    Dragging {
        id: ElementId,
        grab_offset: Point,
        origin: Point,
        position: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClickOutcome {
    Selected(ElementId),
    EditingStarted(ElementId),
    Ignored,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The element the selection, edit or drag refers to
    pub fn selected_id(&self) -> Option<&ElementId> {
        match &self.state {
            SelectionState::Unselected => None,
            SelectionState::Selected(id)
            | SelectionState::Editing { id, .. }
            | SelectionState::Dragging { id, .. } => Some(id),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, SelectionState::Editing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// First click selects; a click on the already selected run opens the editor.
    pub fn click(&mut self, id: &ElementId, current_text: &str) -> ClickOutcome {
        match &self.state {
            SelectionState::Editing { .. } | SelectionState::Dragging { .. } => ClickOutcome::Ignored,
            SelectionState::Selected(selected) if selected == id => {
                self.state = SelectionState::Editing {
                    id: id.clone(),
                    draft: current_text.to_string(),
                    original: current_text.to_string(),
                };
                ClickOutcome::EditingStarted(id.clone())
            }
            _ => {
                self.state = SelectionState::Selected(id.clone());
                ClickOutcome::Selected(id.clone())
            }
        }
    }

    pub fn select(&mut self, id: ElementId) {
        self.state = SelectionState::Selected(id);
    }

    /// Pointer down on `id`. Starts a drag only when `id` is the selected run.
    pub fn pointer_down(&mut self, id: &ElementId, pointer: Point, element_origin: Point) -> bool {
        match &self.state {
            SelectionState::Selected(selected) if selected == id => {
                self.state = SelectionState::Dragging {
                    id: id.clone(),
                    grab_offset: pointer.offset_from(&element_origin),
                    origin: element_origin,
                    position: element_origin,
                };
                true
            }
            _ => false,
        }
    }

    /// Pointer move while dragging: returns the element's new origin
    pub fn pointer_move(&mut self, pointer: Point) -> Option<Point> {
        if let SelectionState::Dragging {
            grab_offset,
            position,
            ..
        } = &mut self.state
        {
            *position = pointer.offset_from(grab_offset);
            Some(*position)
        } else {
            None
        }
    }

    /// Origin the dragged element is currently previewed at
    pub fn drag_position(&self) -> Option<Point> {
        match &self.state {
            SelectionState::Dragging { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Pointer up: ends the drag, keeping the element selected.
    /// Returns the move to commit, or `None` when it never left its origin.
    pub fn pointer_up(&mut self) -> Option<(ElementId, Point)> {
        match std::mem::take(&mut self.state) {
            SelectionState::Dragging {
                id,
                origin,
                position,
                ..
            } => {
                self.state = SelectionState::Selected(id.clone());
                (position != origin).then_some((id, position))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Replace the edit draft with the input's current contents
    pub fn edit_input(&mut self, text: &str) -> Result<(), InteractionError> {
        match &mut self.state {
            SelectionState::Editing { draft, .. } => {
                text.clone_into(draft);
                Ok(())
            }
            _ => Err(InteractionError::NotEditing),
        }
    }

    /// The edit input lost focus. Returns the text to commit when it changed.
    pub fn blur(&mut self) -> Option<(ElementId, String)> {
        match std::mem::take(&mut self.state) {
            SelectionState::Editing {
                id,
                draft,
                original,
            } => {
                self.state = SelectionState::Selected(id.clone());
                (draft != original).then_some((id, draft))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Delete key: the run whose text should be cleared, unless an input has focus
    pub fn delete_target(&self, input_focused: bool) -> Option<ElementId> {
        if input_focused {
            return None;
        }
        match &self.state {
            SelectionState::Selected(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::Unselected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(id: &str) -> SelectionController {
        let mut controller = SelectionController::new();
        controller.select(ElementId::from(id));
        controller
    }

    #[test]
    fn first_click_selects_second_click_edits() {
        let mut controller = SelectionController::new();
        let id = ElementId::from("text-0");
        assert_eq!(controller.click(&id, "Hello"), ClickOutcome::Selected(id.clone()));
        assert_eq!(
            controller.click(&id, "Hello"),
            ClickOutcome::EditingStarted(id.clone())
        );
        assert!(controller.is_editing());
    }

    #[test]
    fn clicking_another_run_moves_selection() {
        let mut controller = selected("text-0");
        let other = ElementId::from("text-3");
        assert_eq!(controller.click(&other, "x"), ClickOutcome::Selected(other.clone()));
        assert_eq!(controller.selected_id(), Some(&other));
    }

    #[test]
    fn blur_commits_only_changed_text() {
        let mut controller = selected("text-0");
        let id = ElementId::from("text-0");
        controller.click(&id, "Hello");
        assert_eq!(controller.blur(), None);
        assert_eq!(controller.state(), &SelectionState::Selected(id.clone()));

        controller.click(&id, "Hello");
        controller.edit_input("Goodbye").unwrap();
        assert_eq!(controller.blur(), Some((id, "Goodbye".to_string())));
    }

    #[test]
    fn edit_input_outside_editing_fails() {
        let mut controller = selected("text-0");
        assert_eq!(controller.edit_input("x"), Err(InteractionError::NotEditing));
    }

    #[test]
    fn drag_keeps_grab_offset() {
        let mut controller = selected("text-0");
        let id = ElementId::from("text-0");
        assert!(controller.pointer_down(&id, Point::new(15.0, 25.0), Point::new(10.0, 20.0)));
        assert_eq!(
            controller.pointer_move(Point::new(105.0, 45.0)),
            Some(Point::new(100.0, 40.0))
        );
        assert_eq!(controller.pointer_up(), Some((id.clone(), Point::new(100.0, 40.0))));
        assert_eq!(controller.selected_id(), Some(&id));
    }

    #[test]
    fn drag_back_to_origin_commits_nothing() {
        let mut controller = selected("text-0");
        let id = ElementId::from("text-0");
        controller.pointer_down(&id, Point::new(15.0, 25.0), Point::new(10.0, 20.0));
        controller.pointer_move(Point::new(50.0, 50.0));
        controller.pointer_move(Point::new(15.0, 25.0));
        assert_eq!(controller.pointer_up(), None);
    }

    #[test]
    fn pointer_down_on_unselected_run_does_not_drag() {
        let mut controller = selected("text-0");
        assert!(!controller.pointer_down(
            &ElementId::from("text-1"),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0)
        ));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn delete_target_respects_focused_input() {
        let controller = selected("text-2");
        assert_eq!(controller.delete_target(true), None);
        assert_eq!(controller.delete_target(false), Some(ElementId::from("text-2")));
        assert_eq!(SelectionController::new().delete_target(false), None);
    }
}
