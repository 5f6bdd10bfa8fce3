//! Free-text placement: click to place, type, Enter or blur to commit

use crate::overlay::geometry::Point;

use super::{InteractionError, Key};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FreeTextState {
    #[default]
    Idle,
    /// An input is open at `at` holding `draft`
    Placing { at: Point, draft: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum FreeTextOutcome {
    /// Still typing
    Pending,
    /// Create a custom run with this (trimmed) text
    Committed { at: Point, text: String },
    /// Placement dropped, nothing to create
    Discarded,
}

#[derive(Debug, Default)]
pub struct FreeTextController {
    state: FreeTextState,
}

impl FreeTextController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FreeTextState {
        &self.state
    }

    pub fn is_placing(&self) -> bool {
        matches!(self.state, FreeTextState::Placing { .. })
    }

    /// Open an input at `at`. Ignored unless idle with the tool active.
    pub fn click(&mut self, tool_active: bool, at: Point) -> bool {
        if !tool_active || self.is_placing() {
            return false;
        }
        self.state = FreeTextState::Placing {
            at,
            draft: String::new(),
        };
        true
    }

    /// Replace the draft with the input's current contents
    pub fn input(&mut self, text: &str) -> Result<(), InteractionError> {
        match &mut self.state {
            FreeTextState::Placing { draft, .. } => {
                text.clone_into(draft);
                Ok(())
            }
            FreeTextState::Idle => Err(InteractionError::NotPlacing),
        }
    }

    pub fn key(&mut self, key: Key) -> FreeTextOutcome {
        if !self.is_placing() {
            return FreeTextOutcome::Pending;
        }
        match key {
            Key::Enter => self.commit(),
            Key::Escape => {
                self.state = FreeTextState::Idle;
                FreeTextOutcome::Discarded
            }
            Key::ShiftEnter => {
                if let FreeTextState::Placing { draft, .. } = &mut self.state {
                    draft.push('\n');
                }
                FreeTextOutcome::Pending
            }
            Key::Delete => FreeTextOutcome::Pending,
        }
    }

    /// The input lost focus
    pub fn blur(&mut self) -> FreeTextOutcome {
        if self.is_placing() {
            self.commit()
        } else {
            FreeTextOutcome::Pending
        }
    }

    /// Tool switched away: drop any placement
    pub fn deactivate(&mut self) {
        self.state = FreeTextState::Idle;
    }

    fn commit(&mut self) -> FreeTextOutcome {
        match std::mem::take(&mut self.state) {
            FreeTextState::Placing { at, draft } => {
                let text = draft.trim();
                if text.is_empty() {
                    FreeTextOutcome::Discarded
                } else {
                    FreeTextOutcome::Committed {
                        at,
                        text: text.to_string(),
                    }
                }
            }
            FreeTextState::Idle => FreeTextOutcome::Pending,
        }
    }
}
