//! Zoom factor for the editor page
//!
//! The zoom multiplies the fit-to-width scale. Every value handed to the
//! session passes through [`Zoom::clamp_factor`], so the render target never
//! carries a non-finite or out-of-range factor.

/// Zoom state for the editor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    pub factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Additive step for zoom in/out - 10 percentage points
    pub const STEP: f32 = 0.1;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.25;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 4.0;
    /// Choices offered by the zoom picker
    pub const PRESETS: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    /// Returns the current zoom factor
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Set the zoom, returning the clamped value
    pub fn set(&mut self, factor: f32) -> f32 {
        self.factor = Self::clamp_factor(factor);
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) -> f32 {
        self.set(self.factor + Self::STEP)
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) -> f32 {
        self.set(self.factor - Self::STEP)
    }

    /// Label shown in the zoom picker, e.g. `125%`
    pub fn percent_label(&self) -> String {
        format!("{}%", (self.factor * 100.0).round() as i32)
    }

    /// Clamp to the allowed range, mapping NaN and infinities to 100%
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            return 1.0;
        }
        // Round away float drift from repeated stepping
        let rounded = (factor * 100.0).round() / 100.0;
        rounded.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_additive_and_clamped() {
        let mut zoom = Zoom::default();
        assert_eq!(zoom.step_in(), 1.1);
        assert_eq!(zoom.step_out(), 1.0);

        let mut zoom = Zoom::new(3.95);
        assert_eq!(zoom.step_in(), Zoom::MAX_SCALE);

        let mut zoom = Zoom::new(0.3);
        assert_eq!(zoom.step_out(), Zoom::MIN_SCALE);
    }

    #[test]
    fn non_finite_falls_back_to_one() {
        assert_eq!(Zoom::clamp_factor(f32::NAN), 1.0);
        assert_eq!(Zoom::clamp_factor(f32::INFINITY), 1.0);
        assert_eq!(Zoom::clamp_factor(f32::NEG_INFINITY), 1.0);
    }

    #[test]
    fn presets_are_within_range() {
        for preset in Zoom::PRESETS {
            assert_eq!(Zoom::clamp_factor(preset), preset);
        }
    }

    #[test]
    fn percent_label_rounds() {
        assert_eq!(Zoom::new(1.25).percent_label(), "125%");
        assert_eq!(Zoom::new(0.5).percent_label(), "50%");
    }
}
