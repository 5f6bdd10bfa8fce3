//! Overlay element types
//!
//! Three element families share the [`Positioned`] contract: text runs
//! extracted from the page, free text typed by the user, and vector shapes.
//! Masks are derived data and are not positioned elements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect, ShapeGeometry, shape_geometry};

/// Stable identifier of an overlay element
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing component after the last `-`, shared between a run and its mask
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Position and extent shared by every overlay element
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Top-left corner in raster pixels at the current zoom
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Clockwise rotation in degrees, 0 when unrotated
    #[serde(default)]
    pub rotation_degrees: f32,
}

impl Placement {
    #[must_use]
    pub fn at(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Base contract for overlay items.
///
/// Writes go through [`crate::overlay::OverlayModel`]; controllers never
/// mutate elements in place.
pub trait Positioned {
    fn id(&self) -> &ElementId;
    fn placement(&self) -> &Placement;
    fn move_to(&mut self, point: Point);

    fn position(&self) -> Point {
        self.placement().origin()
    }

    fn rotation_degrees(&self) -> f32 {
        self.placement().rotation_degrees
    }
}

/// RGB color serialized as `#rrggbb`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #rrggbb")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Font attributes of a text run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size_px: f32,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size_px: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
        }
    }
}

/// Where a text run came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrigin {
    /// Reported by the rendering engine for the current page
    Extracted,
    /// Typed by the user with the free-text tool
    Custom,
}

/// Text as the engine reported it, kept so edits can be diffed later
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceText {
    pub text: String,
    pub position: Point,
}

/// A run of text drawn above the page raster
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub id: ElementId,
    pub placement: Placement,
    pub text: String,
    pub style: TextStyle,
    pub scale_x: f32,
    pub scale_y: f32,
    pub origin: TextOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceText>,
}

impl TextRun {
    #[must_use]
    pub fn is_extracted(&self) -> bool {
        self.origin == TextOrigin::Extracted
    }

    /// True when text or position differ from what the engine reported
    #[must_use]
    pub fn is_modified(&self) -> bool {
        match &self.source {
            Some(source) => source.text != self.text || source.position != self.position(),
            None => true,
        }
    }
}

impl Positioned for TextRun {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn move_to(&mut self, point: Point) {
        self.placement.x = point.x;
        self.placement.y = point.y;
    }
}

/// Occluding rectangle hiding an extracted run's original glyphs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskRect {
    pub id: ElementId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation_degrees: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Line,
    Arrow,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Line,
        ShapeKind::Arrow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Line => "line",
            ShapeKind::Arrow => "arrow",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown shape kind '{s}'"))
    }
}

/// Stroke attributes of a shape
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub color: Color,
    pub stroke_width: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            stroke_width: 2.0,
        }
    }
}

/// A committed vector shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ElementId,
    pub kind: ShapeKind,
    pub placement: Placement,
    /// Raw drag endpoints; lines and arrows draw from these, not the box
    pub start: Point,
    pub end: Point,
    pub style: ShapeStyle,
}

impl Shape {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.placement.x,
            self.placement.y,
            self.placement.width.unwrap_or_default(),
            self.placement.height.unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn geometry(&self) -> ShapeGeometry {
        shape_geometry(self.kind, self.start, self.end, self.style.stroke_width)
    }

    /// Multiply every coordinate by `factor`
    pub fn rescale(&mut self, factor: f32) {
        self.placement.x *= factor;
        self.placement.y *= factor;
        self.placement.width = self.placement.width.map(|w| w * factor);
        self.placement.height = self.placement.height.map(|h| h * factor);
        self.start = Point::new(self.start.x * factor, self.start.y * factor);
        self.end = Point::new(self.end.x * factor, self.end.y * factor);
    }
}

impl Positioned for Shape {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Translates the box and both endpoints together
    fn move_to(&mut self, point: Point) {
        let delta = point.offset_from(&self.placement.origin());
        self.placement.x = point.x;
        self.placement.y = point.y;
        self.start = Point::new(self.start.x + delta.x, self.start.y + delta.y);
        self.end = Point::new(self.end.x + delta.x, self.end.y + delta.y);
    }
}
