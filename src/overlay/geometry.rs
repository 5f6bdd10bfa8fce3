//! Geometry primitives for overlay placement
//!
//! Everything here is pure: affine transform composition and decomposition,
//! bounding-box normalization and arrowhead construction. Coordinates are
//! raster pixels with the origin at the top-left corner and y growing down.

use serde::{Deserialize, Serialize};

use super::elements::ShapeKind;

/// Default arrowhead barb length in pixels
pub const ARROW_LENGTH: f32 = 15.0;

/// Default arrowhead half-angle (30 degrees)
pub const ARROW_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_6;

/// Rotations this close to a full turn collapse to zero
const FULL_TURN_SNAP: f32 = 1e-3;

/// Errors produced while turning an engine transform into screen geometry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("transform contains a non-finite component: {0:?}")]
    NonFinite([f32; 6]),

    #[error("transform is degenerate (determinant {determinant})")]
    Degenerate { determinant: f32 },

    #[error("text run has a non-positive extent ({width}x{height})")]
    EmptyExtent { width: f32, height: f32 },
}

/// A point in raster pixel space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[must_use]
    pub fn offset_from(&self, origin: &Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Axis-aligned rectangle with a top-left origin
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Grow the rectangle by `amount` on every side
    #[must_use]
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}

/// 2-D affine transform `[a b c d e f]`, mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    #[must_use]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    #[must_use]
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Counter-clockwise rotation in the matrix's own basis
    #[must_use]
    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    #[must_use]
    pub const fn from_array(m: [f32; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    #[must_use]
    pub const fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compose `outer` with `inner`: the result applies `inner` first, then
    /// `outer`. This is how a viewport transform is combined with a text
    /// item's content transform.
    #[must_use]
    pub fn compose(outer: &Matrix, inner: &Matrix) -> Matrix {
        Matrix::new(
            outer.a * inner.a + outer.c * inner.b,
            outer.b * inner.a + outer.d * inner.b,
            outer.a * inner.c + outer.c * inner.d,
            outer.b * inner.c + outer.d * inner.d,
            outer.a * inner.e + outer.c * inner.f + outer.e,
            outer.b * inner.e + outer.d * inner.f + outer.f,
        )
    }

    #[must_use]
    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    #[must_use]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Screen-space placement recovered from a combined transform
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Decomposed {
    pub x_px: f32,
    pub y_px: f32,
    pub rotation_degrees: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Split a combined viewport x content transform into translation, rotation
/// and per-axis scale.
///
/// Rotation is `atan2(b, a)` reported in degrees within `[0, 360)`; scales are
/// the lengths of the two basis columns. No special-casing by rotation value.
pub fn decompose_transform(matrix: &Matrix) -> Result<Decomposed, GeometryError> {
    if !matrix.is_finite() {
        return Err(GeometryError::NonFinite(matrix.to_array()));
    }

    let Matrix { a, b, c, d, e, f } = *matrix;

    Ok(Decomposed {
        x_px: e,
        y_px: f,
        rotation_degrees: normalize_degrees(b.atan2(a).to_degrees()),
        scale_x: (a * a + b * b).sqrt(),
        scale_y: (c * c + d * d).sqrt(),
    })
}

/// Fold an angle into `[0, 360)`, snapping values a hair below 360 back to 0
#[must_use]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let folded = degrees.rem_euclid(360.0);
    if 360.0 - folded < FULL_TURN_SNAP || folded.abs() < FULL_TURN_SNAP {
        0.0
    } else {
        folded
    }
}

/// Bounding box spanned by two arbitrary corners. Symmetric in argument order.
#[must_use]
pub fn normalize_box(p1: Point, p2: Point) -> Rect {
    Rect::new(
        p1.x.min(p2.x),
        p1.y.min(p2.y),
        (p2.x - p1.x).abs(),
        (p2.y - p1.y).abs(),
    )
}

/// The two barb vertices of an arrowhead drawn at `tip`.
///
/// When `tail == tip` the segment has no direction and both barbs collapse
/// onto the tip.
#[must_use]
pub fn arrowhead_vertices(tail: Point, tip: Point, length: f32, half_angle: f32) -> [Point; 2] {
    let dx = tip.x - tail.x;
    let dy = tip.y - tail.y;
    if dx == 0.0 && dy == 0.0 {
        return [tip, tip];
    }

    let theta = dy.atan2(dx);
    let barb = |angle: f32| {
        Point::new(
            tip.x - length * angle.cos(),
            tip.y - length * angle.sin(),
        )
    };

    [barb(theta - half_angle), barb(theta + half_angle)]
}

/// Drawable geometry for one shape, shared by live preview and committed shapes
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeGeometry {
    Rectangle {
        bounds: Rect,
    },
    /// Circle inscribed in a square of side `diameter` anchored at `origin`
    Circle {
        origin: Point,
        diameter: f32,
    },
    Line {
        start: Point,
        end: Point,
        /// Drawing frame padded by the stroke width
        frame: Rect,
    },
    Arrow {
        start: Point,
        end: Point,
        frame: Rect,
        /// Tip followed by the two barbs
        head: [Point; 3],
    },
}

/// Compute drawable geometry for `kind` dragged from `start` to `end`
#[must_use]
pub fn shape_geometry(kind: ShapeKind, start: Point, end: Point, stroke_width: f32) -> ShapeGeometry {
    let bounds = normalize_box(start, end);
    match kind {
        ShapeKind::Rectangle => ShapeGeometry::Rectangle { bounds },
        ShapeKind::Circle => ShapeGeometry::Circle {
            origin: Point::new(bounds.x, bounds.y),
            diameter: bounds.width.max(bounds.height),
        },
        ShapeKind::Line => ShapeGeometry::Line {
            start,
            end,
            frame: bounds.inflate(stroke_width),
        },
        ShapeKind::Arrow => {
            let [left, right] = arrowhead_vertices(start, end, ARROW_LENGTH, ARROW_HALF_ANGLE);
            ShapeGeometry::Arrow {
                start,
                end,
                frame: bounds.inflate(stroke_width),
                head: [end, left, right],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn uniform_scale_has_no_rotation() {
        for k in [0.5_f32, 1.0, 2.0, 3.75, -2.0] {
            let d = decompose_transform(&Matrix::new(k, 0.0, 0.0, k, 0.0, 0.0)).unwrap();
            assert!(approx(d.scale_x, k.abs()), "k={k} scale_x={}", d.scale_x);
            assert!(approx(d.scale_y, k.abs()), "k={k} scale_y={}", d.scale_y);
            if k > 0.0 {
                assert_eq!(d.rotation_degrees, 0.0);
            }
        }
    }

    #[test]
    fn pure_rotation_roundtrips_to_degrees() {
        for deg in [0.0_f32, 45.0, 90.0, 180.0, 270.0] {
            let d = decompose_transform(&Matrix::rotation(deg.to_radians())).unwrap();
            assert!(
                approx(d.rotation_degrees, deg),
                "expected {deg}, got {}",
                d.rotation_degrees
            );
            assert!(approx(d.scale_x, 1.0));
            assert!(approx(d.scale_y, 1.0));
        }
    }

    #[test]
    fn translation_comes_from_e_and_f() {
        let d = decompose_transform(&Matrix::new(1.0, 0.0, 0.0, 1.0, 50.0, 75.5)).unwrap();
        assert_eq!((d.x_px, d.y_px), (50.0, 75.5));
    }

    #[test]
    fn non_uniform_scale_is_reported_per_axis() {
        let d = decompose_transform(&Matrix::new(3.0, 4.0, 0.0, 2.0, 0.0, 0.0)).unwrap();
        assert!(approx(d.scale_x, 5.0));
        assert!(approx(d.scale_y, 2.0));
    }

    #[test]
    fn non_finite_transform_is_rejected() {
        let m = Matrix::new(f32::NAN, 0.0, 0.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            decompose_transform(&m),
            Err(GeometryError::NonFinite(_))
        ));
    }

    #[test]
    fn compose_applies_inner_first() {
        let viewport = Matrix::scale(2.0, 2.0);
        let item = Matrix::translate(10.0, 20.0);
        let combined = Matrix::compose(&viewport, &item);
        assert_eq!(combined.apply(Point::new(0.0, 0.0)), Point::new(20.0, 40.0));
        assert_eq!(combined.to_array(), [2.0, 0.0, 0.0, 2.0, 20.0, 40.0]);
    }

    #[test]
    fn normalize_box_is_symmetric() {
        let pairs = [
            (Point::new(10.0, 10.0), Point::new(20.0, 5.0)),
            (Point::new(-3.0, 7.5), Point::new(4.0, -1.0)),
            (Point::new(1.0, 1.0), Point::new(1.0, 1.0)),
        ];
        for (p1, p2) in pairs {
            assert_eq!(normalize_box(p1, p2), normalize_box(p2, p1));
        }
        assert_eq!(
            normalize_box(Point::new(20.0, 5.0), Point::new(10.0, 10.0)),
            Rect::new(10.0, 5.0, 10.0, 5.0)
        );
    }

    #[test]
    fn arrowhead_barbs_trail_the_tip() {
        let [left, right] = arrowhead_vertices(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            ARROW_LENGTH,
            ARROW_HALF_ANGLE,
        );
        let dx = ARROW_LENGTH * ARROW_HALF_ANGLE.cos();
        let dy = ARROW_LENGTH * ARROW_HALF_ANGLE.sin();
        assert!(approx(left.x, 100.0 - dx) && approx(left.y, dy));
        assert!(approx(right.x, 100.0 - dx) && approx(right.y, -dy));
    }

    #[test]
    fn degenerate_arrow_collapses_onto_tip() {
        let tip = Point::new(5.0, 5.0);
        let barbs = arrowhead_vertices(tip, tip, ARROW_LENGTH, ARROW_HALF_ANGLE);
        assert_eq!(barbs, [tip, tip]);
        assert!(barbs.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn circle_uses_larger_side_as_diameter() {
        let geometry = shape_geometry(
            ShapeKind::Circle,
            Point::new(30.0, 10.0),
            Point::new(10.0, 50.0),
            2.0,
        );
        assert_eq!(
            geometry,
            ShapeGeometry::Circle {
                origin: Point::new(10.0, 10.0),
                diameter: 40.0
            }
        );
    }

    #[test]
    fn line_frame_is_padded_by_stroke() {
        let ShapeGeometry::Line { frame, .. } = shape_geometry(
            ShapeKind::Line,
            Point::new(10.0, 10.0),
            Point::new(20.0, 30.0),
            3.0,
        ) else {
            panic!("expected line geometry");
        };
        assert_eq!(frame, Rect::new(7.0, 7.0, 16.0, 26.0));
    }
}
