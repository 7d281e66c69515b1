//! Transform planning.
//!
//! Pure geometry, no pixels. A frame goes through three coordinate spaces:
//!
//! - sensor space: the raw capture, `frame.width x frame.height`
//! - preview space: the oriented image scaled to fill the viewport, cropped
//!   top-left to the viewport size
//! - model space: the preview crop stretched to the detector input size
//!
//! `TransformPlanner::plan` computes the maps between them for one frame.
//! Detections travel back from model space to preview space through the
//! stored inverse of the model-input transform.
//!
//! Rotations follow the y-down screen convention: positive angles turn
//! clockwise on screen.

use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

// ----------------------------------------------------------------------------
// Sizes, rotations, points, rectangles
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width and height swapped.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// True when `other` fits inside `self` anchored at the origin.
    pub fn contains(&self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = String;

    /// Parses `"640x480"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in '{}'", s))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in '{}'", s))?;
        Ok(Self::new(width, height))
    }
}

/// Quarter-turn rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts any multiple of 90, negative values included.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            _ => Self::Deg270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Odd multiples of 90 swap width and height.
    pub fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// `self - other`, wrapped into [0, 360).
    pub fn minus(self, other: Rotation) -> Rotation {
        Self::from_degrees(self.degrees() - other.degrees()).unwrap_or_default()
    }

    /// Exact cosine and sine; no `f64::to_radians` rounding noise.
    fn cos_sin(self) -> (f64, f64) {
        match self {
            Self::Deg0 => (1.0, 0.0),
            Self::Deg90 => (0.0, 1.0),
            Self::Deg180 => (-1.0, 0.0),
            Self::Deg270 => (0.0, -1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, edges in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the rectangle lies inside `[0, size.width] x [0, size.height]`.
    pub fn within(&self, size: Size) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right <= size.width as f32
            && self.bottom <= size.height as f32
            && self.left <= self.right
            && self.top <= self.bottom
    }

    /// Intersect with `[0, size.width] x [0, size.height]`. A rectangle with
    /// a non-finite edge collapses to an empty one at the origin.
    pub fn clamped(&self, size: Size) -> Rect {
        if ![self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
        {
            return Rect::new(0.0, 0.0, 0.0, 0.0);
        }
        let (w, h) = (size.width as f32, size.height as f32);
        let left = self.left.clamp(0.0, w);
        let top = self.top.clamp(0.0, h);
        Rect::new(
            left,
            top,
            self.right.clamp(left, w),
            self.bottom.clamp(top, h),
        )
    }

    fn corners(&self) -> [Point; 4] {
        let (l, t, r, b) = (
            self.left as f64,
            self.top as f64,
            self.right as f64,
            self.bottom as f64,
        );
        [
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ]
    }
}

// ----------------------------------------------------------------------------
// Matrix: 2x3 affine
// ----------------------------------------------------------------------------

/// Affine matrix `[a b c d e f]`:
///
/// ```text
/// x' = a*x + c*y + e
/// y' = b*x + d*y + f
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(rotation: Rotation) -> Self {
        let (cos, sin) = rotation.cos_sin();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverted(&self) -> Option<Matrix> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(Matrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn map_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Bounding box of the four mapped corners.
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        let mapped = rect.corners().map(|p| self.map_point(p));
        let mut out = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for p in mapped {
            out.left = out.left.min(p.x as f32);
            out.top = out.top.min(p.y as f32);
            out.right = out.right.max(p.x as f32);
            out.bottom = out.bottom.max(p.y as f32);
        }
        out
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ----------------------------------------------------------------------------
// AffineTransform: forward matrix + verified inverse
// ----------------------------------------------------------------------------

/// An invertible affine map. The inverse is computed once, at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    forward: Matrix,
    inverse: Matrix,
}

impl AffineTransform {
    pub fn from_matrix(forward: Matrix) -> Result<Self, PipelineError> {
        let inverse = forward.inverted().ok_or_else(|| {
            PipelineError::degenerate(format!(
                "singular matrix (determinant {})",
                forward.determinant()
            ))
        })?;
        Ok(Self { forward, inverse })
    }

    pub fn identity() -> Self {
        Self {
            forward: Matrix::IDENTITY,
            inverse: Matrix::IDENTITY,
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.forward
    }

    /// The same map run backwards.
    pub fn inverse(&self) -> AffineTransform {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        Self {
            forward: self.forward.then(&next.forward),
            inverse: next.inverse.then(&self.inverse),
        }
    }

    pub fn map_point(&self, p: Point) -> Point {
        self.forward.map_point(p)
    }

    pub fn inverse_map_point(&self, p: Point) -> Point {
        self.inverse.map_point(p)
    }

    pub fn map_rect(&self, rect: &Rect) -> Rect {
        self.forward.map_rect(rect)
    }

    pub fn inverse_map_rect(&self, rect: &Rect) -> Rect {
        self.inverse.map_rect(rect)
    }
}

/// Map an `src`-sized image onto a `dst`-sized one.
///
/// The source is centred on the origin, rotated, optionally mirrored along the
/// output x axis, stretched so its (rotated) extent matches `dst` on both
/// axes, and moved back so the result covers `[0, dst.width] x [0, dst.height]`.
pub fn build_transform(
    src: Size,
    dst: Size,
    rotation: Rotation,
    mirror: bool,
) -> Result<AffineTransform, PipelineError> {
    if src.is_empty() || dst.is_empty() {
        return Err(PipelineError::degenerate(format!(
            "cannot map {} onto {}",
            src, dst
        )));
    }

    let rotated = if rotation.is_transposed() {
        src.transposed()
    } else {
        src
    };
    let sx = dst.width as f64 / rotated.width as f64;
    let sy = dst.height as f64 / rotated.height as f64;
    let flip = if mirror { -1.0 } else { 1.0 };

    let matrix = Matrix::translation(-(src.width as f64) / 2.0, -(src.height as f64) / 2.0)
        .then(&Matrix::rotation(rotation))
        .then(&Matrix::scaling(flip, 1.0))
        .then(&Matrix::scaling(sx, sy))
        .then(&Matrix::translation(
            dst.width as f64 / 2.0,
            dst.height as f64 / 2.0,
        ));

    AffineTransform::from_matrix(matrix)
}

// ----------------------------------------------------------------------------
// TransformPlanner
// ----------------------------------------------------------------------------

/// All geometry needed to push one frame through the pipeline.
#[derive(Clone, Copy, Debug)]
pub struct FramePlan {
    /// Rotation actually applied to sensor pixels.
    pub applied_rotation: Rotation,
    /// Sensor frame -> screen-filling oriented image.
    pub orient: AffineTransform,
    pub oriented_size: Size,
    /// Top-left anchored crop of the oriented image; equals the viewport.
    pub crop: Size,
    /// Preview crop -> detector input.
    pub to_model: AffineTransform,
    pub model_input: Size,
}

impl FramePlan {
    /// Model-space rectangle -> preview-space rectangle.
    pub fn model_to_preview(&self, rect: &Rect) -> Rect {
        self.to_model.inverse_map_rect(rect)
    }

    /// Preview-space rectangle -> model-space rectangle.
    pub fn preview_to_model(&self, rect: &Rect) -> Rect {
        self.to_model.map_rect(rect)
    }
}

/// Computes per-frame transforms.
///
/// `sensor_orientation` is the clockwise rotation that turns sensor pixels
/// upright when the device is in its natural orientation (90 for most phone
/// back cameras). The rotation applied to a frame is the sensor orientation
/// minus the device rotation at capture time.
#[derive(Clone, Copy, Debug)]
pub struct TransformPlanner {
    sensor_orientation: Rotation,
    mirror: bool,
    model_input: Size,
}

impl TransformPlanner {
    pub fn new(sensor_orientation: Rotation, model_input: Size) -> Self {
        Self {
            sensor_orientation,
            mirror: false,
            model_input,
        }
    }

    /// Mirror frames left-right on screen (front cameras), whatever the
    /// applied rotation.
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn model_input(&self) -> Size {
        self.model_input
    }

    pub fn applied_rotation(&self, device_rotation: Rotation) -> Rotation {
        self.sensor_orientation.minus(device_rotation)
    }

    /// Size of the oriented image that fills `viewport` without gaps.
    ///
    /// Both axes scale by `max(viewport.w / effective.w, viewport.h / effective.h)`,
    /// where `effective` is the frame size after rotation.
    pub fn oriented_size(
        &self,
        frame: Size,
        viewport: Size,
        rotation: Rotation,
    ) -> Result<Size, PipelineError> {
        if frame.is_empty() || viewport.is_empty() {
            return Err(PipelineError::degenerate(format!(
                "cannot fill viewport {} from frame {}",
                viewport, frame
            )));
        }
        let effective = if rotation.is_transposed() {
            frame.transposed()
        } else {
            frame
        };
        let scale = f64::max(
            viewport.width as f64 / effective.width as f64,
            viewport.height as f64 / effective.height as f64,
        );
        let width = (effective.width as f64 * scale).round() as u32;
        let height = (effective.height as f64 * scale).round() as u32;
        Ok(Size::new(width.max(1), height.max(1)))
    }

    pub fn plan(
        &self,
        frame: Size,
        viewport: Size,
        device_rotation: Rotation,
    ) -> Result<FramePlan, PipelineError> {
        let applied_rotation = self.applied_rotation(device_rotation);
        let oriented_size = self.oriented_size(frame, viewport, applied_rotation)?;
        let orient = build_transform(frame, oriented_size, applied_rotation, self.mirror)?;

        if !oriented_size.contains(viewport) {
            return Err(PipelineError::degenerate(format!(
                "viewport {} exceeds oriented image {}",
                viewport, oriented_size
            )));
        }

        let to_model = build_transform(viewport, self.model_input, Rotation::Deg0, false)?;

        Ok(FramePlan {
            applied_rotation,
            orient,
            oriented_size,
            crop: viewport,
            to_model,
            model_input: self.model_input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-3;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < TOL && (a.y - b.y).abs() < TOL,
            "{:?} != {:?}",
            a,
            b
        );
    }

    fn assert_rect_close(a: &Rect, b: &Rect) {
        for (x, y) in [
            (a.left, b.left),
            (a.top, b.top),
            (a.right, b.right),
            (a.bottom, b.bottom),
        ] {
            assert!((x - y).abs() < 1e-3, "{:?} != {:?}", a, b);
        }
    }

    fn sample_points(size: Size) -> Vec<Point> {
        let (w, h) = (size.width as f64, size.height as f64);
        vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
            Point::new(w / 2.0, h / 2.0),
            Point::new(w * 0.3, h * 0.7),
            Point::new(17.25, 3.5),
        ]
    }

    #[test]
    fn forward_then_inverse_is_identity() {
        let sizes = [
            (Size::new(640, 480), Size::new(480, 640)),
            (Size::new(1920, 1080), Size::new(320, 320)),
            (Size::new(3, 7), Size::new(1000, 11)),
        ];
        for (src, dst) in sizes {
            for degrees in [0, 90, 180, 270] {
                for mirror in [false, true] {
                    let rotation = Rotation::from_degrees(degrees).unwrap();
                    let t = build_transform(src, dst, rotation, mirror).unwrap();
                    for p in sample_points(src) {
                        assert_close(t.inverse_map_point(t.map_point(p)), p);
                    }
                    for p in sample_points(dst) {
                        assert_close(t.map_point(t.inverse_map_point(p)), p);
                    }
                    let round = t.then(&t.inverse());
                    assert_close(round.map_point(Point::new(5.0, 9.0)), Point::new(5.0, 9.0));
                }
            }
        }
    }

    #[test]
    fn quarter_turn_maps_corners_clockwise() {
        let t = build_transform(
            Size::new(640, 480),
            Size::new(480, 640),
            Rotation::Deg90,
            false,
        )
        .unwrap();
        // Top-left of the sensor frame lands top-right on screen.
        assert_close(t.map_point(Point::new(0.0, 0.0)), Point::new(480.0, 0.0));
        assert_close(t.map_point(Point::new(640.0, 480.0)), Point::new(0.0, 640.0));
        let bounds = t.map_rect(&Rect::new(0.0, 0.0, 640.0, 480.0));
        assert_rect_close(&bounds, &Rect::new(0.0, 0.0, 480.0, 640.0));
    }

    #[test]
    fn mirror_flips_horizontally() {
        let t = build_transform(Size::new(100, 50), Size::new(100, 50), Rotation::Deg0, true)
            .unwrap();
        assert_close(t.map_point(Point::new(0.0, 0.0)), Point::new(100.0, 0.0));
        assert_close(t.map_point(Point::new(25.0, 10.0)), Point::new(75.0, 10.0));
    }

    #[test]
    fn mirror_after_quarter_turn_is_screen_horizontal() {
        let plain = build_transform(
            Size::new(640, 480),
            Size::new(480, 640),
            Rotation::Deg90,
            false,
        )
        .unwrap();
        let mirrored = build_transform(
            Size::new(640, 480),
            Size::new(480, 640),
            Rotation::Deg90,
            true,
        )
        .unwrap();
        for p in sample_points(Size::new(640, 480)) {
            let a = plain.map_point(p);
            let b = mirrored.map_point(p);
            assert_close(b, Point::new(480.0 - a.x, a.y));
        }
        // Sensor top-left: top-right on screen unmirrored, top-left mirrored.
        assert_close(mirrored.map_point(Point::new(0.0, 0.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn planner_mirror_keeps_rows_in_place() {
        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(320, 320));
        let plain = planner
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg0)
            .unwrap();
        let mirrored = planner
            .with_mirror(true)
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg0)
            .unwrap();
        for degrees in [90, 180, 270] {
            let device = Rotation::from_degrees(degrees).unwrap();
            let a = planner
                .plan(Size::new(640, 480), Size::new(480, 640), device)
                .unwrap();
            let b = planner
                .with_mirror(true)
                .plan(Size::new(640, 480), Size::new(480, 640), device)
                .unwrap();
            let w = a.oriented_size.width as f64;
            let p = Point::new(100.0, 50.0);
            let (pa, pb) = (a.orient.map_point(p), b.orient.map_point(p));
            assert_close(pb, Point::new(w - pa.x, pa.y));
        }
        let p = Point::new(0.0, 0.0);
        assert_close(plain.orient.map_point(p), Point::new(480.0, 0.0));
        assert_close(mirrored.orient.map_point(p), Point::new(0.0, 0.0));
    }

    #[test]
    fn unrotated_transform_is_pure_stretch() {
        let t = build_transform(Size::new(480, 640), Size::new(320, 320), Rotation::Deg0, false)
            .unwrap();
        let m = t.matrix();
        assert!((m.a - 320.0 / 480.0).abs() < 1e-12);
        assert!((m.d - 0.5).abs() < 1e-12);
        assert!(m.b.abs() < 1e-12 && m.c.abs() < 1e-12);
        assert!(m.e.abs() < 1e-9 && m.f.abs() < 1e-9);
    }

    #[test]
    fn zero_sizes_are_degenerate() {
        for (src, dst) in [
            (Size::new(0, 480), Size::new(320, 320)),
            (Size::new(640, 480), Size::new(320, 0)),
        ] {
            let err = build_transform(src, dst, Rotation::Deg0, false).unwrap_err();
            assert!(matches!(err, PipelineError::DegenerateTransform(_)));
        }
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let err = AffineTransform::from_matrix(Matrix::scaling(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn detection_round_trip_through_model_inverse() {
        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(320, 320));
        let plan = planner
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg0)
            .unwrap();
        let model_rects = [
            Rect::new(0.0, 0.0, 160.0, 160.0),
            Rect::new(10.5, 200.25, 319.0, 320.0),
            Rect::new(100.0, 100.0, 100.0, 100.0),
        ];
        for rect in model_rects {
            let preview = plan.model_to_preview(&rect);
            assert!(preview.within(Size::new(480, 640)), "{:?}", preview);
            assert_rect_close(&plan.preview_to_model(&preview), &rect);
        }
    }

    #[test]
    fn applied_rotation_is_sensor_minus_device() {
        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(320, 320));
        assert_eq!(planner.applied_rotation(Rotation::Deg0), Rotation::Deg90);
        assert_eq!(planner.applied_rotation(Rotation::Deg90), Rotation::Deg0);
        assert_eq!(planner.applied_rotation(Rotation::Deg180), Rotation::Deg270);
        assert_eq!(planner.applied_rotation(Rotation::Deg270), Rotation::Deg180);
    }

    #[test]
    fn oriented_image_fills_viewport() {
        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(320, 320));

        // Portrait: the rotated 480x640 frame matches the viewport exactly.
        let plan = planner
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg0)
            .unwrap();
        assert_eq!(plan.applied_rotation, Rotation::Deg90);
        assert_eq!(plan.oriented_size, Size::new(480, 640));

        // Landscape device: no rotation, scale up until both axes cover the viewport.
        let plan = planner
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg90)
            .unwrap();
        assert_eq!(plan.applied_rotation, Rotation::Deg0);
        assert_eq!(plan.oriented_size, Size::new(853, 640));
        assert_eq!(plan.crop, Size::new(480, 640));

        // Non-integral scale still covers the viewport after rounding.
        let plan = planner
            .plan(Size::new(1280, 720), Size::new(1080, 1920), Rotation::Deg0)
            .unwrap();
        assert!(plan.oriented_size.contains(Size::new(1080, 1920)));
    }

    #[test]
    fn zero_viewport_is_degenerate() {
        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(320, 320));
        let err = planner
            .plan(Size::new(640, 480), Size::new(0, 640), Rotation::Deg0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));

        let planner = TransformPlanner::new(Rotation::Deg90, Size::new(0, 320));
        let err = planner
            .plan(Size::new(640, 480), Size::new(480, 640), Rotation::Deg0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn rotation_parsing() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn size_parsing() {
        assert_eq!("480x640".parse::<Size>().unwrap(), Size::new(480, 640));
        assert_eq!(" 32 X 16 ".parse::<Size>().unwrap(), Size::new(32, 16));
        assert!("480".parse::<Size>().is_err());
        assert!("axb".parse::<Size>().is_err());
    }

    #[test]
    fn clamping_keeps_rects_inside() {
        let r = Rect::new(-4.0, 10.0, 500.0, 20.0).clamped(Size::new(480, 640));
        assert_eq!(r, Rect::new(0.0, 10.0, 480.0, 20.0));
        assert!(r.within(Size::new(480, 640)));

        let outside = Rect::new(600.0, -50.0, 700.0, -10.0).clamped(Size::new(480, 640));
        assert_eq!(outside.width(), 0.0);
        assert_eq!(outside.height(), 0.0);
    }

    #[test]
    fn clamping_non_finite_rect_is_empty() {
        let size = Size::new(480, 640);
        for r in [
            Rect::new(f32::NAN, 0.0, 10.0, 10.0),
            Rect::new(0.0, f32::NAN, 10.0, 10.0),
            Rect::new(0.0, 0.0, f32::INFINITY, 10.0),
            Rect::new(f32::NEG_INFINITY, 0.0, 10.0, f32::NAN),
        ] {
            let c = r.clamped(size);
            assert_eq!(c, Rect::new(0.0, 0.0, 0.0, 0.0));
            assert!(c.within(size));
        }
    }
}
