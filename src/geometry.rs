//! Geometry primitives
//!
//! Page space is PDF user space: origin at the bottom-left corner of the
//! page, y growing upwards, units in points (1/72 inch). Device space is the
//! pixel grid of a render target: origin at the top-left, y growing
//! downwards.

use serde::{Deserialize, Serialize};

/// Points per inch in PDF user space
pub const POINTS_PER_INCH: f64 = 72.0;

/// Convert a length in points to whole pixels at `dpi`, truncating toward zero
pub fn points_to_pixels(points: f64, dpi: i32) -> i32 {
    (points * dpi as f64 / POINTS_PER_INCH) as i32
}

/// Integer device point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Floating point in page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer size (pixels or truncated points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Page size in points as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

impl SizeF {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel size at `dpi`
    pub fn to_pixels(self, dpi: i32) -> Size {
        Size::new(
            points_to_pixels(self.width, dpi),
            points_to_pixels(self.height, dpi),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Rectangle in page space (`top > bottom` for non-empty rectangles)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RectF {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// True when the point lies inside or on the edge
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left.min(self.right)
            && x <= self.left.max(self.right)
            && y >= self.bottom.min(self.top)
            && y <= self.bottom.max(self.top)
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &RectF) -> RectF {
        RectF {
            left: self.left.min(other.left),
            top: self.top.max(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

/// Integer rectangle in device space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Clockwise page rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Quarter turns modulo 4 (negative values turn counter-clockwise)
    pub fn from_quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            3 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }
}

/// Display rectangle a page is mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub start_x: i32,
    pub start_y: i32,
    pub size_x: i32,
    pub size_y: i32,
    pub rotation: Rotation,
}

impl Viewport {
    pub fn new(start_x: i32, start_y: i32, size_x: i32, size_y: i32) -> Self {
        Self {
            start_x,
            start_y,
            size_x,
            size_y,
            rotation: Rotation::None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Part of the viewport that lands on a `width` x `height` canvas
    pub fn visible_in(&self, width: u32, height: u32) -> Option<IRect> {
        let clamp = |v: i64, max: u32| v.clamp(0, max as i64) as i32;
        let left = clamp(self.start_x as i64, width);
        let top = clamp(self.start_y as i64, height);
        let right = clamp(self.start_x as i64 + self.size_x as i64, width);
        let bottom = clamp(self.start_y as i64 + self.size_y as i64, height);
        (left < right && top < bottom).then(|| IRect::new(left, top, right, bottom))
    }
}

/// 2D affine transform: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
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

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Page space to device space for a page of `page` points shown in `viewport`
    ///
    /// The three anchor corners are where the page's bottom-left, top-left
    /// and bottom-right corners land for each rotation. A degenerate page
    /// maps through the identity.
    pub fn display(page: SizeF, viewport: &Viewport) -> Matrix {
        if page.is_empty() {
            return Matrix::IDENTITY;
        }

        let x = viewport.start_x as f64;
        let y = viewport.start_y as f64;
        let w = viewport.size_x as f64;
        let h = viewport.size_y as f64;

        // (bottom-left), (top-left), (bottom-right)
        let ((x0, y0), (x1, y1), (x2, y2)) = match viewport.rotation {
            Rotation::None => ((x, y + h), (x, y), (x + w, y + h)),
            Rotation::Cw90 => ((x, y), (x + w, y), (x, y + h)),
            Rotation::Cw180 => ((x + w, y), (x + w, y + h), (x, y)),
            Rotation::Cw270 => ((x + w, y + h), (x, y + h), (x + w, y)),
        };

        Matrix::new(
            (x2 - x0) / page.width,
            (y2 - y0) / page.width,
            (x1 - x0) / page.height,
            (y1 - y0) / page.height,
            x0,
            y0,
        )
    }

    /// Apply `self` first, then `next`
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
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

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Map a page-space point to the nearest device pixel
pub fn page_to_device(page: SizeF, viewport: &Viewport, point: PointF) -> Point {
    let (x, y) = Matrix::display(page, viewport).transform(point.x, point.y);
    Point::new(x.round() as i32, y.round() as i32)
}

/// Map a device pixel back to page space
pub fn device_to_page(page: SizeF, viewport: &Viewport, point: Point) -> PointF {
    let inverse = Matrix::display(page, viewport)
        .invert()
        .unwrap_or(Matrix::IDENTITY);
    let (x, y) = inverse.transform(point.x as f64, point.y as f64);
    PointF::new(x, y)
}
