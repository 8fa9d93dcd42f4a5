//! Placement and transform math.
//!
//! All placement here is pure geometry over surface-percentage fields, shared
//! verbatim by the compositor and the hit-testing engine so drawn bounds and
//! clickable bounds can never diverge. Transforms are explicit [`Mat2D`]
//! values composed deterministically and threaded through draw calls; there
//! is no mutable graphics-context stack.

use crate::color::Color;
use crate::scene::{Popout, Shadow, Subject};

/// Axis-aligned rectangle in surface pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on a point.
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Grows the rectangle outward by `amount` on every side.
    pub fn inflated(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Translates by an offset.
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

// ============================================================================
// Mat2D
// ============================================================================

/// A 2D affine transform: `[a c e; b d f]` mapping `(x, y)` to
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Mat2D {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn rotation_degrees(degrees: f32) -> Self {
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Horizontal shear: `x' = x + k·y`.
    pub fn shear_x(k: f32) -> Self {
        Self {
            c: k,
            ..Self::IDENTITY
        }
    }

    /// Composition applying `other` first, then `self`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Inverse transform; `None` for a degenerate (zero-determinant) matrix.
    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-9 {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        Some(Self {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

// ============================================================================
// Subject placement
// ============================================================================

/// Computes the subject's drawn rectangle on a surface.
///
/// The image is scaled to `scale%` of surface width, capped by the
/// height-derived scale when that axis binds (aspect ratio preserved either
/// way). `x`/`y` then distribute the scaled image over the leftover space:
/// `position = (surface − drawn) × anchor/100`.
pub fn subject_rect(
    surface_w: f32,
    surface_h: f32,
    natural_w: f32,
    natural_h: f32,
    subject: &Subject,
) -> Rect {
    let fraction = subject.scale / 100.0;
    let mut drawn_w = surface_w * fraction;
    let mut drawn_h = drawn_w * natural_h / natural_w;
    let max_h = surface_h * fraction;
    if drawn_h > max_h {
        drawn_h = max_h;
        drawn_w = drawn_h * natural_w / natural_h;
    }
    Rect::new(
        (surface_w - drawn_w) * subject.x / 100.0,
        (surface_h - drawn_h) * subject.y / 100.0,
        drawn_w,
        drawn_h,
    )
}

/// Rotation and perspective shear about a rectangle's center.
///
/// The shear factor is `perspective × 0.01` — a 2D approximation of a
/// perspective tilt, kept exactly as-is because position presets and snapping
/// are calibrated against this math.
pub fn placement_transform(rect: &Rect, rotation_degrees: f32, perspective: f32) -> Mat2D {
    if rotation_degrees == 0.0 && perspective == 0.0 {
        return Mat2D::IDENTITY;
    }
    let (cx, cy) = rect.center();
    Mat2D::translation(cx, cy)
        .then(&Mat2D::rotation_degrees(rotation_degrees))
        .then(&Mat2D::shear_x(perspective * 0.01))
        .then(&Mat2D::translation(-cx, -cy))
}

/// Corner radius scaled linearly with drawn width against a 400-unit
/// reference, so rounding looks the same at every surface size.
pub fn scaled_corner_radius(radius: f32, drawn_width: f32) -> f32 {
    (radius * drawn_width / 400.0).max(0.0)
}

/// The paint color of a drop shadow: its color composited with its own
/// opacity.
pub fn shadow_color(shadow: &Shadow) -> Color {
    shadow.color.with_opacity(shadow.opacity)
}

// ============================================================================
// Popout placement
// ============================================================================

/// Source crop rectangle of a popout in subject-image pixels.
pub fn popout_source_rect(natural_w: f32, natural_h: f32, popout: &Popout) -> Rect {
    Rect::new(
        popout.crop.x / 100.0 * natural_w,
        popout.crop.y / 100.0 * natural_h,
        popout.crop.width / 100.0 * natural_w,
        popout.crop.height / 100.0 * natural_h,
    )
}

/// Display rectangle of a popout on the surface. Width is `width%` of the
/// surface; height follows the crop's own aspect ratio so the excerpt is
/// never squashed.
pub fn popout_display_rect(
    surface_w: f32,
    surface_h: f32,
    natural_w: f32,
    natural_h: f32,
    popout: &Popout,
) -> Rect {
    let display_w = popout.width / 100.0 * surface_w;
    let crop_w = popout.crop.width / 100.0 * natural_w;
    let crop_h = popout.crop.height / 100.0 * natural_h;
    let aspect = if crop_w > 0.0 { crop_h / crop_w } else { 1.0 };
    Rect::centered(
        popout.x / 100.0 * surface_w,
        popout.y / 100.0 * surface_h,
        display_w,
        display_w * aspect,
    )
}

// ============================================================================
// Tests
// ============================================================================
