//! The abstract drawing surface and the shipped raster implementation.
//!
//! The compositor only ever speaks the primitive set defined by [`Surface`]:
//! filled/stroked rounded rectangles, clipped image blits under an explicit
//! transform, linear gradient fills, text fills, and whole-buffer pixel
//! read/write (for the background noise pass). [`RasterSurface`] implements
//! the set over an [`RgbaImage`] and is what preview snapshots and the export
//! path render into; a frontend canvas could implement the same trait.

use ab_glyph::{Font, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::assets::{FontSpec, FontStore};
use crate::color::Color;
use crate::scene::GradientStop;
use crate::transform::{Mat2D, Rect};

// ============================================================================
// Surface trait
// ============================================================================

/// How the `y` coordinate of a text draw is interpreted, mirroring canvas
/// text-baseline semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    /// `y` is the top of the em box.
    Top,
    /// `y` is the bottom of the em box.
    Bottom,
    /// `y` is the alphabetic baseline itself.
    Alphabetic,
}

/// Draw primitives at a fixed pixel size. The engine is agnostic to the
/// concrete surface technology behind them.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Fills a rounded rectangle, mapped through `transform`.
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color, transform: &Mat2D);

    /// Strokes a rounded rectangle outline of the given width, mapped through
    /// `transform`.
    fn stroke_rounded_rect(
        &mut self,
        rect: Rect,
        radius: f32,
        stroke_width: f32,
        color: Color,
        transform: &Mat2D,
    );

    /// Blits `src` (a sub-rectangle of `image` in its pixel space) into
    /// `dest`, clipped to `corner_radius`, scaled by `opacity_pct` (0–100)
    /// and mapped through `transform`.
    fn blit_image(
        &mut self,
        image: &RgbaImage,
        src: Rect,
        dest: Rect,
        corner_radius: f32,
        opacity_pct: f32,
        transform: &Mat2D,
    );

    /// Fills the whole surface with a gradient along the `from → to` segment,
    /// sampling `stops` in list order.
    fn fill_linear_gradient(&mut self, from: (f32, f32), to: (f32, f32), stops: &[GradientStop]);

    /// Draws a single line of text mapped through `transform`. `y` is
    /// interpreted per `baseline`, so callers can position by em-box top or
    /// bottom without knowing the surface's font metrics.
    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: Color,
        baseline: TextBaseline,
        transform: &Mat2D,
    );

    /// Rewrites every pixel through `f(x, y, rgba) -> rgba`.
    fn map_pixels(&mut self, f: &mut dyn FnMut(u32, u32, [u8; 4]) -> [u8; 4]);
}

/// Samples a gradient stop list at `pos` (0–100), interpolating consecutive
/// stops in list order. Degenerate lists fall back to a solid color: the
/// first stop's, or neutral gray when the list is empty.
pub fn sample_stops(stops: &[GradientStop], pos: f32) -> Color {
    let Some(first) = stops.first() else {
        return Color::NEUTRAL;
    };
    if stops.len() < 2 {
        return first.color;
    }
    if pos <= first.position {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let lo = a.position.min(b.position);
        let hi = a.position.max(b.position);
        if pos >= lo && pos <= hi {
            let span = b.position - a.position;
            let t = if span.abs() < 1e-6 {
                0.0
            } else {
                (pos - a.position) / span
            };
            return Color::lerp(a.color, b.color, t.clamp(0.0, 1.0));
        }
    }
    stops.last().map(|s| s.color).unwrap_or(Color::NEUTRAL)
}

// ============================================================================
// RasterSurface
// ============================================================================

/// CPU raster surface over an RGBA buffer.
pub struct RasterSurface<'f> {
    pixels: RgbaImage,
    fonts: &'f FontStore,
}

impl<'f> RasterSurface<'f> {
    /// Creates a transparent surface of the given pixel size.
    pub fn new(width: u32, height: u32, fonts: &'f FontStore) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            fonts,
        }
    }

    /// Consumes the surface and returns its pixels.
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.pixels.width() as i64 || y >= self.pixels.height() as i64 {
            return;
        }
        let src_a = color.a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x as u32, y as u32);
        let da = dst[3] as f32 / 255.0;
        let out_a = src_a + da * (1.0 - src_a);
        if out_a <= 0.0 {
            dst.0 = [0, 0, 0, 0];
            return;
        }
        let mix = |s: u8, d: u8| -> u8 {
            let s = s as f32 / 255.0;
            let d = d as f32 / 255.0;
            (((s * src_a + d * da * (1.0 - src_a)) / out_a) * 255.0).round() as u8
        };
        dst.0 = [
            mix(color.r, dst[0]),
            mix(color.g, dst[1]),
            mix(color.b, dst[2]),
            (out_a * 255.0).round() as u8,
        ];
    }

    /// Pixel span to visit for a rect mapped through a transform: the
    /// axis-aligned bounds of its transformed corners.
    fn coverage_bounds(&self, rect: &Rect, transform: &Mat2D) -> (i64, i64, i64, i64) {
        let corners = [
            transform.apply(rect.x, rect.y),
            transform.apply(rect.right(), rect.y),
            transform.apply(rect.right(), rect.bottom()),
            transform.apply(rect.x, rect.bottom()),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);
        (
            (min_x.floor() as i64).max(0),
            (min_y.floor() as i64).max(0),
            (max_x.ceil() as i64).min(self.pixels.width() as i64),
            (max_y.ceil() as i64).min(self.pixels.height() as i64),
        )
    }
}

/// True when the local-space point lies inside the rounded rectangle.
fn rounded_rect_contains(rect: &Rect, radius: f32, x: f32, y: f32) -> bool {
    if !rect.contains(x, y) {
        return false;
    }
    let r = radius
        .max(0.0)
        .min(rect.width / 2.0)
        .min(rect.height / 2.0);
    if r <= 0.0 {
        return true;
    }
    // Corner circle centers.
    let cx = if x < rect.x + r {
        rect.x + r
    } else if x > rect.right() - r {
        rect.right() - r
    } else {
        return true;
    };
    let cy = if y < rect.y + r {
        rect.y + r
    } else if y > rect.bottom() - r {
        rect.bottom() - r
    } else {
        return true;
    };
    let dx = x - cx;
    let dy = y - cy;
    dx * dx + dy * dy <= r * r
}

/// Bilinear sample of a sub-pixel source position, clamped to the image.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let p00 = image.get_pixel(x0 as u32, y0 as u32);
    let p10 = image.get_pixel(x1 as u32, y0 as u32);
    let p01 = image.get_pixel(x0 as u32, y1 as u32);
    let p11 = image.get_pixel(x1 as u32, y1 as u32);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = p00[i] as f32 * (1.0 - tx) + p10[i] as f32 * tx;
        let bottom = p01[i] as f32 * (1.0 - tx) + p11[i] as f32 * tx;
        out[i] = (top * (1.0 - ty) + bottom * ty).round() as u8;
    }
    Rgba(out)
}

impl Surface for RasterSurface<'_> {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color, transform: &Mat2D) {
        let Some(inverse) = transform.invert() else {
            return;
        };
        let (x0, y0, x1, y1) = self.coverage_bounds(&rect, transform);
        for py in y0..y1 {
            for px in x0..x1 {
                let (lx, ly) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                if rounded_rect_contains(&rect, radius, lx, ly) {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    fn stroke_rounded_rect(
        &mut self,
        rect: Rect,
        radius: f32,
        stroke_width: f32,
        color: Color,
        transform: &Mat2D,
    ) {
        if stroke_width <= 0.0 {
            return;
        }
        let half = stroke_width / 2.0;
        let outer = rect.inflated(half);
        let inner = rect.inflated(-half);
        let Some(inverse) = transform.invert() else {
            return;
        };
        let (x0, y0, x1, y1) = self.coverage_bounds(&outer, transform);
        for py in y0..y1 {
            for px in x0..x1 {
                let (lx, ly) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                let in_outer = rounded_rect_contains(&outer, radius + half, lx, ly);
                let in_inner = inner.width > 0.0
                    && inner.height > 0.0
                    && rounded_rect_contains(&inner, (radius - half).max(0.0), lx, ly);
                if in_outer && !in_inner {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    fn blit_image(
        &mut self,
        image: &RgbaImage,
        src: Rect,
        dest: Rect,
        corner_radius: f32,
        opacity_pct: f32,
        transform: &Mat2D,
    ) {
        if dest.width <= 0.0 || dest.height <= 0.0 || src.width <= 0.0 || src.height <= 0.0 {
            return;
        }
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let opacity = (opacity_pct / 100.0).clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        let Some(inverse) = transform.invert() else {
            return;
        };
        let (x0, y0, x1, y1) = self.coverage_bounds(&dest, transform);
        for py in y0..y1 {
            for px in x0..x1 {
                let (lx, ly) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                if !rounded_rect_contains(&dest, corner_radius, lx, ly) {
                    continue;
                }
                let sx = src.x + (lx - dest.x) / dest.width * src.width;
                let sy = src.y + (ly - dest.y) / dest.height * src.height;
                let pixel = sample_bilinear(image, sx, sy);
                let color = Color::rgba(pixel[0], pixel[1], pixel[2], pixel[3]);
                self.blend(px, py, color, opacity);
            }
        }
    }

    fn fill_linear_gradient(&mut self, from: (f32, f32), to: (f32, f32), stops: &[GradientStop]) {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let len_sq = dx * dx + dy * dy;
        for py in 0..self.pixels.height() {
            for px in 0..self.pixels.width() {
                let t = if len_sq <= 0.0 {
                    0.0
                } else {
                    (((px as f32 + 0.5 - from.0) * dx + (py as f32 + 0.5 - from.1) * dy) / len_sq)
                        .clamp(0.0, 1.0)
                };
                let color = sample_stops(stops, t * 100.0);
                self.blend(px as i64, py as i64, color, 1.0);
            }
        }
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font_spec: &FontSpec,
        color: Color,
        baseline: TextBaseline,
        transform: &Mat2D,
    ) {
        // Unknown families already fell back in resolve(); with no faces at
        // all the text is simply not painted (layout still happened).
        let Some(font) = self.fonts.resolve(font_spec) else {
            return;
        };
        let font = font.clone();
        let scaled = font.as_scaled(PxScale::from(font_spec.size_px));
        let baseline_y = match baseline {
            TextBaseline::Top => y + scaled.ascent(),
            TextBaseline::Bottom => y + scaled.descent(),
            TextBaseline::Alphabetic => y,
        };

        if !transform.is_identity() {
            // Rasterize the line axis-aligned in a scratch buffer, then blit
            // it through the transform like any other image.
            use crate::assets::TextMeasurer as _;
            let pad = 2.0;
            let width = self.fonts.measure(font_spec, text) + 2.0 * pad;
            let ascent = scaled.ascent();
            let height = ascent - scaled.descent() + 2.0 * pad;
            if width < 1.0 || height < 1.0 {
                return;
            }
            let mut scratch = RasterSurface::new(width.ceil() as u32, height.ceil() as u32, self.fonts);
            scratch.fill_text(
                text,
                pad,
                pad + ascent,
                font_spec,
                color,
                TextBaseline::Alphabetic,
                &Mat2D::IDENTITY,
            );
            let image = scratch.into_image();
            let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
            let dest = Rect::new(
                x - pad,
                baseline_y - ascent - pad,
                image.width() as f32,
                image.height() as f32,
            );
            self.blit_image(&image, src, dest, 0.0, 100.0, transform);
            return;
        }

        let baseline = baseline_y;
        let mut cursor_x = x;
        let mut previous = None;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            let advance = scaled.h_advance(glyph_id);
            let mut glyph = scaled.scaled_glyph(ch);
            glyph.position = point(cursor_x, baseline);
            if let Some(outline) = font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                outline.draw(|gx, gy, coverage| {
                    self.blend(
                        (bounds.min.x + gx as f32) as i64,
                        (bounds.min.y + gy as f32) as i64,
                        color,
                        coverage,
                    );
                });
            }
            cursor_x += advance;
            previous = Some(glyph_id);
        }
    }

    fn map_pixels(&mut self, f: &mut dyn FnMut(u32, u32, [u8; 4]) -> [u8; 4]) {
        for (x, y, pixel) in self.pixels.enumerate_pixels_mut() {
            pixel.0 = f(x, y, pixel.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
