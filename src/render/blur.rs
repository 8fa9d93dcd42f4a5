//! Separable box blur over RGBA buffers, used by blurred background images
//! and soft drop shadows.

use image::RgbaImage;

use crate::color::Color;
use crate::transform::Rect;

/// Blurs all four channels with a separable box kernel of the given radius.
/// Radius 0 (or a degenerate image) returns the input unchanged.
pub fn blur_rgba(image: &RgbaImage, radius: f32) -> RgbaImage {
    let radius = radius.round() as i64;
    if radius <= 0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let tmp = blur_axis(image, radius, true);
    blur_axis(&tmp, radius, false)
}

fn blur_axis(image: &RgbaImage, radius: i64, horizontal: bool) -> RgbaImage {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let mut out = RgbaImage::new(w as u32, h as u32);
    let (lanes, lane_len) = if horizontal { (h, w) } else { (w, h) };
    let window = (2 * radius + 1) as f32;

    for lane in 0..lanes {
        let pixel_at = |i: i64| {
            let i = i.clamp(0, lane_len - 1);
            if horizontal {
                image.get_pixel(i as u32, lane as u32).0
            } else {
                image.get_pixel(lane as u32, i as u32).0
            }
        };

        // Sliding-window sums with clamped edges.
        let mut sums = [0.0f32; 4];
        for i in -radius..=radius {
            let px = pixel_at(i);
            for (sum, channel) in sums.iter_mut().zip(px) {
                *sum += channel as f32;
            }
        }
        for i in 0..lane_len {
            let value = [
                (sums[0] / window).round() as u8,
                (sums[1] / window).round() as u8,
                (sums[2] / window).round() as u8,
                (sums[3] / window).round() as u8,
            ];
            if horizontal {
                out.get_pixel_mut(i as u32, lane as u32).0 = value;
            } else {
                out.get_pixel_mut(lane as u32, i as u32).0 = value;
            }
            let leaving = pixel_at(i - radius);
            let entering = pixel_at(i + radius + 1);
            for c in 0..4 {
                sums[c] += entering[c] as f32 - leaving[c] as f32;
            }
        }
    }
    out
}

/// Rasterizes a filled rounded rectangle into a standalone buffer of the
/// given size. Used to build shadow silhouettes before blurring.
pub(crate) fn rounded_rect_image(
    width: u32,
    height: u32,
    rect: Rect,
    radius: f32,
    color: Color,
) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    let r = radius
        .max(0.0)
        .min(rect.width / 2.0)
        .min(rect.height / 2.0);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        if !rect.contains(px, py) {
            continue;
        }
        let inside = if r <= 0.0 {
            true
        } else {
            let cx = px.clamp(rect.x + r, rect.right() - r);
            let cy = py.clamp(rect.y + r, rect.bottom() - r);
            let (dx, dy) = (px - cx, py - cy);
            dx * dx + dy * dy <= r * r
        };
        if inside {
            pixel.0 = [color.r, color.g, color.b, color.a];
        }
    }
    out
}
