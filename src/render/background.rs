//! Background painting: gradient, solid and image fills plus the
//! background-only noise post-pass.

use tracing::warn;

use crate::assets::AssetProvider;
use crate::color::Color;
use crate::render::blur::blur_rgba;
use crate::render::px_scale;
use crate::scene::{Background, BackgroundKind, GradientStop, ImageFit, NoiseSettings};
use crate::surface::Surface;
use crate::transform::{Mat2D, Rect};

pub(crate) fn paint(background: &Background, surface: &mut dyn Surface, assets: &dyn AssetProvider) {
    let w = surface.width() as f32;
    let h = surface.height() as f32;

    match &background.kind {
        BackgroundKind::Gradient { angle, stops } => paint_gradient(surface, *angle, stops),
        BackgroundKind::Solid { color } => fill_surface(surface, *color),
        BackgroundKind::Image {
            asset,
            fit,
            blur,
            overlay_color,
            overlay_opacity,
        } => {
            let Some(image) = assets.resolve(asset) else {
                warn!(asset = %asset.0, "background image unresolved, painting fallback");
                fill_surface(surface, Color::NEUTRAL);
                return;
            };
            if *fit == ImageFit::Contain {
                // Margins around a contained image stay a neutral base.
                fill_surface(surface, Color::NEUTRAL);
            }
            let dest = fit_rect(w, h, image.width() as f32, image.height() as f32, *fit);
            let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
            if *blur > 0.0 {
                // Blur in source pixels so the softness matches the radius
                // the surface would show at its own scale.
                let surface_radius = blur * px_scale(w);
                let source_radius = surface_radius * src.width / dest.width.max(1.0);
                let blurred = blur_rgba(image, source_radius);
                surface.blit_image(&blurred, src, dest, 0.0, 100.0, &Mat2D::IDENTITY);
            } else {
                surface.blit_image(image, src, dest, 0.0, 100.0, &Mat2D::IDENTITY);
            }
            if *overlay_opacity > 0.0 {
                fill_surface(surface, overlay_color.with_opacity(*overlay_opacity));
            }
        }
    }

    paint_noise(surface, &background.noise);
}

fn fill_surface(surface: &mut dyn Surface, color: Color) {
    let rect = Rect::new(0.0, 0.0, surface.width() as f32, surface.height() as f32);
    surface.fill_rounded_rect(rect, 0.0, color, &Mat2D::IDENTITY);
}

fn paint_gradient(surface: &mut dyn Surface, angle: f32, stops: &[GradientStop]) {
    if stops.len() < 2 {
        // Degenerate stop list renders as a solid fill.
        let color = stops.first().map(|s| s.color).unwrap_or(Color::NEUTRAL);
        fill_surface(surface, color);
        return;
    }
    let w = surface.width() as f32;
    let h = surface.height() as f32;
    let (cx, cy) = (w / 2.0, h / 2.0);
    // A segment of length 2×max(w,h) rotated through the surface center;
    // angle 0 points to the top edge, growing clockwise.
    let rad = angle.to_radians();
    let (dx, dy) = (rad.sin(), -rad.cos());
    let half = w.max(h);
    surface.fill_linear_gradient(
        (cx - dx * half, cy - dy * half),
        (cx + dx * half, cy + dy * half),
        stops,
    );
}

/// Cover/contain placement of an image's natural size onto the surface.
pub(crate) fn fit_rect(
    surface_w: f32,
    surface_h: f32,
    natural_w: f32,
    natural_h: f32,
    fit: ImageFit,
) -> Rect {
    let sx = surface_w / natural_w;
    let sy = surface_h / natural_h;
    let scale = match fit {
        ImageFit::Cover => sx.max(sy),
        ImageFit::Contain => sx.min(sy),
    };
    Rect::centered(
        surface_w / 2.0,
        surface_h / 2.0,
        natural_w * scale,
        natural_h * scale,
    )
}

// ============================================================================
// Noise
// ============================================================================

// FNV-1a, the deterministic stand-in for an RNG: the same scene must render
// the same pixels on every pass.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

fn hash_position(x: u32, y: u32) -> u64 {
    let mut h = FNV_OFFSET;
    for b in x.to_le_bytes().into_iter().chain(y.to_le_bytes()) {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Applies monochrome grain over the already-painted background. This runs
/// before any other layer is drawn, so only background pixels are perturbed.
fn paint_noise(surface: &mut dyn Surface, noise: &NoiseSettings) {
    if !noise.enabled || noise.intensity <= 0.0 {
        return;
    }
    let amplitude = noise.intensity.clamp(0.0, 100.0) * 0.5;
    surface.map_pixels(&mut |x, y, mut px| {
        let unit = (hash_position(x, y) >> 40) as f32 / (1u64 << 24) as f32;
        let delta = (unit - 0.5) * amplitude;
        for channel in &mut px[0..3] {
            *channel = (*channel as f32 + delta).clamp(0.0, 255.0) as u8;
        }
        px
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FontStore, MemoryAssets};
    use crate::scene::AssetRef;
    use crate::surface::RasterSurface;
    use image::RgbaImage;

    fn paint_to_image(background: &Background, w: u32, h: u32, assets: &MemoryAssets) -> RgbaImage {
        let fonts = FontStore::new();
        let mut surface = RasterSurface::new(w, h, &fonts);
        paint(background, &mut surface, assets);
        surface.into_image()
    }

    #[test]
    fn gradient_at_135_runs_diagonally() {
        let background = Background::default();
        let img = paint_to_image(&background, 64, 64, &MemoryAssets::new());
        let first = Color::rgb(0x66, 0x7e, 0xea);
        let top_left = img.get_pixel(1, 1);
        // Top-left sits near the gradient start at 135°.
        assert!((top_left.0[0] as i32 - first.r as i32).abs() < 40);
        assert_ne!(img.get_pixel(62, 62).0, top_left.0);
    }

    #[test]
    fn single_stop_gradient_is_solid() {
        let background = Background {
            kind: BackgroundKind::Gradient {
                angle: 45.0,
                stops: vec![GradientStop {
                    color: Color::rgb(10, 20, 30),
                    position: 0.0,
                }],
            },
            noise: NoiseSettings::default(),
        };
        let img = paint_to_image(&background, 16, 16, &MemoryAssets::new());
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(15, 15).0, [10, 20, 30, 255]);
    }

    #[test]
    fn empty_stop_list_is_neutral() {
        let background = Background {
            kind: BackgroundKind::Gradient {
                angle: 0.0,
                stops: Vec::new(),
            },
            noise: NoiseSettings::default(),
        };
        let img = paint_to_image(&background, 8, 8, &MemoryAssets::new());
        assert_eq!(img.get_pixel(4, 4).0, [128, 128, 128, 255]);
    }

    #[test]
    fn missing_image_falls_back_without_panicking() {
        let background = Background {
            kind: BackgroundKind::Image {
                asset: AssetRef::new("gone"),
                fit: ImageFit::Cover,
                blur: 0.0,
                overlay_color: Color::BLACK,
                overlay_opacity: 0.0,
            },
            noise: NoiseSettings::default(),
        };
        let img = paint_to_image(&background, 8, 8, &MemoryAssets::new());
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn cover_fills_contain_fits() {
        // 100×50 image on a 60×60 surface.
        let cover = fit_rect(60.0, 60.0, 100.0, 50.0, ImageFit::Cover);
        assert_eq!(cover.height, 60.0);
        assert!(cover.width > 60.0);

        let contain = fit_rect(60.0, 60.0, 100.0, 50.0, ImageFit::Contain);
        assert_eq!(contain.width, 60.0);
        assert!(contain.height < 60.0);
    }

    #[test]
    fn tint_overlays_image() {
        let mut assets = MemoryAssets::new();
        let asset = assets.insert_image("bg", RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255])));
        let background = Background {
            kind: BackgroundKind::Image {
                asset,
                fit: ImageFit::Cover,
                blur: 0.0,
                overlay_color: Color::BLACK,
                overlay_opacity: 100.0,
            },
            noise: NoiseSettings::default(),
        };
        let img = paint_to_image(&background, 8, 8, &assets);
        assert_eq!(img.get_pixel(4, 4).0, [0, 0, 0, 255]);
    }

    #[test]
    fn noise_is_deterministic_and_background_only() {
        let background = Background {
            kind: BackgroundKind::Solid {
                color: Color::rgb(100, 100, 100),
            },
            noise: NoiseSettings {
                enabled: true,
                intensity: 60.0,
            },
        };
        let a = paint_to_image(&background, 32, 32, &MemoryAssets::new());
        let b = paint_to_image(&background, 32, 32, &MemoryAssets::new());
        assert_eq!(a, b, "noise must be reproducible");

        let any_perturbed = a.pixels().any(|p| p.0[0] != 100);
        assert!(any_perturbed, "noise should visibly perturb pixels");
        for p in a.pixels() {
            assert_eq!(p.0[3], 255, "alpha untouched by noise");
            assert_eq!(p.0[0], p.0[1], "grain is monochrome");
        }
    }
}
