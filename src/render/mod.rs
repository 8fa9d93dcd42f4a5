//! The compositor: paints a [`Scene`] onto any [`Surface`] in the fixed
//! z-order `background → behind-subject elements → subject → above-subject
//! elements → popouts → text → above-text elements`.
//!
//! A render pass is deterministic and re-entrant: it borrows the Scene
//! read-only, so the same Scene may be painted to the main preview, the
//! thumbnail strips and the export surface in sequence (or from different
//! call sites) and produce geometrically equivalent output at every size.

pub(crate) mod background;
mod blur;
pub mod overlay;
mod popout;
mod subject;

use image::RgbaImage;
use tracing::debug;

use crate::assets::{AssetProvider, FontStore, TextMeasurer};
use crate::scene::{Scene, TextAnchor, TextStyle, ZLayer};
use crate::surface::{RasterSurface, Surface, TextBaseline};
use crate::text::{BlockLayout, layout_block, strikethrough_rect, underline_rect};
use crate::transform::Mat2D;

/// Pixel quantities with no percentage semantics of their own (shadow blur
/// and offsets, frame widths) scale against a 400-unit-wide reference
/// surface, like corner radii, so they stay proportional across surfaces.
pub(crate) fn px_scale(surface_w: f32) -> f32 {
    surface_w / 400.0
}

/// One render pass over a Scene.
///
/// Holds the external capabilities for the pass: the asset provider, the
/// text measurer, and optionally a pre-rendered subject buffer handed over
/// by the out-of-scope 3D mockup renderer.
pub struct Renderer<'a> {
    assets: &'a dyn AssetProvider,
    measurer: &'a dyn TextMeasurer,
    subject_buffer: Option<&'a RgbaImage>,
}

impl<'a> Renderer<'a> {
    pub fn new(assets: &'a dyn AssetProvider, measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            assets,
            measurer,
            subject_buffer: None,
        }
    }

    /// Supplies the finished pixel buffer used in place of 2D subject
    /// placement when the subject is flagged `prerendered`.
    pub fn with_subject_buffer(mut self, buffer: &'a RgbaImage) -> Self {
        self.subject_buffer = Some(buffer);
        self
    }

    /// Paints the whole Scene onto the surface. Never fails: a layer that
    /// cannot be painted this pass (missing asset, unknown glyph, empty
    /// text) degrades the image by omission and the pass completes.
    pub fn render(&self, scene: &Scene, surface: &mut dyn Surface) {
        debug!(
            width = surface.width(),
            height = surface.height(),
            elements = scene.elements.len(),
            popouts = scene.popouts.len(),
            "render pass"
        );
        background::paint(&scene.background, surface, self.assets);
        overlay::paint_layer(scene, ZLayer::BehindSubject, surface, self.assets, self.measurer);
        subject::paint(scene, surface, self.assets, self.subject_buffer);
        overlay::paint_layer(scene, ZLayer::AboveSubject, surface, self.assets, self.measurer);
        popout::paint_all(scene, surface, self.assets);
        self.paint_text(scene, surface);
        overlay::paint_layer(scene, ZLayer::AboveText, surface, self.assets, self.measurer);
    }

    fn paint_text(&self, scene: &Scene, surface: &mut dyn Surface) {
        let w = surface.width() as f32;
        let h = surface.height() as f32;
        let headline = layout_block(&scene.headline, w, h, self.measurer, None);
        if let Some(layout) = &headline {
            draw_block(surface, &scene.headline.style, layout);
        }
        // The subheadline hangs off the headline's carried offset when one
        // was laid out; otherwise it anchors on its own.
        let carried = headline.as_ref().map(|l| (l.carry_y, l.anchor));
        if let Some(layout) = layout_block(&scene.subheadline, w, h, self.measurer, carried) {
            draw_block(surface, &scene.subheadline.style, &layout);
        }
    }
}

fn draw_block(surface: &mut dyn Surface, style: &TextStyle, layout: &BlockLayout) {
    let color = style.color.with_opacity(style.opacity);
    let baseline = match layout.anchor {
        TextAnchor::Top => TextBaseline::Top,
        TextAnchor::Bottom => TextBaseline::Bottom,
    };
    for line in &layout.lines {
        surface.fill_text(
            &line.text,
            line.x,
            line.y,
            &layout.font,
            color,
            baseline,
            &Mat2D::IDENTITY,
        );
        if style.underline {
            let rect = underline_rect(line, layout.font_px, layout.anchor);
            surface.fill_rounded_rect(rect, 0.0, color, &Mat2D::IDENTITY);
        }
        if style.strikethrough {
            let rect = strikethrough_rect(line, layout.font_px, layout.anchor);
            surface.fill_rounded_rect(rect, 0.0, color, &Mat2D::IDENTITY);
        }
    }
}

/// The export call site: renders a Scene at full output resolution into a
/// fresh pixel buffer. Encoding and file placement stay with the caller.
pub fn render_to_image(
    scene: &Scene,
    width: u32,
    height: u32,
    assets: &dyn AssetProvider,
    fonts: &FontStore,
) -> RgbaImage {
    let mut surface = RasterSurface::new(width, height, fonts);
    Renderer::new(assets, fonts).render(scene, &mut surface);
    surface.into_image()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::color::Color;
    use crate::scene::{BackgroundKind, ElementKind};

    fn red_subject_scene(assets: &mut MemoryAssets) -> Scene {
        let img = RgbaImage::from_pixel(80, 80, image::Rgba([255, 0, 0, 255]));
        let asset = assets.insert_image("capture", img);
        let mut scene = Scene::with_subject(asset);
        scene.background.kind = BackgroundKind::Solid {
            color: Color::rgb(0, 0, 0),
        };
        scene.subject.shadow.enabled = false;
        scene.subject.corner_radius = 0.0;
        scene.headline.enabled = false;
        scene
    }

    #[test]
    fn render_is_deterministic_across_surfaces() {
        let mut assets = MemoryAssets::new();
        let scene = red_subject_scene(&mut assets);
        let fonts = FontStore::new();
        let a = render_to_image(&scene, 64, 64, &assets, &fonts);
        let b = render_to_image(&scene, 64, 64, &assets, &fonts);
        assert_eq!(a, b);
    }

    #[test]
    fn behind_subject_element_is_covered_by_subject() {
        let mut assets = MemoryAssets::new();
        let green = assets.insert_image("g", RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255])));
        let mut scene = red_subject_scene(&mut assets);
        scene.subject.scale = 80.0;
        scene.add_element(
            50.0,
            50.0,
            20.0,
            ZLayer::BehindSubject,
            ElementKind::Graphic { asset: green },
        );
        let fonts = FontStore::new();
        let img = render_to_image(&scene, 100, 100, &assets, &fonts);
        // Subject (80×80 centered) hides the behind-layer graphic.
        assert_eq!(img.get_pixel(50, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn above_subject_element_paints_over_subject() {
        let mut assets = MemoryAssets::new();
        let green = assets.insert_image("g", RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255])));
        let mut scene = red_subject_scene(&mut assets);
        scene.subject.scale = 80.0;
        scene.add_element(
            50.0,
            50.0,
            20.0,
            ZLayer::AboveSubject,
            ElementKind::Graphic { asset: green },
        );
        let fonts = FontStore::new();
        let img = render_to_image(&scene, 100, 100, &assets, &fonts);
        assert_eq!(img.get_pixel(50, 50).0, [0, 255, 0, 255]);
    }

    #[test]
    fn missing_subject_still_renders_background_and_elements() {
        let mut assets = MemoryAssets::new();
        let green = assets.insert_image("g", RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255])));
        let mut scene = Scene::with_subject(crate::scene::AssetRef::new("gone"));
        scene.background.kind = BackgroundKind::Solid {
            color: Color::rgb(7, 7, 7),
        };
        scene.headline.enabled = false;
        scene.add_element(
            20.0,
            20.0,
            20.0,
            ZLayer::AboveSubject,
            ElementKind::Graphic { asset: green },
        );
        let fonts = FontStore::new();
        let img = render_to_image(&scene, 100, 100, &assets, &fonts);
        assert_eq!(img.get_pixel(90, 90).0, [7, 7, 7, 255], "background painted");
        assert_eq!(img.get_pixel(20, 20).0, [0, 255, 0, 255], "element painted");
    }

    /// Bounding box of pixels matching a predicate.
    fn bbox(img: &RgbaImage, pred: impl Fn(&[u8; 4]) -> bool) -> Option<(u32, u32, u32, u32)> {
        let mut out: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in img.enumerate_pixels() {
            if pred(&p.0) {
                out = Some(match out {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        out
    }

    #[test]
    fn same_aspect_renders_place_subject_at_same_relative_center() {
        let mut assets = MemoryAssets::new();
        let mut scene = red_subject_scene(&mut assets);
        scene.subject.scale = 70.0;
        scene.subject.x = 50.0;
        scene.subject.y = 60.0;
        let fonts = FontStore::new();

        let small = render_to_image(&scene, 120, 260, &assets, &fonts);
        let large = render_to_image(&scene, 240, 520, &assets, &fonts);
        let red = |p: &[u8; 4]| p[0] > 200 && p[1] < 50;
        let (sx0, sy0, sx1, sy1) = bbox(&small, red).unwrap();
        let (lx0, ly0, lx1, ly1) = bbox(&large, red).unwrap();

        let small_cx = (sx0 + sx1) as f32 / 2.0 / 120.0;
        let small_cy = (sy0 + sy1) as f32 / 2.0 / 260.0;
        let large_cx = (lx0 + lx1) as f32 / 2.0 / 240.0;
        let large_cy = (ly0 + ly1) as f32 / 2.0 / 520.0;
        assert!((small_cx - large_cx).abs() < 0.02, "{small_cx} vs {large_cx}");
        assert!((small_cy - large_cy).abs() < 0.02, "{small_cy} vs {large_cy}");
    }

    #[test]
    fn noise_only_perturbs_background_not_subject() {
        let mut assets = MemoryAssets::new();
        let mut scene = red_subject_scene(&mut assets);
        scene.subject.scale = 50.0;
        scene.background.kind = BackgroundKind::Solid {
            color: Color::rgb(100, 100, 100),
        };
        scene.background.noise.enabled = true;
        scene.background.noise.intensity = 80.0;
        let fonts = FontStore::new();
        let img = render_to_image(&scene, 100, 100, &assets, &fonts);
        // Subject pixels stay pure red: noise ran before the subject layer.
        assert_eq!(img.get_pixel(50, 50).0, [255, 0, 0, 255]);
        // Background pixels vary.
        let corner_a = img.get_pixel(2, 2).0[0];
        let corner_b = img.get_pixel(90, 7).0[0];
        assert!(corner_a != 100 || corner_b != 100, "noise applied to background");
    }
}
