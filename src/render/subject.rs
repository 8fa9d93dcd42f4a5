//! The subject layer: placement, rotation/perspective, drop shadow, corner
//! rounding and border frame.

use image::RgbaImage;
use tracing::debug;

use crate::assets::AssetProvider;
use crate::render::blur::{blur_rgba, rounded_rect_image};
use crate::render::px_scale;
use crate::scene::{Scene, Shadow};
use crate::surface::Surface;
use crate::transform::{
    Mat2D, Rect, placement_transform, scaled_corner_radius, shadow_color, subject_rect,
};

pub(crate) fn paint(
    scene: &Scene,
    surface: &mut dyn Surface,
    assets: &dyn AssetProvider,
    prerendered: Option<&RgbaImage>,
) {
    let w = surface.width() as f32;
    let h = surface.height() as f32;

    // The 3D mockup path: a finished buffer replaces the 2D placement
    // transform for this layer only.
    if scene.subject.prerendered {
        if let Some(buffer) = prerendered {
            let src = Rect::new(0.0, 0.0, buffer.width() as f32, buffer.height() as f32);
            let dest = Rect::new(0.0, 0.0, w, h);
            surface.blit_image(buffer, src, dest, 0.0, 100.0, &Mat2D::IDENTITY);
            return;
        }
        debug!("subject flagged prerendered but no buffer supplied, skipping layer");
        return;
    }

    let Some(asset) = &scene.subject.asset else {
        return;
    };
    let Some(image) = assets.resolve(asset) else {
        debug!(asset = %asset.0, "subject image unresolved, skipping layer");
        return;
    };

    let rect = subject_rect(w, h, image.width() as f32, image.height() as f32, &scene.subject);
    let transform = placement_transform(&rect, scene.subject.rotation, scene.subject.perspective);
    let radius = scaled_corner_radius(scene.subject.corner_radius, rect.width);
    let scale = px_scale(w);

    if scene.subject.shadow.enabled {
        paint_shadow(surface, &rect, radius, &scene.subject.shadow, scale, &transform);
    }

    let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
    surface.blit_image(image, src, rect, radius, 100.0, &transform);

    if scene.subject.frame.enabled {
        let frame = &scene.subject.frame;
        let stroke = frame.width * scale;
        surface.stroke_rounded_rect(
            rect.inflated(stroke / 2.0),
            radius + stroke / 2.0,
            stroke,
            frame.color.with_opacity(frame.opacity),
            &transform,
        );
    }
}

/// Draws a blurred, offset rounded-rect silhouette beneath a casting
/// rectangle. The silhouette is rasterized and blurred in a scratch buffer,
/// then blitted under the caster's transform so the image draw that follows
/// carries no shadow state of its own.
pub(crate) fn paint_shadow(
    surface: &mut dyn Surface,
    casting: &Rect,
    radius: f32,
    shadow: &Shadow,
    scale: f32,
    transform: &Mat2D,
) {
    let blur = (shadow.blur * scale).max(0.0);
    let pad = blur.ceil() + 1.0;
    let scratch_w = (casting.width + 2.0 * pad).ceil().max(1.0) as u32;
    let scratch_h = (casting.height + 2.0 * pad).ceil().max(1.0) as u32;
    let silhouette = rounded_rect_image(
        scratch_w,
        scratch_h,
        Rect::new(pad, pad, casting.width, casting.height),
        radius,
        shadow_color(shadow),
    );
    let blurred = blur_rgba(&silhouette, blur);
    let dest = Rect::new(
        casting.x - pad + shadow.offset_x * scale,
        casting.y - pad + shadow.offset_y * scale,
        scratch_w as f32,
        scratch_h as f32,
    );
    let src = Rect::new(0.0, 0.0, scratch_w as f32, scratch_h as f32);
    surface.blit_image(&blurred, src, dest, 0.0, 100.0, transform);
}

// ============================================================================
// Tests
// ============================================================================
