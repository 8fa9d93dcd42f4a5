//! Popout layer: bordered, shadowed excerpts of the subject image placed
//! independently of the subject itself.

use tracing::debug;

use crate::assets::AssetProvider;
use crate::render::px_scale;
use crate::render::subject::paint_shadow;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::transform::{
    placement_transform, popout_display_rect, popout_source_rect, scaled_corner_radius,
};

/// Paints all popouts in array order. A popout applies only its own rotation
/// and never inherits the subject's rotation or perspective. Without a
/// resolved subject image there is nothing to crop, so the layer is skipped.
pub(crate) fn paint_all(scene: &Scene, surface: &mut dyn Surface, assets: &dyn AssetProvider) {
    if scene.popouts.is_empty() {
        return;
    }
    let Some(asset) = &scene.subject.asset else {
        return;
    };
    let Some(image) = assets.resolve(asset) else {
        debug!(asset = %asset.0, "subject image unresolved, skipping popouts");
        return;
    };

    let w = surface.width() as f32;
    let h = surface.height() as f32;
    let natural_w = image.width() as f32;
    let natural_h = image.height() as f32;
    let scale = px_scale(w);

    for stored in &scene.popouts {
        // A crop that degenerated below the minimum renders clamped, never
        // rejected.
        let popout = crate::scene::Popout {
            crop: stored.crop.clamped(),
            ..stored.clone()
        };
        let src = popout_source_rect(natural_w, natural_h, &popout);
        let dest = popout_display_rect(w, h, natural_w, natural_h, &popout);
        let transform = placement_transform(&dest, popout.rotation, 0.0);
        let radius = scaled_corner_radius(popout.corner_radius, dest.width);

        if popout.shadow.enabled {
            paint_shadow(surface, &dest, radius, &popout.shadow, scale, &transform);
        }

        if popout.border.enabled {
            // The border is a filled rounded rect one border-width larger,
            // drawn under the image.
            let border_w = popout.border.width * scale;
            surface.fill_rounded_rect(
                dest.inflated(border_w),
                radius + border_w,
                popout.border.color.with_opacity(popout.border.opacity),
                &transform,
            );
        }

        surface.blit_image(image, src, dest, radius, popout.opacity, &transform);
    }
}

// ============================================================================
// Tests
// ============================================================================
