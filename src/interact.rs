//! Hit-testing, drag-to-move with centerline snapping, and popout crop
//! editing.
//!
//! Hit-testing reuses the placement functions the compositor paints with —
//! never a separate approximation — so visual bounds and clickable bounds
//! cannot diverge. Popouts are tested before overlay elements (they sit
//! above `above-subject` content); element layers are tested top-to-bottom
//! and, within a layer, in reverse array order (topmost paint, topmost hit).

use crate::assets::{AssetProvider, TextMeasurer};
use crate::render::overlay::element_rect;
use crate::scene::{CropRect, ElementId, Popout, Scene, ZLayer};
use crate::transform::{Rect, placement_transform, popout_display_rect};

/// Distance (in percentage points) within which a dragged center snaps to
/// the 50% centerline.
pub const SNAP_THRESHOLD: f32 = 1.5;

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Element(ElementId),
    Popout(ElementId),
}

fn point_in_rotated_rect(rect: &Rect, rotation: f32, px: f32, py: f32) -> bool {
    let transform = placement_transform(rect, rotation, 0.0);
    match transform.invert() {
        Some(inverse) => {
            let (lx, ly) = inverse.apply(px, py);
            rect.contains(lx, ly)
        }
        None => false,
    }
}

/// Tests a surface-space pointer position against the Scene.
pub fn hit_test(
    scene: &Scene,
    surface_w: f32,
    surface_h: f32,
    pointer_x: f32,
    pointer_y: f32,
    assets: &dyn AssetProvider,
    measurer: &dyn TextMeasurer,
) -> Option<Hit> {
    // Popouts paint above `above-subject` elements, so they take the
    // pointer first, topmost (last-painted) popout first.
    if let Some(asset) = &scene.subject.asset
        && let Some(image) = assets.resolve(asset)
    {
        let natural_w = image.width() as f32;
        let natural_h = image.height() as f32;
        for stored in scene.popouts.iter().rev() {
            let popout = Popout {
                crop: stored.crop.clamped(),
                ..stored.clone()
            };
            let rect = popout_display_rect(surface_w, surface_h, natural_w, natural_h, &popout);
            if point_in_rotated_rect(&rect, popout.rotation, pointer_x, pointer_y) {
                return Some(Hit::Popout(stored.id));
            }
        }
    }

    for layer in [ZLayer::AboveText, ZLayer::AboveSubject, ZLayer::BehindSubject] {
        for element in scene.elements.iter().rev().filter(|e| e.z_layer == layer) {
            let Some(rect) = element_rect(element, surface_w, surface_h, assets, measurer) else {
                continue;
            };
            if point_in_rotated_rect(&rect, element.rotation, pointer_x, pointer_y) {
                return Some(Hit::Element(element.id));
            }
        }
    }
    None
}

// ============================================================================
// Dragging
// ============================================================================

/// Result of a drag step: the updated percentage position plus which axes
/// snapped (drives the transient centerline guides).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragOutcome {
    pub x: f32,
    pub y: f32,
    pub snapped_x: bool,
    pub snapped_y: bool,
}

fn snap_axis(value: f32) -> (f32, bool) {
    if (value - 50.0).abs() <= SNAP_THRESHOLD {
        (50.0, true)
    } else {
        (value, false)
    }
}

/// Moves an element or popout by a pointer delta in surface pixels.
///
/// The delta converts to percentage space using the same surface dimensions
/// that produced the last paint, clamps to `[0,100]` and snaps each axis to
/// the 50% centerline within [`SNAP_THRESHOLD`]. Returns `None` for an
/// unknown id.
pub fn apply_drag(
    scene: &mut Scene,
    id: ElementId,
    delta_x_px: f32,
    delta_y_px: f32,
    surface_w: f32,
    surface_h: f32,
) -> Option<DragOutcome> {
    let dx = delta_x_px / surface_w * 100.0;
    let dy = delta_y_px / surface_h * 100.0;

    let apply = |x: &mut f32, y: &mut f32| {
        let (new_x, snapped_x) = snap_axis((*x + dx).clamp(0.0, 100.0));
        let (new_y, snapped_y) = snap_axis((*y + dy).clamp(0.0, 100.0));
        *x = new_x;
        *y = new_y;
        DragOutcome {
            x: new_x,
            y: new_y,
            snapped_x,
            snapped_y,
        }
    };

    if let Some(popout) = scene.popout_mut(id) {
        return Some(apply(&mut popout.x, &mut popout.y));
    }
    if let Some(element) = scene.element_mut(id) {
        return Some(apply(&mut element.x, &mut element.y));
    }
    None
}

// ============================================================================
// Crop editing
// ============================================================================

/// The eight resize handles of a popout's crop rectangle, plus the
/// drag-inside-to-move mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    Move,
}

/// Applies a handle drag to a crop rectangle, deltas in source-image
/// percentage points.
///
/// Every edit keeps the rectangle within `[0,100]×[0,100]` and both
/// dimensions at least 5%. Shrinking an edge past the minimum clamps against
/// the opposite edge's anchor instead of pushing it.
pub fn resize_crop(crop: &mut CropRect, handle: CropHandle, dx: f32, dy: f32) {
    // Normalize first so a crop deserialized out of range cannot produce
    // inverted clamp bounds below.
    *crop = crop.clamped();
    let min = CropRect::MIN_DIM;
    let right = crop.x + crop.width;
    let bottom = crop.y + crop.height;

    let move_left = |crop: &mut CropRect| {
        let new_x = (crop.x + dx).clamp(0.0, right - min);
        crop.width = right - new_x;
        crop.x = new_x;
    };
    let move_right = |crop: &mut CropRect| {
        let new_right = (right + dx).clamp(crop.x + min, 100.0);
        crop.width = new_right - crop.x;
    };
    let move_top = |crop: &mut CropRect| {
        let new_y = (crop.y + dy).clamp(0.0, bottom - min);
        crop.height = bottom - new_y;
        crop.y = new_y;
    };
    let move_bottom = |crop: &mut CropRect| {
        let new_bottom = (bottom + dy).clamp(crop.y + min, 100.0);
        crop.height = new_bottom - crop.y;
    };

    match handle {
        CropHandle::TopLeft => {
            move_left(crop);
            move_top(crop);
        }
        CropHandle::Top => move_top(crop),
        CropHandle::TopRight => {
            move_right(crop);
            move_top(crop);
        }
        CropHandle::Right => move_right(crop),
        CropHandle::BottomRight => {
            move_right(crop);
            move_bottom(crop);
        }
        CropHandle::Bottom => move_bottom(crop),
        CropHandle::BottomLeft => {
            move_left(crop);
            move_bottom(crop);
        }
        CropHandle::Left => move_left(crop),
        CropHandle::Move => {
            crop.x = (crop.x + dx).clamp(0.0, 100.0 - crop.width);
            crop.y = (crop.y + dy).clamp(0.0, 100.0 - crop.height);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::assets::tests::FixedMeasurer;
    use crate::scene::ElementKind;
    use image::RgbaImage;

    fn measurer() -> FixedMeasurer {
        FixedMeasurer { advance: 10.0 }
    }

    fn emoji(scene: &mut Scene, x: f32, y: f32, width: f32, layer: ZLayer) -> ElementId {
        scene.add_element(
            x,
            y,
            width,
            layer,
            ElementKind::Emoji {
                emoji: "⭐".to_string(),
            },
        )
    }

    #[test]
    fn pointer_at_element_center_always_hits() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let id = emoji(&mut scene, 30.0, 40.0, 20.0, ZLayer::AboveSubject);
        let hit = hit_test(&scene, 200.0, 100.0, 60.0, 40.0, &assets, &measurer());
        assert_eq!(hit, Some(Hit::Element(id)));
    }

    #[test]
    fn pointer_outside_bounds_never_hits() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        emoji(&mut scene, 30.0, 40.0, 20.0, ZLayer::AboveSubject);
        // Element is 40px wide/tall centered at (60, 40) on a 200×100
        // surface; (130, 40) is far outside.
        let hit = hit_test(&scene, 200.0, 100.0, 130.0, 40.0, &assets, &measurer());
        assert_eq!(hit, None);
    }

    #[test]
    fn rotated_element_hits_in_rotated_space() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let id = emoji(&mut scene, 50.0, 50.0, 40.0, ZLayer::AboveSubject);
        scene.element_mut(id).unwrap().rotation = 45.0;
        // The square's corner in axis space is no longer inside the rotated
        // square; a point on the rotated diagonal still is.
        let hit_corner = hit_test(&scene, 100.0, 100.0, 31.0, 31.0, &assets, &measurer());
        assert_eq!(hit_corner, None);
        let hit_center = hit_test(&scene, 100.0, 100.0, 50.0, 50.0, &assets, &measurer());
        assert_eq!(hit_center, Some(Hit::Element(id)));
    }

    #[test]
    fn later_element_in_same_layer_wins() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let below = emoji(&mut scene, 50.0, 50.0, 30.0, ZLayer::AboveSubject);
        let above = emoji(&mut scene, 50.0, 50.0, 30.0, ZLayer::AboveSubject);
        let hit = hit_test(&scene, 100.0, 100.0, 50.0, 50.0, &assets, &measurer());
        assert_eq!(hit, Some(Hit::Element(above)));
        assert_ne!(hit, Some(Hit::Element(below)));
    }

    #[test]
    fn higher_layer_tested_first() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        emoji(&mut scene, 50.0, 50.0, 30.0, ZLayer::AboveSubject);
        let top = emoji(&mut scene, 50.0, 50.0, 30.0, ZLayer::AboveText);
        // Array order puts the above-text element last, but even if it were
        // first, its layer is tested before above-subject.
        let hit = hit_test(&scene, 100.0, 100.0, 50.0, 50.0, &assets, &measurer());
        assert_eq!(hit, Some(Hit::Element(top)));
    }

    #[test]
    fn popout_hit_before_overlapping_element() {
        let mut assets = MemoryAssets::new();
        let asset = assets.insert_image("cap", RgbaImage::new(100, 100));
        let mut scene = Scene::with_subject(asset);
        emoji(&mut scene, 50.0, 50.0, 40.0, ZLayer::AboveSubject);
        let popout = scene.add_popout(CropRect::default(), 50.0, 50.0, 40.0);
        let hit = hit_test(&scene, 100.0, 100.0, 50.0, 50.0, &assets, &measurer());
        assert_eq!(hit, Some(Hit::Popout(popout)));
    }

    #[test]
    fn drag_converts_pixels_to_percent_and_clamps() {
        let mut scene = Scene::default();
        let id = emoji(&mut scene, 30.0, 40.0, 10.0, ZLayer::AboveSubject);
        // 40px on a 200px-wide surface = 20 percentage points.
        let outcome = apply_drag(&mut scene, id, 40.0, 0.0, 200.0, 100.0).unwrap();
        assert_eq!(outcome.x, 50.0); // 30 + 20, landing exactly on center
        assert!(outcome.snapped_x);

        // Drag far past the edge clamps at 100.
        let outcome = apply_drag(&mut scene, id, 500.0, 500.0, 200.0, 100.0).unwrap();
        assert_eq!(outcome.x, 100.0);
        assert_eq!(outcome.y, 100.0);
        assert!(!outcome.snapped_x);
    }

    #[test]
    fn drag_snaps_within_threshold_only() {
        let mut scene = Scene::default();
        let id = emoji(&mut scene, 48.8, 40.0, 10.0, ZLayer::AboveSubject);
        let outcome = apply_drag(&mut scene, id, 0.0, 0.0, 100.0, 100.0).unwrap();
        assert_eq!(outcome.x, 50.0, "48.8 is within 1.5 of the centerline");
        assert!(outcome.snapped_x);
        assert!(!outcome.snapped_y, "40 is outside the snap threshold");
        assert_eq!(scene.element(id).unwrap().x, 50.0, "snap persisted");
    }

    #[test]
    fn drag_moves_popouts_too() {
        let mut scene = Scene::default();
        let id = scene.add_popout(CropRect::default(), 20.0, 20.0, 30.0);
        let outcome = apply_drag(&mut scene, id, 10.0, 10.0, 100.0, 100.0).unwrap();
        assert_eq!((outcome.x, outcome.y), (30.0, 30.0));
        assert_eq!(scene.popout(id).unwrap().x, 30.0);
    }

    #[test]
    fn unknown_id_returns_none() {
        let mut scene = Scene::default();
        assert!(apply_drag(&mut scene, ElementId(999), 1.0, 1.0, 100.0, 100.0).is_none());
    }

    #[test]
    fn bottom_right_drag_past_edge_clamps_to_boundary() {
        let mut crop = CropRect {
            x: 40.0,
            y: 40.0,
            width: 57.0,
            height: 30.0,
        };
        // 3 points past the right edge: width clamps so x + width == 100.
        resize_crop(&mut crop, CropHandle::BottomRight, 6.0, 0.0);
        assert_eq!(crop.x + crop.width, 100.0);
        assert_eq!(crop.width, 60.0);
    }

    #[test]
    fn shrinking_below_minimum_anchors_opposite_edge() {
        let mut crop = CropRect {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 20.0,
        };
        // Drag the left handle far right: width floors at 5 with the right
        // edge fixed at 30.
        resize_crop(&mut crop, CropHandle::Left, 50.0, 0.0);
        assert_eq!(crop.width, CropRect::MIN_DIM);
        assert_eq!(crop.x, 25.0);

        // Same from the top.
        resize_crop(&mut crop, CropHandle::Top, 0.0, 50.0);
        assert_eq!(crop.height, CropRect::MIN_DIM);
        assert_eq!(crop.y, 25.0);
    }

    #[test]
    fn any_drag_sequence_preserves_crop_invariants() {
        let mut crop = CropRect::default();
        let handles = [
            CropHandle::TopLeft,
            CropHandle::Top,
            CropHandle::TopRight,
            CropHandle::Right,
            CropHandle::BottomRight,
            CropHandle::Bottom,
            CropHandle::BottomLeft,
            CropHandle::Left,
            CropHandle::Move,
        ];
        let deltas = [-80.0, -13.5, -0.4, 2.8, 17.0, 64.0, 120.0];
        for (i, &handle) in handles.iter().cycle().take(63).enumerate() {
            let dx = deltas[i % deltas.len()];
            let dy = deltas[(i * 3 + 1) % deltas.len()];
            resize_crop(&mut crop, handle, dx, dy);
            assert!(crop.x >= 0.0, "x {crop:?}");
            assert!(crop.y >= 0.0, "y {crop:?}");
            assert!(crop.x + crop.width <= 100.0 + 1e-4, "right {crop:?}");
            assert!(crop.y + crop.height <= 100.0 + 1e-4, "bottom {crop:?}");
            assert!(crop.width >= CropRect::MIN_DIM - 1e-4, "width {crop:?}");
            assert!(crop.height >= CropRect::MIN_DIM - 1e-4, "height {crop:?}");
        }
    }

    #[test]
    fn move_mode_slides_without_resizing() {
        let mut crop = CropRect::default();
        resize_crop(&mut crop, CropHandle::Move, 100.0, -100.0);
        assert_eq!(crop.width, 50.0);
        assert_eq!(crop.height, 50.0);
        assert_eq!(crop.x, 50.0);
        assert_eq!(crop.y, 0.0);
    }
}
