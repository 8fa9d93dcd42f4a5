//! Overlay elements: decorative text (with optional frames), raster graphics,
//! emoji and built-in icon glyphs, painted in z-layers around the subject.

use image::RgbaImage;
use image::imageops::flip_horizontal;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::debug;

use crate::assets::{AssetProvider, FontSpec, TextMeasurer};
use crate::color::Color;
use crate::scene::{ElementKind, OverlayElement, Scene, TextFrame, TextFrameStyle, ZLayer};
use crate::surface::{Surface, TextBaseline};
use crate::transform::{Mat2D, Rect, placement_transform};

/// Line advance of element text as a multiple of the font size.
const ELEMENT_LINE_SPACING: f32 = 1.2;

// ============================================================================
// Footprints
// ============================================================================

/// The element's footprint rectangle on the surface — the exact rectangle the
/// painter uses, reused by hit-testing. `None` when the element cannot be
/// sized this pass (unresolved graphic asset, unknown glyph, empty text).
pub(crate) fn element_rect(
    element: &OverlayElement,
    surface_w: f32,
    surface_h: f32,
    assets: &dyn AssetProvider,
    measurer: &dyn TextMeasurer,
) -> Option<Rect> {
    let width = element.width / 100.0 * surface_w;
    let height = match &element.kind {
        ElementKind::Graphic { asset } => {
            let image = assets.resolve(asset)?;
            width * image.height() as f32 / image.width() as f32
        }
        // Emoji and icons are treated as square.
        ElementKind::Emoji { .. } => width,
        ElementKind::Icon { glyph, .. } => {
            glyph_svg(glyph)?;
            width
        }
        ElementKind::Text { content, size, style, .. } => {
            if content.trim().is_empty() {
                return None;
            }
            let layout = layout_text_element(content, *size, style, width, surface_h, measurer);
            layout.block_height
        }
    };
    Some(Rect::centered(
        element.x / 100.0 * surface_w,
        element.y / 100.0 * surface_h,
        width,
        height,
    ))
}

struct TextElementLayout {
    lines: Vec<(String, f32)>,
    font: FontSpec,
    font_px: f32,
    line_px: f32,
    block_height: f32,
    widest_line: f32,
}

fn layout_text_element(
    content: &str,
    size: f32,
    style: &crate::scene::TextStyle,
    width_px: f32,
    surface_h: f32,
    measurer: &dyn TextMeasurer,
) -> TextElementLayout {
    let font_px = size / 100.0 * surface_h;
    let font = FontSpec {
        family: style.font.clone(),
        size_px: font_px,
        weight: style.weight,
        italic: style.italic,
    };
    let lines: Vec<(String, f32)> = crate::text::wrap(content, width_px, &font, measurer)
        .into_iter()
        .map(|line| {
            let w = measurer.measure(&font, &line);
            (line, w)
        })
        .collect();
    let line_px = font_px * ELEMENT_LINE_SPACING;
    let block_height = lines.len() as f32 * line_px;
    let widest_line = lines.iter().map(|(_, w)| *w).fold(0.0, f32::max);
    TextElementLayout {
        lines,
        font,
        font_px,
        line_px,
        block_height,
        widest_line,
    }
}

// ============================================================================
// Painting
// ============================================================================

/// Paints every element assigned to `layer`, in array order (later elements
/// on top within the layer). Invalid elements are skipped for the pass, never
/// removed, so a transiently missing asset recovers on a later repaint.
pub(crate) fn paint_layer(
    scene: &Scene,
    layer: ZLayer,
    surface: &mut dyn Surface,
    assets: &dyn AssetProvider,
    measurer: &dyn TextMeasurer,
) {
    let w = surface.width() as f32;
    let h = surface.height() as f32;
    for element in scene.elements.iter().filter(|e| e.z_layer == layer) {
        let Some(rect) = element_rect(element, w, h, assets, measurer) else {
            debug!(id = element.id.0, "element not paintable this pass, skipped");
            continue;
        };
        let transform = placement_transform(&rect, element.rotation, 0.0);
        match &element.kind {
            ElementKind::Graphic { asset } => {
                // element_rect already proved the asset resolves.
                if let Some(image) = assets.resolve(asset) {
                    let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
                    surface.blit_image(image, src, rect, 0.0, element.opacity, &transform);
                }
            }
            ElementKind::Emoji { emoji } => {
                let Some(image) = emoji_image(emoji, rect.width) else {
                    debug!(id = element.id.0, "emoji unavailable, skipped");
                    continue;
                };
                let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
                surface.blit_image(&image, src, rect, 0.0, element.opacity, &transform);
            }
            ElementKind::Icon {
                glyph,
                stroke_color,
                stroke_width,
                shadow,
            } => {
                let Some(svg) = glyph_svg(glyph) else {
                    continue;
                };
                if *shadow {
                    let silhouette = icon_svg(svg, Color::BLACK.with_opacity(40.0), *stroke_width);
                    if let Some(image) = svg_to_image(&silhouette, rect.width) {
                        let src =
                            Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
                        let offset = rect.width * 0.03;
                        surface.blit_image(
                            &image,
                            src,
                            rect.offset(offset, offset),
                            0.0,
                            element.opacity,
                            &transform,
                        );
                    }
                }
                let tinted = icon_svg(svg, *stroke_color, *stroke_width);
                if let Some(image) = svg_to_image(&tinted, rect.width) {
                    let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
                    surface.blit_image(&image, src, rect, 0.0, element.opacity, &transform);
                }
            }
            ElementKind::Text {
                content,
                size,
                style,
                frame,
            } => {
                let layout = layout_text_element(content, *size, style, rect.width, h, measurer);
                if let Some(frame) = frame {
                    paint_text_frame(surface, &rect, &layout, frame, element.opacity, &transform);
                }
                let color = style
                    .color
                    .with_opacity(style.opacity)
                    .with_opacity(element.opacity);
                for (i, (line, line_width)) in layout.lines.iter().enumerate() {
                    let x = rect.x + (rect.width - line_width) / 2.0;
                    let y = rect.y + i as f32 * layout.line_px
                        + (layout.line_px - layout.font_px) / 2.0;
                    surface.fill_text(
                        line,
                        x,
                        y,
                        &layout.font,
                        color,
                        TextBaseline::Top,
                        &transform,
                    );
                }
            }
        }
    }
}

fn paint_text_frame(
    surface: &mut dyn Surface,
    rect: &Rect,
    layout: &TextElementLayout,
    frame: &TextFrame,
    opacity: f32,
    transform: &Mat2D,
) {
    let pad = layout.font_px * 0.5 * frame.scale.max(0.0);
    let (cx, cy) = rect.center();
    let extents = Rect::centered(
        cx,
        cy,
        layout.widest_line + 2.0 * pad,
        layout.block_height + 2.0 * pad,
    );
    let color = frame.color.with_opacity(opacity);
    match frame.style {
        TextFrameStyle::Border => {
            surface.stroke_rounded_rect(
                extents,
                layout.font_px * 0.3,
                (layout.font_px * 0.08).max(2.0),
                color,
                transform,
            );
        }
        TextFrameStyle::Badge => {
            let diameter = extents.width.max(extents.height);
            let circle = Rect::centered(cx, cy, diameter, diameter);
            surface.fill_rounded_rect(circle, diameter / 2.0, color, transform);
        }
        TextFrameStyle::Ribbon => {
            let svg = ribbon_svg(frame.color);
            if let Some(image) = svg_to_image(&svg, extents.width * 1.3) {
                let src = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
                let dest = Rect::centered(cx, cy, extents.width * 1.3, extents.height);
                surface.blit_image(&image, src, dest, 0.0, opacity, transform);
            }
        }
        TextFrameStyle::Laurel => {
            let branch_h = layout.block_height * 1.6;
            let tinted = replace_svg_colors(LAUREL_SVG, frame.color);
            if let Some(left) = svg_to_image(&tinted, branch_h) {
                let right = flip_horizontal(&left);
                let src = Rect::new(0.0, 0.0, left.width() as f32, left.height() as f32);
                let branch_w = branch_h * left.width() as f32 / left.height() as f32;
                let gap = layout.widest_line / 2.0 + pad + branch_w / 2.0;
                let left_dest = Rect::centered(cx - gap, cy, branch_w, branch_h);
                let right_dest = Rect::centered(cx + gap, cy, branch_w, branch_h);
                surface.blit_image(&left, src, left_dest, 0.0, opacity, transform);
                surface.blit_image(&right, src, right_dest, 0.0, opacity, transform);
            }
        }
    }
}

// ============================================================================
// Built-in artwork
// ============================================================================

/// Path data for the built-in icon glyph set, in a 100×100 view box.
pub fn glyph_svg(name: &str) -> Option<&'static str> {
    Some(match name {
        "arrow-right" => "M 10 50 L 82 50 M 58 26 L 82 50 L 58 74",
        "arrow-left" => "M 90 50 L 18 50 M 42 26 L 18 50 L 42 74",
        "arrow-up" => "M 50 90 L 50 18 M 26 42 L 50 18 L 74 42",
        "arrow-down" => "M 50 10 L 50 82 M 26 58 L 50 82 L 74 58",
        "check" => "M 18 54 L 42 76 L 84 24",
        "cross" => "M 24 24 L 76 76 M 76 24 L 24 76",
        "circle" => "M 50 10 A 40 40 0 1 0 50 90 A 40 40 0 1 0 50 10",
        "star" => "M 50 10 L 61 38 L 91 40 L 68 60 L 75 89 L 50 73 L 25 89 L 32 60 L 9 40 L 39 38 Z",
        "heart" => "M 50 85 C 20 60 10 42 10 30 C 10 16 22 10 32 10 C 42 10 48 16 50 22 C 52 16 58 10 68 10 C 78 10 90 16 90 30 C 90 42 80 60 50 85 Z",
        _ => return None,
    })
}

fn rgb_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn icon_svg(path: &str, stroke: Color, stroke_width: f32) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="{path}" fill="none" stroke="{color}" stroke-opacity="{opacity}" stroke-width="{width}" stroke-linecap="round" stroke-linejoin="round"/></svg>"##,
        color = rgb_hex(stroke),
        opacity = stroke.a as f32 / 255.0,
        width = stroke_width.max(1.0),
    )
}

fn ribbon_svg(color: Color) -> String {
    let hex = rgb_hex(color);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 130 40"><polygon points="0,0 14,20 0,40 26,40 26,0" fill="{hex}" opacity="0.75"/><polygon points="130,0 116,20 130,40 104,40 104,0" fill="{hex}" opacity="0.75"/><rect x="20" y="4" width="90" height="32" fill="{hex}"/></svg>"##,
    )
}

/// A single laurel branch, tinted per use and mirrored for the right side.
const LAUREL_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 100"><path d="M 32 6 C 22 20 16 36 16 52 C 16 70 22 84 32 94" fill="none" stroke="#000000" stroke-width="4" stroke-linecap="round"/><path d="M 30 14 C 24 12 18 14 14 20 C 20 22 26 20 30 14 Z" fill="#000000"/><path d="M 24 30 C 18 28 12 30 8 36 C 14 38 20 36 24 30 Z" fill="#000000"/><path d="M 20 46 C 14 44 8 46 4 52 C 10 54 16 52 20 46 Z" fill="#000000"/><path d="M 20 62 C 14 64 8 62 4 56 C 10 54 16 56 20 62 Z" fill="#000000"/><path d="M 24 78 C 18 80 12 78 8 72 C 14 70 20 72 24 78 Z" fill="#000000"/></svg>"##;

/// Replaces fill/stroke colors in SVG markup, preserving `none`.
fn replace_svg_colors(svg: &str, color: Color) -> String {
    let hex = rgb_hex(color);
    let pass = replace_color_attr(svg, "fill", &hex);
    replace_color_attr(&pass, "stroke", &hex)
}

fn replace_color_attr(svg: &str, attr: &str, new_color: &str) -> String {
    let mut result = String::with_capacity(svg.len());
    let pattern = format!("{attr}=\"");
    let mut remaining = svg;
    while let Some(start) = remaining.find(&pattern) {
        result.push_str(&remaining[..start + pattern.len()]);
        remaining = &remaining[start + pattern.len()..];
        if let Some(end) = remaining.find('"') {
            let value = &remaining[..end];
            if value == "none" || value == "transparent" {
                result.push_str(value);
            } else {
                result.push_str(new_color);
            }
            remaining = &remaining[end..];
        }
    }
    result.push_str(remaining);
    result
}

/// Rasterizes SVG markup so the larger dimension is `size` pixels,
/// preserving aspect ratio. `None` when the markup cannot be parsed or the
/// target size degenerates.
pub(crate) fn svg_to_image(svg: &str, size: f32) -> Option<RgbaImage> {
    if size < 1.0 {
        return None;
    }
    let tree = Tree::from_str(svg, &Options::default()).ok()?;
    let svg_size = tree.size();
    let scale = size / svg_size.width().max(svg_size.height());
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Some(pixmap_to_rgba_image(&pixmap))
}

fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for y in 0..pixmap.height() {
        for x in 0..pixmap.width() {
            if let Some(pixel) = pixmap.pixel(x, y) {
                // tiny_skia stores premultiplied alpha.
                let (r, g, b, a) =
                    unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
                img.put_pixel(x, y, image::Rgba([r, g, b, a]));
            }
        }
    }
    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

#[cfg(feature = "twemoji")]
fn emoji_image(emoji: &str, size: f32) -> Option<RgbaImage> {
    use twemoji_assets::svg::SvgTwemojiAsset;
    let asset = SvgTwemojiAsset::from_emoji(emoji)?;
    svg_to_image(asset.as_ref(), size)
}

#[cfg(not(feature = "twemoji"))]
fn emoji_image(_emoji: &str, _size: f32) -> Option<RgbaImage> {
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::FixedMeasurer;
    use crate::assets::{FontStore, MemoryAssets};
    use crate::scene::TextStyle;
    use crate::surface::RasterSurface;

    fn measurer() -> FixedMeasurer {
        FixedMeasurer { advance: 10.0 }
    }

    #[test]
    fn graphic_footprint_follows_asset_aspect() {
        let mut assets = MemoryAssets::new();
        let asset = assets.insert_image("logo", RgbaImage::new(100, 50));
        let mut scene = Scene::default();
        let id = scene.add_element(
            50.0,
            50.0,
            40.0,
            ZLayer::AboveSubject,
            ElementKind::Graphic { asset },
        );
        let element = scene.element(id).unwrap();
        let rect = element_rect(element, 200.0, 200.0, &assets, &measurer()).unwrap();
        assert_eq!(rect.width, 80.0);
        assert_eq!(rect.height, 40.0);
        let (cx, cy) = rect.center();
        assert_eq!((cx, cy), (100.0, 100.0));
    }

    #[test]
    fn unresolved_graphic_has_no_footprint() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let id = scene.add_element(
            50.0,
            50.0,
            40.0,
            ZLayer::AboveSubject,
            ElementKind::Graphic {
                asset: crate::scene::AssetRef::new("missing"),
            },
        );
        let element = scene.element(id).unwrap();
        assert!(element_rect(element, 200.0, 200.0, &assets, &measurer()).is_none());
    }

    #[test]
    fn icon_and_emoji_are_square() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let icon = scene.add_element(
            10.0,
            10.0,
            20.0,
            ZLayer::AboveText,
            ElementKind::Icon {
                glyph: "star".to_string(),
                stroke_color: Color::WHITE,
                stroke_width: 4.0,
                shadow: false,
            },
        );
        let rect =
            element_rect(scene.element(icon).unwrap(), 300.0, 100.0, &assets, &measurer()).unwrap();
        assert_eq!(rect.width, 60.0);
        assert_eq!(rect.height, 60.0);

        let unknown = scene.add_element(
            10.0,
            10.0,
            20.0,
            ZLayer::AboveText,
            ElementKind::Icon {
                glyph: "no-such-glyph".to_string(),
                stroke_color: Color::WHITE,
                stroke_width: 4.0,
                shadow: false,
            },
        );
        assert!(
            element_rect(scene.element(unknown).unwrap(), 300.0, 100.0, &assets, &measurer())
                .is_none()
        );
    }

    #[test]
    fn text_footprint_grows_with_wrapping() {
        let assets = MemoryAssets::new();
        let mut scene = Scene::default();
        let id = scene.add_element(
            50.0,
            50.0,
            25.0,
            ZLayer::AboveSubject,
            ElementKind::Text {
                content: "short".to_string(),
                size: 5.0,
                style: TextStyle::default(),
                frame: None,
            },
        );
        let one_line =
            element_rect(scene.element(id).unwrap(), 400.0, 400.0, &assets, &measurer()).unwrap();

        if let Some(el) = scene.element_mut(id)
            && let ElementKind::Text { content, .. } = &mut el.kind
        {
            *content = "many words that will not fit one line".to_string();
        }
        let wrapped =
            element_rect(scene.element(id).unwrap(), 400.0, 400.0, &assets, &measurer()).unwrap();
        assert!(wrapped.height > one_line.height);
        assert_eq!(wrapped.width, one_line.width);
    }

    #[test]
    fn icon_paints_with_stroke_color() {
        let assets = MemoryAssets::new();
        let fonts = FontStore::new();
        let mut scene = Scene::default();
        scene.add_element(
            50.0,
            50.0,
            80.0,
            ZLayer::AboveSubject,
            ElementKind::Icon {
                glyph: "cross".to_string(),
                stroke_color: Color::rgb(255, 0, 0),
                stroke_width: 10.0,
                shadow: false,
            },
        );
        let mut surface = RasterSurface::new(100, 100, &fonts);
        paint_layer(&scene, ZLayer::AboveSubject, &mut surface, &assets, &measurer());
        // The cross passes through the element center.
        let center = surface.image().get_pixel(50, 50);
        assert!(center.0[0] > 200, "stroke color painted, got {:?}", center.0);
        assert!(center.0[1] < 60);
    }

    #[test]
    fn badge_frame_paints_behind_text_extents() {
        let assets = MemoryAssets::new();
        let fonts = FontStore::new();
        let mut scene = Scene::default();
        scene.add_element(
            50.0,
            50.0,
            60.0,
            ZLayer::AboveText,
            ElementKind::Text {
                content: "hi".to_string(),
                size: 10.0,
                style: TextStyle::default(),
                frame: Some(TextFrame {
                    style: TextFrameStyle::Badge,
                    color: Color::rgb(0, 0, 255),
                    scale: 1.0,
                }),
            },
        );
        let mut surface = RasterSurface::new(100, 100, &fonts);
        paint_layer(&scene, ZLayer::AboveText, &mut surface, &assets, &measurer());
        assert_eq!(surface.image().get_pixel(50, 50).0, [0, 0, 255, 255]);
        // Badge is circular: surface corners stay empty.
        assert_eq!(surface.image().get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn elements_skip_layers_they_are_not_on() {
        let mut assets = MemoryAssets::new();
        let asset = assets.insert_image("g", RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255])));
        let fonts = FontStore::new();
        let mut scene = Scene::default();
        scene.add_element(50.0, 50.0, 50.0, ZLayer::BehindSubject, ElementKind::Graphic { asset });
        let mut surface = RasterSurface::new(40, 40, &fonts);
        paint_layer(&scene, ZLayer::AboveText, &mut surface, &assets, &measurer());
        assert!(surface.image().pixels().all(|p| p.0[3] == 0));
    }

    #[cfg(not(feature = "twemoji"))]
    #[test]
    fn emoji_without_feature_is_skipped() {
        let assets = MemoryAssets::new();
        let fonts = FontStore::new();
        let mut scene = Scene::default();
        scene.add_element(
            50.0,
            50.0,
            30.0,
            ZLayer::AboveSubject,
            ElementKind::Emoji {
                emoji: "🚀".to_string(),
            },
        );
        let mut surface = RasterSurface::new(40, 40, &fonts);
        paint_layer(&scene, ZLayer::AboveSubject, &mut surface, &assets, &measurer());
        assert!(surface.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn replace_colors_preserves_none() {
        let svg = r##"<path fill="none" stroke="#123456"/>"##;
        let out = replace_svg_colors(svg, Color::rgb(255, 0, 0));
        assert!(out.contains(r#"fill="none""#));
        assert!(out.contains(r##"stroke="#ff0000""##));
    }

    #[test]
    fn laurel_svg_parses_and_renders() {
        let tinted = replace_svg_colors(LAUREL_SVG, Color::rgb(212, 175, 55));
        let img = svg_to_image(&tinted, 64.0).unwrap();
        assert!(img.pixels().any(|p| p.0[3] > 0), "laurel renders pixels");
    }
}
