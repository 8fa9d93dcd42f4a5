//! The declarative scene model.
//!
//! A [`Scene`] is the complete renderable state of one screenshot: background,
//! subject placement, headline/subheadline text, decorative overlay elements
//! and popouts. Every spatial field that is not explicitly in pixels is a
//! percentage of the target surface's width or height, which is what makes the
//! same Scene reproduce identically on the main preview, the thumbnail strips
//! and the full-resolution export surface.
//!
//! The model is the wire format between the frontend and the engine: all types
//! serialize to camelCase JSON.
//!
//! # Example
//!
//! ```
//! use promoshot_renderer::{AssetRef, Scene};
//!
//! let mut scene = Scene::with_subject(AssetRef::new("capture-1"));
//! scene.subject.scale = 70.0;
//! scene.subject.y = 60.0;
//!
//! let json = scene.to_json().unwrap();
//! let restored = Scene::from_json(&json).unwrap();
//! assert_eq!(restored.subject.scale, 70.0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;

// ============================================================================
// Identity
// ============================================================================

/// Opaque reference to a decoded raster asset held by the caller's
/// [`AssetProvider`](crate::assets::AssetProvider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct AssetRef(pub String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Stable identity of an overlay element or popout, used for selection,
/// ordering and deletion. Allocated by the owning [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ElementId(pub u64);

// ============================================================================
// Background
// ============================================================================

/// One color stop of a gradient background. `position` is 0–100 along the
/// gradient line; stops are rendered in list order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct GradientStop {
    pub color: Color,
    pub position: f32,
}

/// How a background image is fitted to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum ImageFit {
    /// Fill the surface, cropping the overflow.
    #[default]
    Cover,
    /// Fit entirely inside the surface, leaving margins.
    Contain,
}

/// The background fill variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundKind {
    #[serde(rename_all = "camelCase")]
    Gradient { angle: f32, stops: Vec<GradientStop> },
    #[serde(rename_all = "camelCase")]
    Solid { color: Color },
    #[serde(rename_all = "camelCase")]
    Image {
        asset: AssetRef,
        #[serde(default)]
        fit: ImageFit,
        /// Blur radius relative to a 400-unit-wide reference surface.
        #[serde(default)]
        blur: f32,
        #[serde(default)]
        overlay_color: Color,
        /// Opacity (0–100) of the tint laid over the image.
        #[serde(default)]
        overlay_opacity: f32,
    },
}

/// Film-grain style noise applied over the painted background only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct NoiseSettings {
    pub enabled: bool,
    /// Strength 0–100.
    pub intensity: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 25.0,
        }
    }
}

/// Background fill plus the independent noise toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Background {
    #[serde(flatten)]
    pub kind: BackgroundKind,
    #[serde(default)]
    pub noise: NoiseSettings,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Gradient {
                angle: 135.0,
                stops: vec![
                    GradientStop {
                        color: Color::rgb(0x66, 0x7e, 0xea),
                        position: 0.0,
                    },
                    GradientStop {
                        color: Color::rgb(0x76, 0x4b, 0xa2),
                        position: 100.0,
                    },
                ],
            },
            noise: NoiseSettings::default(),
        }
    }
}

// ============================================================================
// Subject
// ============================================================================

/// Drop shadow settings shared by the subject and popouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub enabled: bool,
    pub color: Color,
    /// Blur radius relative to a 400-unit-wide reference surface; scaled to
    /// the target at paint time like corner radii.
    pub blur: f32,
    /// Opacity 0–100, composited into the shadow color.
    pub opacity: f32,
    /// Offsets relative to the same 400-unit reference.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::BLACK,
            blur: 40.0,
            opacity: 35.0,
            offset_x: 0.0,
            offset_y: 12.0,
        }
    }
}

/// Border frame settings shared by the subject and popouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub enabled: bool,
    pub color: Color,
    /// Stroke width relative to a 400-unit-wide reference surface.
    pub width: f32,
    pub opacity: f32,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::WHITE,
            width: 8.0,
            opacity: 100.0,
        }
    }
}

/// The primary captured image and its placement.
///
/// `x`/`y` are anchor fractions (0–100) distributing the scaled image against
/// the leftover surface space, not absolute coordinates; `scale` is a
/// percentage of surface width, capped so the image also fits `scale%` of the
/// surface height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub asset: Option<AssetRef>,
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    /// Signed shear factor approximating a perspective tilt. Deliberately a
    /// 2D shear, not a projective transform; downstream position presets
    /// assume this exact math.
    pub perspective: f32,
    /// Corner radius in pixels relative to a 400-unit-wide reference; scaled
    /// by drawn width at paint time.
    pub corner_radius: f32,
    pub shadow: Shadow,
    pub frame: Frame,
    /// When set, the subject layer is a pre-rendered buffer supplied by the
    /// external 3D mockup renderer and the 2D placement transform is skipped.
    #[serde(default)]
    pub prerendered: bool,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            asset: None,
            scale: 70.0,
            x: 50.0,
            y: 50.0,
            rotation: 0.0,
            perspective: 0.0,
            corner_radius: 24.0,
            shadow: Shadow::default(),
            frame: Frame::default(),
            prerendered: false,
        }
    }
}

// ============================================================================
// Text
// ============================================================================

/// Vertical anchor edge for a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum TextAnchor {
    #[default]
    Top,
    Bottom,
}

/// Shared character styling for a text block or text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Font family reference, resolved by the drawing surface.
    pub font: String,
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub color: Color,
    /// Opacity 0–100.
    pub opacity: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: "Inter".to_string(),
            weight: 700,
            italic: false,
            underline: false,
            strikethrough: false,
            color: Color::WHITE,
            opacity: 100.0,
        }
    }
}

/// Per-language (or global) layout of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    /// Font size as a percentage of surface height.
    pub size: f32,
    pub position: TextAnchor,
    /// Vertical offset from the anchor edge, percentage of surface height.
    pub offset_y: f32,
    /// Line height as a percentage of the font size.
    pub line_height: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            size: 5.0,
            position: TextAnchor::Top,
            offset_y: 8.0,
            line_height: 115.0,
        }
    }
}

/// A headline or subheadline: per-language strings, shared styling, and
/// layout that is either global or resolved per layout language.
///
/// Layout reads go through [`TextBlock::resolve_layout`] (pure — never mutates
/// the Scene); layout writes go through [`TextBlock::set_layout`], which seeds
/// a language's settings on first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub enabled: bool,
    /// Language code → string content. Explicit `\n` line breaks are honored.
    pub content: BTreeMap<String, String>,
    /// Language whose string content is shown.
    pub active_language: String,
    /// Language whose layout settings are being edited; seeds newly-requested
    /// languages when per-language layout is on.
    pub layout_language: String,
    pub style: TextStyle,
    /// Global layout, used whenever `per_language_layout` is off or a
    /// language has no settings of its own yet.
    pub layout: LayoutSettings,
    pub per_language_layout: bool,
    #[serde(default)]
    pub language_layouts: BTreeMap<String, LayoutSettings>,
}

impl TextBlock {
    fn new(enabled: bool, text: &str, layout: LayoutSettings, style: TextStyle) -> Self {
        let mut content = BTreeMap::new();
        content.insert("en".to_string(), text.to_string());
        Self {
            enabled,
            content,
            active_language: "en".to_string(),
            layout_language: "en".to_string(),
            style,
            layout,
            per_language_layout: false,
            language_layouts: BTreeMap::new(),
        }
    }

    /// The string content for the active language, empty if missing.
    pub fn active_content(&self) -> &str {
        self.content
            .get(&self.active_language)
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// Overlay elements
// ============================================================================

/// Paint layer of an overlay element relative to subject and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum ZLayer {
    BehindSubject,
    #[default]
    AboveSubject,
    AboveText,
}

/// Decorative frame drawn around a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum TextFrameStyle {
    #[default]
    Border,
    Badge,
    Ribbon,
    Laurel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TextFrame {
    pub style: TextFrameStyle,
    pub color: Color,
    /// User-controlled padding multiplier around the measured text extents.
    pub scale: f32,
}

impl Default for TextFrame {
    fn default() -> Self {
        Self {
            style: TextFrameStyle::Border,
            color: Color::WHITE,
            scale: 1.0,
        }
    }
}

/// Type-specific payload of an overlay element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementKind {
    #[serde(rename_all = "camelCase")]
    Text {
        content: String,
        /// Font size as a percentage of surface height.
        size: f32,
        style: TextStyle,
        #[serde(default)]
        frame: Option<TextFrame>,
    },
    #[serde(rename_all = "camelCase")]
    Graphic { asset: AssetRef },
    #[serde(rename_all = "camelCase")]
    Emoji { emoji: String },
    #[serde(rename_all = "camelCase")]
    Icon {
        /// Name of a built-in glyph, see [`crate::render::overlay::glyph_svg`].
        glyph: String,
        stroke_color: Color,
        stroke_width: f32,
        #[serde(default)]
        shadow: bool,
    },
}

/// A decorative element painted above or below the subject.
///
/// `x`/`y` address the element's center in surface percentage space; `width`
/// is the footprint as a percentage of surface width (height derives from the
/// content's aspect ratio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct OverlayElement {
    pub id: ElementId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub rotation: f32,
    /// Opacity 0–100.
    pub opacity: f32,
    pub z_layer: ZLayer,
    #[serde(flatten)]
    pub kind: ElementKind,
}

// ============================================================================
// Popouts
// ============================================================================

/// Crop rectangle in source-image percentage space, kept within
/// `[0,100]×[0,100]` with both dimensions at least [`CropRect::MIN_DIM`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    /// Minimum crop dimension in percent, below which a region degenerates.
    pub const MIN_DIM: f32 = 5.0;

    /// Clamps the rectangle into `[0,100]²` with both dimensions ≥ 5.
    pub fn clamped(mut self) -> Self {
        self.width = self.width.clamp(Self::MIN_DIM, 100.0);
        self.height = self.height.clamp(Self::MIN_DIM, 100.0);
        self.x = self.x.clamp(0.0, 100.0 - self.width);
        self.y = self.y.clamp(0.0, 100.0 - self.height);
        self
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self {
            x: 25.0,
            y: 25.0,
            width: 50.0,
            height: 50.0,
        }
    }
}

/// An independently placed, bordered and shadowed crop of the subject image.
///
/// Popouts apply only their own rotation; they never inherit the subject's
/// rotation or perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Popout {
    pub id: ElementId,
    pub crop: CropRect,
    /// Center of the displayed rectangle, surface percentage space.
    pub x: f32,
    pub y: f32,
    /// Displayed width as a percentage of surface width; height follows the
    /// crop's aspect ratio.
    pub width: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub corner_radius: f32,
    pub shadow: Shadow,
    pub border: Frame,
}

// ============================================================================
// Scene
// ============================================================================

/// The complete declarative description of one screenshot.
///
/// The compositor borrows a Scene read-only per render pass; mutation happens
/// through the editing operations on this type (each setter independent, no
/// transactional boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub background: Background,
    pub subject: Subject,
    pub headline: TextBlock,
    pub subheadline: TextBlock,
    /// Array order encodes paint order within each z-layer.
    pub elements: Vec<OverlayElement>,
    /// Array order encodes paint order.
    pub popouts: Vec<Popout>,
    #[serde(default = "first_free_id")]
    next_id: u64,
}

fn first_free_id() -> u64 {
    1
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: Background::default(),
            subject: Subject::default(),
            headline: TextBlock::new(
                true,
                "Your headline",
                LayoutSettings::default(),
                TextStyle::default(),
            ),
            subheadline: TextBlock::new(
                false,
                "",
                LayoutSettings {
                    size: 3.0,
                    offset_y: 16.0,
                    ..LayoutSettings::default()
                },
                TextStyle {
                    weight: 400,
                    opacity: 80.0,
                    ..TextStyle::default()
                },
            ),
            elements: Vec::new(),
            popouts: Vec::new(),
            next_id: 1,
        }
    }
}

impl Scene {
    /// Creates a Scene with defaults and the given subject capture attached.
    pub fn with_subject(asset: AssetRef) -> Self {
        let mut scene = Self::default();
        scene.subject.asset = Some(asset);
        scene
    }

    fn allocate_id(&mut self) -> ElementId {
        // Stay collision-free even for scenes deserialized without a counter.
        let used = self
            .elements
            .iter()
            .map(|e| e.id.0)
            .chain(self.popouts.iter().map(|p| p.id.0))
            .max()
            .unwrap_or(0);
        let id = ElementId(self.next_id.max(used + 1));
        self.next_id = id.0 + 1;
        id
    }

    /// Appends an overlay element (painted on top within its layer) and
    /// returns its id.
    pub fn add_element(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        z_layer: ZLayer,
        kind: ElementKind,
    ) -> ElementId {
        let id = self.allocate_id();
        self.elements.push(OverlayElement {
            id,
            x,
            y,
            width,
            rotation: 0.0,
            opacity: 100.0,
            z_layer,
            kind,
        });
        id
    }

    /// Appends a popout over the given crop region and returns its id.
    pub fn add_popout(&mut self, crop: CropRect, x: f32, y: f32, width: f32) -> ElementId {
        let id = self.allocate_id();
        self.popouts.push(Popout {
            id,
            crop: crop.clamped(),
            x,
            y,
            width,
            rotation: 0.0,
            opacity: 100.0,
            corner_radius: 16.0,
            shadow: Shadow::default(),
            border: Frame::default(),
        });
        id
    }

    pub fn element(&self, id: ElementId) -> Option<&OverlayElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut OverlayElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn popout(&self, id: ElementId) -> Option<&Popout> {
        self.popouts.iter().find(|p| p.id == id)
    }

    pub fn popout_mut(&mut self, id: ElementId) -> Option<&mut Popout> {
        self.popouts.iter_mut().find(|p| p.id == id)
    }

    /// Removes the element or popout with the given id, if present.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.elements.len() + self.popouts.len();
        self.elements.retain(|e| e.id != id);
        self.popouts.retain(|p| p.id != id);
        before != self.elements.len() + self.popouts.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
