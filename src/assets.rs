//! External capabilities: asset resolution and text measurement.
//!
//! The engine never decodes assets or discovers fonts itself; the caller
//! supplies an [`AssetProvider`] for decoded raster images and a
//! [`TextMeasurer`] for font metrics. [`MemoryAssets`] and [`FontStore`] are
//! the in-process implementations the shipped raster surface uses.
//!
//! A render pass draws whatever assets are currently resolved; a reference
//! that fails to resolve skips its layer for that pass and recovers on a
//! later repaint once the asset arrives.

use std::collections::HashMap;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::RgbaImage;
use thiserror::Error;

use crate::scene::AssetRef;

/// Errors at the asset/font boundary. Rendering itself never returns these;
/// a failed resolution just omits the affected layer for the pass.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to decode image asset: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to parse font data: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

// ============================================================================
// Asset provider
// ============================================================================

/// Resolves an opaque reference to a decoded RGBA image with known pixel
/// dimensions. Decoding happens on the provider side, never in the engine.
pub trait AssetProvider {
    fn resolve(&self, asset: &AssetRef) -> Option<&RgbaImage>;
}

/// In-memory asset provider keyed by reference string.
#[derive(Default)]
pub struct MemoryAssets {
    images: HashMap<String, RgbaImage>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-decoded image and returns its reference.
    pub fn insert_image(&mut self, id: impl Into<String>, image: RgbaImage) -> AssetRef {
        let id = id.into();
        self.images.insert(id.clone(), image);
        AssetRef(id)
    }

    /// Decodes encoded image bytes (PNG, JPEG, ...) and registers the result.
    pub fn insert_bytes(
        &mut self,
        id: impl Into<String>,
        bytes: &[u8],
    ) -> Result<AssetRef, AssetError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(self.insert_image(id, image))
    }
}

impl AssetProvider for MemoryAssets {
    fn resolve(&self, asset: &AssetRef) -> Option<&RgbaImage> {
        self.images.get(&asset.0)
    }
}

// ============================================================================
// Text measurement
// ============================================================================

/// A concrete font request: family reference plus pixel size and style.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f32,
    pub weight: u16,
    pub italic: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
            weight: 400,
            italic: false,
        }
    }
}

/// Measures the rendered width of a string. Used identically by word wrap and
/// by decoration placement so the two can never disagree.
pub trait TextMeasurer {
    fn measure(&self, font: &FontSpec, text: &str) -> f32;
}

struct FontEntry {
    family: String,
    weight: u16,
    italic: bool,
    font: FontArc,
}

/// Registered font faces with best-effort resolution by family/weight/style.
///
/// An unknown family silently falls back to the closest registered face (or a
/// crude advance estimate when the store is empty) so layout always proceeds.
#[derive(Default)]
pub struct FontStore {
    fonts: Vec<FontEntry>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a font face from raw font-file bytes.
    pub fn register(
        &mut self,
        family: impl Into<String>,
        weight: u16,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), AssetError> {
        let font = FontArc::try_from_vec(bytes)?;
        self.fonts.push(FontEntry {
            family: family.into(),
            weight,
            italic,
            font,
        });
        Ok(())
    }

    /// Finds the best face for a spec: exact family/style, then same family,
    /// then any registered face.
    pub fn resolve(&self, spec: &FontSpec) -> Option<&FontArc> {
        let same_family = || {
            self.fonts
                .iter()
                .filter(|e| e.family.eq_ignore_ascii_case(&spec.family))
        };
        same_family()
            .find(|e| e.weight == spec.weight && e.italic == spec.italic)
            .or_else(|| {
                same_family().min_by_key(|e| {
                    (e.weight as i32 - spec.weight as i32).abs()
                        + if e.italic == spec.italic { 0 } else { 1000 }
                })
            })
            .or_else(|| self.fonts.first())
            .map(|e| &e.font)
    }

    /// Ascent of the resolved face at the spec's pixel size; a fraction of
    /// the em when no face is available.
    pub fn ascent(&self, spec: &FontSpec) -> f32 {
        match self.resolve(spec) {
            Some(font) => font.as_scaled(PxScale::from(spec.size_px)).ascent(),
            None => spec.size_px * 0.8,
        }
    }
}

impl TextMeasurer for FontStore {
    fn measure(&self, spec: &FontSpec, text: &str) -> f32 {
        let Some(font) = self.resolve(spec) else {
            // Best-effort estimate keeps layout alive without any faces.
            return text.chars().count() as f32 * spec.size_px * 0.55;
        };
        let scaled = font.as_scaled(PxScale::from(spec.size_px));
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let glyph = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, glyph);
            }
            width += scaled.h_advance(glyph);
            previous = Some(glyph);
        }
        width
    }
}
