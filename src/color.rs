//! RGBA color values with hex serialization.
//!
//! Colors travel between the frontend and the engine as `#rrggbb` /
//! `#rrggbbaa` strings, so [`Color`] serializes to a hex string rather
//! than a struct.

use palette::{Hsl, IntoColor, Srgb};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Neutral gray used when no usable color is available
    /// (for example a gradient with an empty stop list).
    pub const NEUTRAL: Self = Self::rgb(128, 128, 128);

    /// Creates a fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with an explicit alpha channel.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Formats as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scales the alpha channel by an opacity percentage (0–100).
    pub fn with_opacity(self, opacity_pct: f32) -> Self {
        let factor = (opacity_pct / 100.0).clamp(0.0, 1.0);
        Self {
            a: (self.a as f32 * factor).round() as u8,
            ..self
        }
    }

    /// Darkens the color by reducing its HSL lightness.
    pub fn darken(self, amount: f32) -> Self {
        let rgb = Srgb::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        );
        let mut hsl: Hsl = rgb.into_color();
        hsl.lightness = (hsl.lightness - amount).max(0.0);
        let darkened: Srgb = hsl.into_color();
        Self {
            r: (darkened.red * 255.0).round() as u8,
            g: (darkened.green * 255.0).round() as u8,
            b: (darkened.blue * 255.0).round() as u8,
            a: self.a,
        }
    }

    /// Linear interpolation between two colors, `t` in 0–1.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
        Self {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
            a: mix(a.a, b.a),
        }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid color: {s:?}")))
    }
}

#[cfg(feature = "jsonschema")]
impl schemars::JsonSchema for Color {
    fn schema_name() -> String {
        "Color".to_string()
    }

    // `gen` is a reserved keyword in edition 2024, hence the raw identifier.
    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let c = Color::from_hex("#667eea").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x66, 0x7e, 0xea, 255));
        assert_eq!(c.to_hex(), "#667eea");

        let translucent = Color::from_hex("764ba280").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#764ba280");
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn opacity_scales_alpha() {
        let c = Color::WHITE.with_opacity(50.0);
        assert_eq!(c.a, 128);
        assert_eq!(Color::WHITE.with_opacity(200.0).a, 255);
    }

    #[test]
    fn darken_reduces_brightness() {
        let c = Color::rgb(200, 100, 100);
        let d = c.darken(0.2);
        let before = c.r as u32 + c.g as u32 + c.b as u32;
        let after = d.r as u32 + d.g as u32 + d.b as u32;
        assert!(after < before, "darkened color should be less bright");
        assert_eq!(d.a, c.a);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::rgb(0, 0, 0);
        let b = Color::rgb(255, 255, 255);
        assert_eq!(Color::lerp(a, b, 0.0), a);
        assert_eq!(Color::lerp(a, b, 1.0), b);
        assert_eq!(Color::lerp(a, b, 0.5).r, 128);
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&Color::rgb(0x66, 0x7e, 0xea)).unwrap();
        assert_eq!(json, "\"#667eea\"");
        let back: Color = serde_json::from_str("\"#764ba2\"").unwrap();
        assert_eq!(back, Color::rgb(0x76, 0x4b, 0xa2));
    }
}
