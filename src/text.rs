//! Text layout: word wrap, block placement, decorations, and per-language
//! layout resolution.
//!
//! Wrapping and decoration placement measure through the caller's
//! [`TextMeasurer`], the same capability the drawing surface uses, so layout
//! and paint can never disagree about a line's width.

use crate::assets::{FontSpec, TextMeasurer};
use crate::scene::{LayoutSettings, TextAnchor, TextBlock};
use crate::transform::Rect;

/// Fraction of the surface width a headline block may occupy before wrapping.
pub const TEXT_WRAP_FRACTION: f32 = 0.9;

// ============================================================================
// Word wrap
// ============================================================================

/// Greedy word wrap.
///
/// Explicit line breaks are honored first and each forced segment yields at
/// least one output line — empty segments are preserved verbatim. Within a
/// segment, words accumulate until adding the next one would exceed
/// `max_width`; a word that alone exceeds the limit is kept as its own
/// (oversized) line rather than split.
pub fn wrap(
    text: &str,
    max_width: f32,
    font: &FontSpec,
    measurer: &dyn TextMeasurer,
) -> Vec<String> {
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        let mut words = segment.split(' ').filter(|w| !w.is_empty());
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };
        let mut current = first.to_string();
        for word in words {
            let candidate = format!("{current} {word}");
            if measurer.measure(font, &candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }
    lines
}

// ============================================================================
// Block layout
// ============================================================================

/// One laid-out line. `y` is the draw position in the block's anchor
/// convention: top of the em box for top-anchored blocks, bottom of the em
/// box for bottom-anchored ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// A laid-out text block ready to paint.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub lines: Vec<Line>,
    pub font: FontSpec,
    pub font_px: f32,
    pub line_height_px: f32,
    pub anchor: TextAnchor,
    /// Where a following block starts: the cursor after the last line minus
    /// one font size, so the carried gap is exactly
    /// `line_height − font_size`.
    pub carry_y: f32,
}

/// Lays out a text block on a surface.
///
/// With `carried_from` set (the subheadline following a headline), the block
/// starts exactly at the carried offset and inherits the leading block's
/// anchor convention, regardless of its own anchor settings. Otherwise the
/// block anchors to the top or bottom edge per its resolved layout;
/// bottom-anchored lines are pre-offset upward by `(n−1) × line_height` so
/// the last line lands on the anchor.
///
/// Returns `None` when the block is disabled or has no content for its
/// active language.
pub fn layout_block(
    block: &TextBlock,
    surface_w: f32,
    surface_h: f32,
    measurer: &dyn TextMeasurer,
    carried_from: Option<(f32, TextAnchor)>,
) -> Option<BlockLayout> {
    if !block.enabled {
        return None;
    }
    let content = block.active_content();
    if content.trim().is_empty() {
        return None;
    }

    let layout = block.resolve_layout(&block.active_language);
    let font_px = layout.size / 100.0 * surface_h;
    let line_height_px = layout.line_height / 100.0 * font_px;
    let font = FontSpec {
        family: block.style.font.clone(),
        size_px: font_px,
        weight: block.style.weight,
        italic: block.style.italic,
    };

    let wrapped = wrap(content, surface_w * TEXT_WRAP_FRACTION, &font, measurer);
    let count = wrapped.len() as f32;

    let (anchor, first_y) = match carried_from {
        Some((y, anchor)) => (anchor, y),
        None => match layout.position {
            TextAnchor::Top => (TextAnchor::Top, layout.offset_y / 100.0 * surface_h),
            TextAnchor::Bottom => (
                TextAnchor::Bottom,
                surface_h
                    - layout.offset_y / 100.0 * surface_h
                    - (count - 1.0) * line_height_px,
            ),
        },
    };

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measurer.measure(&font, &text);
            Line {
                x: (surface_w - width) / 2.0,
                y: first_y + i as f32 * line_height_px,
                width,
                text,
            }
        })
        .collect::<Vec<_>>();

    let last_y = lines.last().map(|l| l.y).unwrap_or(first_y);
    Some(BlockLayout {
        lines,
        font,
        font_px,
        line_height_px,
        anchor,
        carry_y: last_y + line_height_px - font_px,
    })
}

// ============================================================================
// Decorations
// ============================================================================

/// Stroke thickness of underline/strikethrough decorations.
pub fn decoration_thickness(font_px: f32) -> f32 {
    (font_px * 0.05).max(2.0)
}

/// Underline geometry for one laid-out line.
pub fn underline_rect(line: &Line, font_px: f32, anchor: TextAnchor) -> Rect {
    let offset = match anchor {
        TextAnchor::Top => 0.9 * font_px,
        TextAnchor::Bottom => 0.1 * font_px,
    };
    Rect::new(
        line.x,
        line.y + offset,
        line.width,
        decoration_thickness(font_px),
    )
}

/// Strikethrough geometry for one laid-out line.
pub fn strikethrough_rect(line: &Line, font_px: f32, anchor: TextAnchor) -> Rect {
    let offset = match anchor {
        TextAnchor::Top => 0.4 * font_px,
        TextAnchor::Bottom => -0.4 * font_px,
    };
    Rect::new(
        line.x,
        line.y + offset,
        line.width,
        decoration_thickness(font_px),
    )
}

// ============================================================================
// Per-language layout resolution
// ============================================================================

impl TextBlock {
    /// Resolves the layout for a language without mutating the block.
    ///
    /// With per-language layout off, every language shares the global
    /// settings. With it on, a language that has its own settings uses them;
    /// one that does not yet gets a copy seeded from the current layout
    /// language (or the global settings when that language has none either).
    pub fn resolve_layout(&self, language: &str) -> LayoutSettings {
        if !self.per_language_layout {
            return self.layout;
        }
        if let Some(settings) = self.language_layouts.get(language) {
            return *settings;
        }
        self.language_layouts
            .get(&self.layout_language)
            .copied()
            .unwrap_or(self.layout)
    }

    /// Edits layout for a language, seeding its settings on first write and
    /// making it the layout language. With per-language layout off, the edit
    /// targets the shared global settings.
    pub fn set_layout(&mut self, language: &str, edit: impl FnOnce(&mut LayoutSettings)) {
        if !self.per_language_layout {
            edit(&mut self.layout);
            return;
        }
        let seed = self
            .language_layouts
            .get(&self.layout_language)
            .copied()
            .unwrap_or(self.layout);
        let settings = self
            .language_layouts
            .entry(language.to_string())
            .or_insert(seed);
        edit(settings);
        self.layout_language = language.to_string();
    }
}

// ============================================================================
// Tests
// ============================================================================
