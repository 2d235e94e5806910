//! Text measurement, shaping, and title wrapping.
//!
//! Wrapping operates per code point rather than per word: titles are CJK text
//! where spaces are not reliable separators. Measurement sits behind the
//! [`TextMeasurer`] seam so the wrap policy can be tested without fonts; the
//! production measurer shapes with Parley and reads the layout width.

use std::borrow::Cow;

use crate::{
    error::{CardcastError, CardcastResult},
    font::FontHandle,
};

/// Default cap on wrapped title lines. Lines past the cap are dropped.
pub const MAX_TITLE_LINES: usize = 4;

/// Pixel-width measurement of a candidate line.
pub trait TextMeasurer {
    fn measure(&mut self, text: &str) -> CardcastResult<f32>;
}

/// Greedily wrap `text` into at most `max_lines` lines of `max_width_px`.
///
/// Characters accumulate into the current line; when appending one would
/// exceed the budget and the line is non-empty, the line is committed and the
/// character starts the next one. A single character wider than the budget
/// still occupies a line of its own. Lines beyond `max_lines` are silently
/// dropped.
///
/// Each append re-measures the whole candidate line, so measurement cost is
/// quadratic in line length; fine for title-scale input (~100 chars), not for
/// arbitrary documents.
pub fn wrap_text(
    text: &str,
    measurer: &mut dyn TextMeasurer,
    max_width_px: f32,
    max_lines: usize,
) -> CardcastResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if measurer.measure(&candidate)? > max_width_px && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.truncate(max_lines);
    Ok(lines)
}

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextBrush {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
}

/// A font registered with the layout engine, addressable by family name.
#[derive(Clone, Debug)]
pub struct PreparedFont {
    pub(crate) family: String,
    pub(crate) handle: FontHandle,
}

impl PreparedFont {
    pub fn handle(&self) -> &FontHandle {
        &self.handle
    }
}

/// Stateful helper for shaping plain text from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register a resolved font's bytes and record its family name.
    pub fn prepare(&mut self, handle: &FontHandle) -> CardcastResult<PreparedFont> {
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(handle.bytes().to_vec()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            CardcastError::font("no font families registered from font bytes")
        })?;
        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CardcastError::font("registered font family has no name"))?
            .to_string();
        Ok(PreparedFont {
            family,
            handle: handle.clone(),
        })
    }

    /// Shape and lay out one run of plain text.
    pub fn layout(
        &mut self,
        text: &str,
        font: &PreparedFont,
        size_px: f32,
        brush: TextBrush,
    ) -> CardcastResult<parley::Layout<TextBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CardcastError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(font.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Measured pixel width of `text` at `size_px`.
    pub fn measure_width(
        &mut self,
        text: &str,
        font: &PreparedFont,
        size_px: f32,
    ) -> CardcastResult<f32> {
        Ok(self.layout(text, font, size_px, TextBrush::default())?.width())
    }
}

/// [`TextMeasurer`] backed by the Parley layout engine.
pub struct LayoutMeasurer<'a> {
    engine: &'a mut TextLayoutEngine,
    font: &'a PreparedFont,
    size_px: f32,
}

impl<'a> LayoutMeasurer<'a> {
    pub fn new(engine: &'a mut TextLayoutEngine, font: &'a PreparedFont, size_px: f32) -> Self {
        Self {
            engine,
            font,
            size_px,
        }
    }
}

impl TextMeasurer for LayoutMeasurer<'_> {
    fn measure(&mut self, text: &str) -> CardcastResult<f32> {
        self.engine.measure_width(text, self.font, self.size_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic measurer: every code point is `px_per_char` wide.
    struct FixedWidth {
        px_per_char: f32,
    }

    impl TextMeasurer for FixedWidth {
        fn measure(&mut self, text: &str) -> CardcastResult<f32> {
            Ok(text.chars().count() as f32 * self.px_per_char)
        }
    }

    #[test]
    fn empty_text_wraps_to_no_lines() {
        let mut m = FixedWidth { px_per_char: 10.0 };
        let lines = wrap_text("", &mut m, 100.0, MAX_TITLE_LINES).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let mut m = FixedWidth { px_per_char: 10.0 };
        let lines = wrap_text("hello", &mut m, 100.0, MAX_TITLE_LINES).unwrap();
        assert_eq!(lines, vec!["hello".to_string()]);
    }

    #[test]
    fn lines_fit_the_pixel_budget() {
        let mut m = FixedWidth { px_per_char: 10.0 };
        // Budget of 35px fits 3 chars of 10px each.
        let lines = wrap_text("abcdefgh", &mut m, 35.0, MAX_TITLE_LINES).unwrap();
        assert_eq!(lines, vec!["abc", "def", "gh"]);
        for line in &lines {
            assert!(line.chars().count() as f32 * 10.0 <= 35.0);
        }
    }

    #[test]
    fn oversized_single_char_occupies_its_own_line() {
        let mut m = FixedWidth { px_per_char: 50.0 };
        let lines = wrap_text("abc", &mut m, 10.0, MAX_TITLE_LINES).unwrap();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn excess_lines_are_dropped_at_the_cap() {
        let mut m = FixedWidth { px_per_char: 10.0 };
        // 26 chars at 2 per line would be 13 lines; only the first 4 survive.
        let lines = wrap_text("abcdefghijklmnopqrstuvwxyz", &mut m, 20.0, 4).unwrap();
        assert_eq!(lines, vec!["ab", "cd", "ef", "gh"]);
    }

    #[test]
    fn multibyte_text_wraps_per_code_point() {
        let mut m = FixedWidth { px_per_char: 10.0 };
        let lines = wrap_text("보스톤코리아", &mut m, 30.0, MAX_TITLE_LINES).unwrap();
        assert_eq!(lines, vec!["보스톤", "코리아"]);
    }
}
