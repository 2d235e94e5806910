//! Card compositing.
//!
//! A card is a fixed-size canvas assembled in one CPU raster pass: background
//! paint (fitted photo or synthesized gradient), bottom-anchored alpha
//! gradient overlay, optional category badge, shadowed wrapped title, and a
//! footer line. The flattened canvas is persisted as PNG and returned to the
//! caller.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{ImageFormat, RgbImage};

use crate::{
    background::{self, Background},
    encode_ffmpeg::ensure_parent_dir,
    error::{CardcastError, CardcastResult},
    fit,
    font::{FontHandle, FontResolver},
    text::{LayoutMeasurer, MAX_TITLE_LINES, TextBrush, TextLayoutEngine, wrap_text},
};

/// Input for a single card generation call.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CardSpec {
    pub title: String,
    /// Badge text; an empty string suppresses the badge.
    #[serde(default)]
    pub category: String,
    /// http(s) URL or local filesystem path. Absent or unusable sources
    /// degrade to the gradient background.
    #[serde(default)]
    pub image_source: Option<String>,
}

/// Styling and layout parameters for the compositor.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CardStyle {
    pub width: u32,
    pub height: u32,
    /// Left/right text margin in pixels.
    pub margin: u32,
    pub title_size_px: f32,
    /// Vertical advance between title lines.
    pub title_line_advance: f64,
    /// Distance from the canvas bottom to the bottom of the title block.
    pub title_block_bottom: f64,
    pub max_title_lines: usize,
    pub badge_x: f64,
    pub badge_y: f64,
    pub badge_size_px: f32,
    pub badge_padding: f64,
    pub badge_radius: f64,
    pub badge_fill: [u8; 4],
    /// Footer line near the bottom edge; empty suppresses it.
    pub footer: String,
    pub footer_size_px: f32,
    /// Distance from the canvas bottom to the footer's top edge.
    pub footer_offset: f64,
    pub footer_fill: [u8; 4],
    pub shadow_dx: f64,
    pub shadow_dy: f64,
    pub shadow_fill: [u8; 4],
    /// Fraction of the canvas height where the overlay ramp starts.
    pub overlay_start_frac: f32,
    pub overlay_max_alpha: u8,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            margin: 60,
            title_size_px: 52.0,
            title_line_advance: 64.0,
            title_block_bottom: 140.0,
            max_title_lines: MAX_TITLE_LINES,
            badge_x: 40.0,
            badge_y: 40.0,
            badge_size_px: 26.0,
            badge_padding: 8.0,
            badge_radius: 8.0,
            badge_fill: [220, 50, 50, 200],
            footer: "cardcast".to_string(),
            footer_size_px: 22.0,
            footer_offset: 65.0,
            footer_fill: [200, 200, 200, 220],
            shadow_dx: 2.0,
            shadow_dy: 2.0,
            shadow_fill: [0, 0, 0, 180],
            overlay_start_frac: 0.4,
            overlay_max_alpha: 220,
        }
    }
}

/// A generated card: canvas-sized pixel buffer plus its on-disk path.
#[derive(Clone, Debug)]
pub struct RenderedCard {
    pub image: RgbImage,
    pub path: PathBuf,
}

/// Composites article cards.
pub struct CardGenerator {
    style: CardStyle,
    engine: TextLayoutEngine,
}

impl Default for CardGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CardGenerator {
    pub fn new() -> Self {
        Self::with_style(CardStyle::default())
    }

    pub fn with_style(style: CardStyle) -> Self {
        Self {
            style,
            engine: TextLayoutEngine::new(),
        }
    }

    pub fn style(&self) -> &CardStyle {
        &self.style
    }

    /// Generate a card and persist it as PNG at `output_path`.
    ///
    /// Background and font probe failures degrade silently; an unwritable
    /// output path or an unusable font is a hard failure. An existing file at
    /// `output_path` is replaced.
    pub fn generate(
        &mut self,
        spec: &CardSpec,
        output_path: impl AsRef<Path>,
    ) -> CardcastResult<RenderedCard> {
        let output_path = output_path.as_ref().to_path_buf();
        let style = self.style.clone();
        let (w, h) = (style.width, style.height);
        if w == 0 || h == 0 {
            return Err(CardcastError::validation(
                "card width/height must be non-zero",
            ));
        }
        let w16: u16 = w
            .try_into()
            .map_err(|_| CardcastError::validation("card width exceeds u16"))?;
        let h16: u16 = h
            .try_into()
            .map_err(|_| CardcastError::validation("card height exceeds u16"))?;

        // Background: fitted source image, or the gradient on any failure.
        let bg = match background::resolve_background(spec.image_source.as_deref()) {
            Background::Loaded(img) => fit::fit_to_fill(&img, w, h)?,
            Background::Fallback(_) => background::default_gradient(w, h),
        };

        let bold_handle = FontResolver::resolve(true)?;
        let regular_handle = FontResolver::resolve(false)?;
        let bold = self.engine.prepare(&bold_handle)?;
        let regular = self.engine.prepare(&regular_handle)?;
        let bold_data = font_data(bold.handle());
        let regular_data = font_data(regular.handle());

        // Wrap the title before drawing starts; measurement shares the engine.
        let max_text_width = w as f32 - 2.0 * style.margin as f32;
        let lines = {
            let mut measurer = LayoutMeasurer::new(&mut self.engine, &bold, style.title_size_px);
            wrap_text(
                &spec.title,
                &mut measurer,
                max_text_width,
                style.max_title_lines,
            )?
        };

        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        let full_canvas = vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(w), f64::from(h));

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(image_paint_from_rgb(&bg)?);
        ctx.fill_rect(&full_canvas);

        ctx.set_paint(overlay_paint(
            w,
            h,
            style.overlay_start_frac,
            style.overlay_max_alpha,
        )?);
        ctx.fill_rect(&full_canvas);

        if !spec.category.is_empty() {
            let badge_text = format!("  {}  ", spec.category);
            let layout =
                self.engine
                    .layout(&badge_text, &bold, style.badge_size_px, TextBrush::WHITE)?;
            let text_w = f64::from(layout.width());
            let text_h = f64::from(layout.height());
            let pad = style.badge_padding;

            let rounded = vello_cpu::kurbo::RoundedRect::new(
                style.badge_x,
                style.badge_y,
                style.badge_x + text_w + pad * 2.0,
                style.badge_y + text_h + pad * 2.0,
                style.badge_radius,
            );
            let mut path = vello_cpu::kurbo::BezPath::new();
            for el in vello_cpu::kurbo::Shape::path_elements(&rounded, 0.1) {
                path.push(el);
            }
            let [r, g, b, a] = style.badge_fill;
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_path(&path);

            draw_layout(
                &mut ctx,
                &layout,
                &bold_data,
                style.badge_x + pad,
                style.badge_y + pad,
            );
        }

        // Title block: bottom-anchored, shadow pass under each line.
        let total_text_h = lines.len() as f64 * style.title_line_advance;
        let mut text_y = f64::from(h) - style.title_block_bottom - total_text_h;
        let [sr, sg, sb, sa] = style.shadow_fill;
        for line in &lines {
            let shadow = self.engine.layout(
                line,
                &bold,
                style.title_size_px,
                TextBrush::rgba(sr, sg, sb, sa),
            )?;
            draw_layout(
                &mut ctx,
                &shadow,
                &bold_data,
                f64::from(style.margin) + style.shadow_dx,
                text_y + style.shadow_dy,
            );

            let main = self
                .engine
                .layout(line, &bold, style.title_size_px, TextBrush::WHITE)?;
            draw_layout(&mut ctx, &main, &bold_data, f64::from(style.margin), text_y);

            text_y += style.title_line_advance;
        }

        if !style.footer.is_empty() {
            let [fr, fg, fb, fa] = style.footer_fill;
            let layout = self.engine.layout(
                &style.footer,
                &regular,
                style.footer_size_px,
                TextBrush::rgba(fr, fg, fb, fa),
            )?;
            draw_layout(
                &mut ctx,
                &layout,
                &regular_data,
                f64::from(style.margin),
                f64::from(h) - style.footer_offset,
            );
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);

        let rgb = flatten_premul_to_rgb(pixmap.data_as_u8_slice(), w, h)?;
        let image = RgbImage::from_raw(w, h, rgb)
            .ok_or_else(|| CardcastError::validation("rendered buffer size mismatch"))?;

        ensure_parent_dir(&output_path)?;
        image
            .save_with_format(&output_path, ImageFormat::Png)
            .map_err(|e| {
                CardcastError::encode(format!(
                    "failed to write card image '{}': {e}",
                    output_path.display()
                ))
            })?;
        tracing::debug!(path = %output_path.display(), lines = lines.len(), "card written");

        Ok(RenderedCard {
            image,
            path: output_path,
        })
    }
}

/// Draw every glyph run of `layout` with its own brush, translated to (x, y).
fn draw_layout(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrush>,
    font: &vello_cpu::peniko::FontData,
    x: f64,
    y: f64,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn font_data(handle: &FontHandle) -> vello_cpu::peniko::FontData {
    vello_cpu::peniko::FontData::new(
        vello_cpu::peniko::Blob::from(handle.bytes().to_vec()),
        0,
    )
}

/// Overlay alpha at row `y`: zero above the ramp start, linear to
/// `max_alpha` at the bottom edge.
fn overlay_alpha(y: u32, height: u32, start_frac: f32, max_alpha: u8) -> u8 {
    let start = (height as f32 * start_frac) as u32;
    if y < start || height <= start {
        return 0;
    }
    let progress = (y - start) as f32 / (height - start) as f32;
    (f32::from(max_alpha) * progress) as u8
}

fn overlay_paint(
    width: u32,
    height: u32,
    start_frac: f32,
    max_alpha: u8,
) -> CardcastResult<vello_cpu::Image> {
    let mut bytes = vec![0u8; (width as usize) * (height as usize) * 4];
    for y in 0..height {
        let alpha = overlay_alpha(y, height, start_frac, max_alpha);
        if alpha == 0 {
            continue;
        }
        let row_start = (y as usize) * (width as usize) * 4;
        // Premultiplied black rows: rgb stays zero, only alpha varies.
        for px in bytes[row_start..row_start + (width as usize) * 4].chunks_exact_mut(4) {
            px[3] = alpha;
        }
    }
    rgba_premul_to_image(&bytes, width, height)
}

fn image_paint_from_rgb(img: &RgbImage) -> CardcastResult<vello_cpu::Image> {
    let (w, h) = img.dimensions();
    let mut bytes = Vec::with_capacity((w as usize) * (h as usize) * 4);
    for px in img.pixels() {
        bytes.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba_premul_to_image(&bytes, w, h)
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> CardcastResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CardcastError::validation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CardcastError::validation("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(CardcastError::validation("pixmap byte length mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> CardcastResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Flatten a premultiplied RGBA8 buffer to opaque RGB8.
///
/// Premultiplied color over an opaque black backdrop is the color itself, so
/// the alpha byte is simply dropped.
fn flatten_premul_to_rgb(src: &[u8], width: u32, height: u32) -> CardcastResult<Vec<u8>> {
    if src.len() != (width as usize) * (height as usize) * 4 {
        return Err(CardcastError::validation(
            "flatten expects a width*height*4 rgba8 buffer",
        ));
    }
    let mut out = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for px in src.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_matches_canvas_contract() {
        let style = CardStyle::default();
        assert_eq!((style.width, style.height), (1080, 1080));
        assert_eq!(style.margin, 60);
        assert_eq!(style.max_title_lines, 4);
        assert_eq!(style.overlay_max_alpha, 220);
    }

    #[test]
    fn partial_style_json_fills_defaults() {
        let style: CardStyle = serde_json::from_str(r#"{"width":256,"height":256}"#).unwrap();
        assert_eq!((style.width, style.height), (256, 256));
        assert_eq!(style.margin, CardStyle::default().margin);
        assert_eq!(style.footer, CardStyle::default().footer);
    }

    #[test]
    fn style_round_trips_through_json() {
        let style = CardStyle {
            footer: "example.com".to_string(),
            badge_fill: [1, 2, 3, 4],
            ..CardStyle::default()
        };
        let json = serde_json::to_string(&style).unwrap();
        let back: CardStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.footer, "example.com");
        assert_eq!(back.badge_fill, [1, 2, 3, 4]);
    }

    #[test]
    fn overlay_alpha_ramp_is_anchored() {
        let h = 1000;
        assert_eq!(overlay_alpha(0, h, 0.4, 220), 0);
        assert_eq!(overlay_alpha(399, h, 0.4, 220), 0);
        assert_eq!(overlay_alpha(400, h, 0.4, 220), 0);
        let near_bottom = overlay_alpha(999, h, 0.4, 220);
        assert!(near_bottom >= 219, "got {near_bottom}");
        // Monotone down the ramp.
        let mut prev = 0;
        for y in 400..1000 {
            let a = overlay_alpha(y, h, 0.4, 220);
            assert!(a >= prev);
            prev = a;
        }
    }

    #[test]
    fn flatten_drops_alpha_bytes() {
        let src = vec![10, 20, 30, 255, 40, 50, 60, 255];
        let out = flatten_premul_to_rgb(&src, 2, 1).unwrap();
        assert_eq!(out, vec![10, 20, 30, 40, 50, 60]);
        assert!(flatten_premul_to_rgb(&src, 3, 1).is_err());
    }

    #[test]
    fn image_paint_accepts_canvas_sized_rgb() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]));
        assert!(image_paint_from_rgb(&img).is_ok());
    }
}
