//! Zoom video synthesis from a still card image.
//!
//! Each frame center-crops the card by a linearly growing zoom factor and
//! rescales the crop back to full size, simulating a slow push-in. Frames are
//! piped to the encoder in order; the clip always contains exactly
//! `duration_s * fps` frames. Unlike card generation there is no degradation
//! path: any decode or encode failure aborts the call.

use std::path::{Path, PathBuf};

use image::imageops;

use crate::{
    encode_ffmpeg::{EncodeConfig, FfmpegEncoder},
    error::{CardcastError, CardcastResult},
};

/// Zoom clip parameters.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub duration_s: u32,
    pub fps: u32,
    /// Zoom grows linearly from 1.0 toward (but never reaching) `1.0 + max_zoom`.
    pub max_zoom: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            duration_s: 5,
            fps: 24,
            max_zoom: 0.12,
        }
    }
}

impl ZoomConfig {
    pub fn validate(&self) -> CardcastResult<()> {
        if self.duration_s == 0 {
            return Err(CardcastError::validation("zoom duration must be non-zero"));
        }
        if self.fps == 0 {
            return Err(CardcastError::validation("zoom fps must be non-zero"));
        }
        if !self.max_zoom.is_finite() || self.max_zoom < 0.0 {
            return Err(CardcastError::validation(
                "zoom max_zoom must be finite and >= 0",
            ));
        }
        Ok(())
    }

    pub fn total_frames(&self) -> u64 {
        u64::from(self.duration_s) * u64::from(self.fps)
    }
}

/// Crop box `(left, top, width, height)` for frame `frame` of `total`.
///
/// Frame 0 covers the full source; later frames shrink symmetrically around
/// the center and never leave the source bounds.
pub(crate) fn zoom_crop_box(
    width: u32,
    height: u32,
    frame: u64,
    total: u64,
    max_zoom: f64,
) -> (u32, u32, u32, u32) {
    let t = frame as f64 / total as f64;
    let zoom = 1.0 + max_zoom * t;
    let new_w = ((f64::from(width) / zoom) as u32).clamp(1, width);
    let new_h = ((f64::from(height) / zoom) as u32).clamp(1, height);
    let left = (width - new_w) / 2;
    let top = (height - new_h) / 2;
    (left, top, new_w, new_h)
}

/// A synthesized clip: its on-disk path and exact frame count.
#[derive(Clone, Debug)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub frame_count: u64,
}

/// Synthesizes zoom clips from card images.
pub struct VideoGenerator {
    config: ZoomConfig,
}

impl Default for VideoGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoGenerator {
    pub fn new() -> Self {
        Self::with_config(ZoomConfig::default())
    }

    pub fn with_config(config: ZoomConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Render the zoom clip for `card_image_path` into `output_path`.
    pub fn generate(
        &self,
        card_image_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> CardcastResult<RenderedVideo> {
        self.generate_with_progress(card_image_path, output_path, |_| {})
    }

    /// Like [`generate`](Self::generate), reporting progress as an integer
    /// percentage. The reported value is monotonically non-decreasing and
    /// reaches 100 when the last frame has been handed to the encoder.
    pub fn generate_with_progress(
        &self,
        card_image_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
        mut on_progress: impl FnMut(u8),
    ) -> CardcastResult<RenderedVideo> {
        self.config.validate()?;
        let card_image_path = card_image_path.as_ref();
        let output_path = output_path.as_ref().to_path_buf();

        let card = image::open(card_image_path)
            .map_err(|e| {
                CardcastError::decode(format!(
                    "failed to open card image '{}': {e}",
                    card_image_path.display()
                ))
            })?
            .to_rgb8();
        let (w, h) = card.dimensions();
        let total = self.config.total_frames();

        let mut encoder = FfmpegEncoder::new(EncodeConfig {
            width: w,
            height: h,
            fps: self.config.fps,
            out_path: output_path.clone(),
        })?;

        let mut last_pct = 0u8;
        for i in 0..total {
            let (left, top, crop_w, crop_h) = zoom_crop_box(w, h, i, total, self.config.max_zoom);
            let cropped = imageops::crop_imm(&card, left, top, crop_w, crop_h).to_image();
            let frame = imageops::resize(&cropped, w, h, imageops::FilterType::Lanczos3);
            encoder.write_frame(frame.as_raw())?;

            let pct = (((i + 1) * 100) / total) as u8;
            if pct != last_pct {
                last_pct = pct;
                on_progress(pct);
            }
        }

        encoder.finish()?;
        tracing::debug!(
            frames = total,
            path = %output_path.display(),
            "zoom video encoded"
        );

        Ok(RenderedVideo {
            path: output_path,
            frame_count: total,
        })
    }
}
