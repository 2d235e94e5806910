//! Aspect-preserving fit of source imagery onto the card canvas.

use image::{DynamicImage, RgbImage, imageops};

use crate::error::{CardcastError, CardcastResult};

/// Crop and resize `src` so it exactly fills `target_w` x `target_h`.
///
/// The source is center-cropped to the target aspect ratio first (full height
/// kept for wider-than-target sources, full width for taller ones), then
/// resized with Lanczos3. The output never letterboxes and never stretches.
pub fn fit_to_fill(src: &DynamicImage, target_w: u32, target_h: u32) -> CardcastResult<RgbImage> {
    if target_w == 0 || target_h == 0 {
        return Err(CardcastError::validation(
            "fit target width/height must be non-zero",
        ));
    }
    let (src_w, src_h) = (src.width(), src.height());
    if src_w == 0 || src_h == 0 {
        return Err(CardcastError::validation("fit source image is empty"));
    }

    let target_ratio = f64::from(target_w) / f64::from(target_h);
    let src_ratio = f64::from(src_w) / f64::from(src_h);

    let cropped = if src_ratio > target_ratio {
        let new_w = ((f64::from(src_h) * target_ratio) as u32).clamp(1, src_w);
        let left = (src_w - new_w) / 2;
        src.crop_imm(left, 0, new_w, src_h)
    } else {
        let new_h = ((f64::from(src_w) / target_ratio) as u32).clamp(1, src_h);
        let top = (src_h - new_h) / 2;
        src.crop_imm(0, top, src_w, new_h)
    };

    Ok(imageops::resize(
        &cropped.to_rgb8(),
        target_w,
        target_h,
        imageops::FilterType::Lanczos3,
    ))
}
