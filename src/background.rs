//! Background image resolution with silent degradation.
//!
//! A card must always render something, so every failure on this path
//! (missing source, network error, decode error) collapses into the gradient
//! fallback instead of propagating. The two-branch [`Background`] outcome
//! keeps "did it fall back" observable to tests without leaking the detail
//! into the card generator's public contract.

use std::{io::Write as _, path::Path, time::Duration};

use anyhow::Context as _;
use image::{DynamicImage, Rgb, RgbImage};

/// Download timeout for remote background images.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Browser-like User-Agent; some news CDNs reject unadorned clients.
pub const DOWNLOAD_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Outcome of background resolution.
#[derive(Debug)]
pub enum Background {
    /// The requested source decoded successfully.
    Loaded(DynamicImage),
    /// The source was absent or unusable; the reason is kept for diagnostics.
    Fallback(String),
}

impl Background {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Background::Fallback(_))
    }
}

/// Resolve an optional URL-or-path background source. Never fails.
pub fn resolve_background(source: Option<&str>) -> Background {
    let Some(source) = source else {
        return Background::Fallback("no image source".to_string());
    };
    match load_source(source) {
        Ok(img) => Background::Loaded(img),
        Err(e) => {
            tracing::warn!(
                source,
                error = format!("{e:#}"),
                "background image unavailable, using gradient fallback"
            );
            Background::Fallback(format!("{e:#}"))
        }
    }
}

fn load_source(source: &str) -> anyhow::Result<DynamicImage> {
    if source.starts_with("http://") || source.starts_with("https://") {
        download_image(source)
    } else {
        image::open(Path::new(source)).with_context(|| format!("open local image '{source}'"))
    }
}

fn download_image(url: &str) -> anyhow::Result<DynamicImage> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .context("build http client")?;

    let response = client
        .get(url)
        .header("User-Agent", DOWNLOAD_USER_AGENT)
        .send()
        .with_context(|| format!("fetch image '{url}'"))?
        .error_for_status()
        .with_context(|| format!("fetch image '{url}'"))?;
    let bytes = response.bytes().context("read image response body")?;

    // Spool through a scratch file before decoding, as the decoder may probe
    // the payload several times. The file is removed on drop on every path.
    let mut scratch = tempfile::NamedTempFile::new().context("create download scratch file")?;
    scratch
        .write_all(&bytes)
        .context("write download scratch file")?;
    image::open(scratch.path()).context("decode downloaded image")
}

/// Synthesized vertical gradient used whenever no background image is usable.
///
/// Deterministic: identical dimensions always produce identical pixels.
pub fn default_gradient(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    let hf = f64::from(height.max(1));
    for y in 0..height {
        let t = f64::from(y) / hf;
        let px = Rgb([
            (20.0 + 30.0 * t) as u8,
            (30.0 + 20.0 * t) as u8,
            (60.0 + 40.0 * t) as u8,
        ]);
        for x in 0..width {
            img.put_pixel(x, y, px);
        }
    }
    img
}
