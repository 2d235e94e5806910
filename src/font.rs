//! Font resolution for card text.
//!
//! The card pipeline has to render Korean titles on hosts we do not control, so
//! fonts are located by probing an ordered list of well-known install paths
//! (Linux Nanum/Noto CJK, Windows Malgun Gothic, macOS Apple SD Gothic Neo,
//! with a DejaVu tail). When no probe path exists, the system font collection
//! is queried for a generic sans-serif face instead; rendering quality for CJK
//! text is then best-effort.
//!
//! Resolution always yields the raw font bytes: downstream shaping and glyph
//! rasterization both consume bytes, never paths.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::error::{CardcastError, CardcastResult};

/// Where a resolved font came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontSource {
    /// One of the preferred install paths existed on this host.
    Probed(PathBuf),
    /// No preferred path existed; a face was taken from the system collection.
    SystemFallback,
}

/// A loaded font ready for shaping and rasterization.
#[derive(Clone)]
pub struct FontHandle {
    source: FontSource,
    bold: bool,
    bytes: Arc<Vec<u8>>,
}

impl FontHandle {
    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("source", &self.source)
            .field("bold", &self.bold)
            .field("byte_len", &self.bytes.len())
            .finish()
    }
}

/// Locates a usable font for the requested weight.
pub struct FontResolver;

impl FontResolver {
    /// Resolve a font for the requested weight.
    ///
    /// Probe misses are skipped silently. The call fails only when a matched
    /// file cannot be read, or when the host exposes no usable font at all.
    pub fn resolve(bold: bool) -> CardcastResult<FontHandle> {
        for path in probe_candidates(bold) {
            if !path.exists() {
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|e| {
                CardcastError::font(format!("failed to read font '{}': {e}", path.display()))
            })?;
            tracing::debug!(path = %path.display(), bold, "resolved probed font");
            return Ok(FontHandle {
                source: FontSource::Probed(path),
                bold,
                bytes: Arc::new(bytes),
            });
        }
        system_fallback(bold)
    }
}

/// Preferred font files in priority order for the requested weight.
fn probe_candidates(bold: bool) -> Vec<PathBuf> {
    let candidates: &[&str] = if bold {
        &[
            "/usr/share/fonts/truetype/nanum/NanumSquareB.ttf",
            "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
            "C:/Windows/Fonts/malgunbd.ttf",
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
            "/Library/Fonts/AppleSDGothicNeo.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Bold.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/nanum/NanumSquareR.ttf",
            "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
            "C:/Windows/Fonts/malgun.ttf",
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
            "/Library/Fonts/AppleSDGothicNeo.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    };
    candidates.iter().map(PathBuf::from).collect()
}

/// Take a sans-serif face from the system font collection.
///
/// The requested weight is not honored here; whatever face the collection
/// lists first is used. Fails only on a host with no usable font at all.
fn system_fallback(bold: bool) -> CardcastResult<FontHandle> {
    let mut font_ctx = parley::FontContext::default();
    let ids: Vec<_> = font_ctx
        .collection
        .generic_families(parley::fontique::GenericFamily::SansSerif)
        .collect();
    for id in ids {
        let Some(family) = font_ctx.collection.family(id) else {
            continue;
        };
        for info in family.fonts() {
            let Some(bytes) = font_info_bytes(info) else {
                continue;
            };
            tracing::debug!(bold, "resolved system fallback font");
            return Ok(FontHandle {
                source: FontSource::SystemFallback,
                bold,
                bytes: Arc::new(bytes),
            });
        }
    }
    Err(CardcastError::font(
        "no usable font found: none of the preferred paths exist and the system \
         font collection has no sans-serif face",
    ))
}

fn font_info_bytes(info: &parley::fontique::FontInfo) -> Option<Vec<u8>> {
    use parley::fontique::SourceKind;
    match &info.source().kind {
        SourceKind::Memory(blob) => Some(blob.as_ref().to_vec()),
        SourceKind::Path(path) => {
            let path: &Path = path.as_ref();
            std::fs::read(path).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_lists_are_weight_specific() {
        let bold = probe_candidates(true);
        let regular = probe_candidates(false);
        assert_eq!(bold.len(), regular.len());
        assert!(bold.iter().any(|p| p.to_string_lossy().contains("Bold")
            || p.to_string_lossy().contains('B')));
        assert_ne!(bold[0], regular[0]);
    }

    #[test]
    fn probe_paths_are_absolute() {
        for path in probe_candidates(true).iter().chain(&probe_candidates(false)) {
            let s = path.to_string_lossy();
            assert!(s.starts_with('/') || s.starts_with("C:/"), "{s}");
        }
    }

    #[test]
    fn resolve_yields_nonempty_bytes_when_a_font_exists() {
        match FontResolver::resolve(false) {
            Ok(handle) => assert!(!handle.bytes().is_empty()),
            // A fontless host is acceptable for this test environment.
            Err(CardcastError::Font(_)) => {}
            Err(other) => panic!("unexpected error kind: {other}"),
        }
    }
}
