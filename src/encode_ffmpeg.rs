//! MP4 encoding via a spawned system `ffmpeg` process.
//!
//! Card frames are opaque rgb24 and are piped as rawvideo on stdin; output is
//! libx264 / yuv420p with `+faststart`. No scaling or padding filter is ever
//! applied, so output dimensions always equal the card dimensions. The system
//! binary is used rather than FFmpeg library bindings to avoid native dev
//! header/lib requirements.

use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::error::{CardcastError, CardcastResult};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> CardcastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CardcastError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(CardcastError::validation("encode fps must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // yuv420p output subsamples chroma 2x2.
            return Err(CardcastError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> CardcastResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    frame_len: usize,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> CardcastResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(CardcastError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // A generation call silently replaces whatever was at the output path.
        cmd.arg("-y");

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            CardcastError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CardcastError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            frame_len: (cfg.width as usize) * (cfg.height as usize) * 3,
            cfg,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn config(&self) -> &EncodeConfig {
        &self.cfg
    }

    /// Append one opaque rgb24 frame in row-major order.
    pub fn write_frame(&mut self, rgb: &[u8]) -> CardcastResult<()> {
        if rgb.len() != self.frame_len {
            return Err(CardcastError::validation(format!(
                "frame byte length mismatch: got {}, expected {} ({}x{}x3)",
                rgb.len(),
                self.frame_len,
                self.cfg.width,
                self.cfg.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CardcastError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(rgb).map_err(|e| {
            CardcastError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    /// Close the stream and wait for ffmpeg to finish the container.
    pub fn finish(mut self) -> CardcastResult<()> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().map_err(|e| {
            CardcastError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CardcastError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        let base = EncodeConfig {
            width: 64,
            height: 64,
            fps: 24,
            out_path: PathBuf::from("out.mp4"),
        };
        assert!(base.validate().is_ok());

        assert!(
            EncodeConfig {
                width: 0,
                ..base.clone()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                height: 0,
                ..base.clone()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                fps: 0,
                ..base.clone()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                width: 63,
                ..base.clone()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                height: 33,
                ..base
            }
            .validate()
            .is_err()
        );
    }
}
