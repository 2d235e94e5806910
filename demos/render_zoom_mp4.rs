//! Render a sample card, then synthesize its zoom clip (requires `ffmpeg`).
//!
//! Run with: `cargo run --example render_zoom_mp4`

use cardcast::{CardGenerator, CardSpec, VideoGenerator, ZoomConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let spec = CardSpec {
        title: "Harbor Cleanup Volunteers Haul Two Tons Of Debris In One Weekend".to_string(),
        category: "Local".to_string(),
        image_source: None,
    };
    let card = CardGenerator::new().generate(&spec, "target/demo_card.png")?;
    println!("card written to {}", card.path.display());

    let generator = VideoGenerator::with_config(ZoomConfig {
        duration_s: 3,
        fps: 24,
        ..Default::default()
    });
    let video = generator.generate_with_progress(&card.path, "target/demo_card.mp4", |pct| {
        eprint!("\rencoding... {pct}%");
    })?;
    eprintln!();
    println!(
        "video written to {} ({} frames)",
        video.path.display(),
        video.frame_count
    );
    Ok(())
}
