//! Render a sample card to `target/demo_card.png`.
//!
//! Run with: `cargo run --example render_card [image-url-or-path]`

use cardcast::{CardGenerator, CardSpec};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let image_source = std::env::args().nth(1);
    let spec = CardSpec {
        title: "City Council Approves New Transit Plan After Marathon Session".to_string(),
        category: "News".to_string(),
        image_source,
    };

    let mut generator = CardGenerator::new();
    let card = generator.generate(&spec, "target/demo_card.png")?;
    println!(
        "card written to {} ({}x{})",
        card.path.display(),
        card.image.width(),
        card.image.height()
    );
    Ok(())
}
