//! Normalize command

use anyhow::{Context, Result};
use sticker_gen::StickerConfig;
use sticker_pack::Canvas;

pub fn run(input: &str, output: &str) -> Result<()> {
    let config = StickerConfig::load().context("Failed to load configuration")?;
    let (width, height) = config.canvas_size();

    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input))?;
    let png = Canvas::new(width, height)
        .normalize_png(&bytes)
        .with_context(|| format!("Failed to normalize {}", input))?;
    std::fs::write(output, png).with_context(|| format!("Failed to write {}", output))?;

    println!("Wrote {} ({}x{})", output, width, height);
    Ok(())
}
