//! Provider catalog command

use anyhow::Result;
use sticker_gen::provider_catalog;

pub fn run(format: &str) -> Result<()> {
    let catalog = provider_catalog();
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&catalog)?),
        "text" => {
            for info in &catalog {
                println!("{:<10} {:<18} {}", info.id, info.display_name, info.models.join(", "));
            }
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
    Ok(())
}
