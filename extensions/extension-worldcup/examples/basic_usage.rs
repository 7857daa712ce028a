//! Basic usage example for the World Cup extension
//!
//! Run with: cargo run --package extension-worldcup --example basic_usage

use blockpad_extension_core::prelude::*;
use extension_worldcup::{WorldCupConfig, WorldCupExtension};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    // Register the extension the way a host would at load time
    let mut registry = ExtensionRegistry::new();
    registry.register(WorldCupExtension::new(WorldCupConfig::default()))?;

    let descriptor = registry
        .descriptor_of("worldcup")
        .ok_or_else(|| anyhow::anyhow!("extension not registered"))?;

    println!("Extension: {}", descriptor.display_name);
    println!();

    // Show the palette entries this extension contributes
    println!("Blocks:");
    for block in &descriptor.blocks {
        println!("  [{}] {} (selector: {})", block.shape.code(), block.template, block.selector);
    }
    println!();

    println!("Menus:");
    for menu in &descriptor.menus {
        println!("  {} ({} options)", menu.name, menu.options.len());
    }
    println!();

    // Check the readiness handshake
    if let Some(status) = registry.status_of("worldcup") {
        println!("Status: {} ({})", status.light.code(), status.message);
    }
    println!();

    // Run the group block for a few codes
    for code in ["BRA", "GER", "KOR"] {
        match registry
            .invoke("worldcup", "get_group", &[code.to_string()])
            .await
        {
            Ok(Reply::Text(group)) => println!("Group of {}: {}", code, group),
            Ok(Reply::Empty) => println!("Group of {}: (no entry)", code),
            Err(e) => println!("Group of {} failed: {}", code, e),
        }
    }
    println!();

    // Run the match block for the opening fixture
    let args = vec!["Brazil".to_string(), "Croatia".to_string()];
    match registry.invoke("worldcup", "match_result", &args).await {
        Ok(Reply::Text(winner)) => println!("Brazil vs Croatia: {} won", winner),
        Ok(Reply::Empty) => println!("Brazil vs Croatia: not decided yet"),
        Err(e) => println!("Match lookup failed: {}", e),
    }

    // Tear the registry down the way a host would at unload time
    registry.shutdown_all();

    Ok(())
}
