//! Check that the external tools are installed.

use suncast_common::config::AppConfig;
use suncast_render_engine::{AnimationTools, ExternalTools};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Suncast System Check");
    println!("{}", "=".repeat(50));

    let tools = ExternalTools::new(config.render.clone());
    let status = tools.tool_status();
    for (tool, available) in &status {
        if *available {
            println!("[OK] {tool}");
        } else {
            println!("[MISSING] {tool} (not found in PATH)");
        }
    }

    println!();
    println!("Archive: {}", config.archive.base_url);
    println!(
        "Frames per animation: {} ({} cs apart)",
        config.archive.frame_limit, config.render.frame_delay_cs
    );

    println!();
    if tools.is_available() {
        println!("All required tools are available. Suncast is ready.");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Some required tools are missing. Install ImageMagick and gifsicle."
        ))
    }
}
