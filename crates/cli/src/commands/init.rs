//! `plancanvas init`: write the default config file.

use plancanvas_config::AppConfig;
use std::path::Path;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_path();

    println!("plancanvas setup");
    println!("================\n");

    if write_default_config(&config_path, force)? {
        println!("Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("   2. Run: plancanvas run \"add a source A and a sink B, connect A to B\"");
        println!("   3. Or start the gateway: plancanvas serve\n");
    } else {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force to overwrite.\n");
    }

    Ok(())
}

/// Write the default config to `path`, creating parent directories.
/// Returns `false` when the file exists and `force` is off.
fn write_default_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
