pub mod chat;
pub mod init;
pub mod run;
pub mod serve;

use plancanvas_config::AppConfig;
use plancanvas_core::provider::Provider;
use std::sync::Arc;

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The configured default provider. Fails early, with setup hints, when no
/// API key is available for a hosted provider.
fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PLANCANVAS_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!("  (run `plancanvas init` to create one)");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = plancanvas_providers::build_from_config(config);
    Ok(router.default().ok_or("No default provider configured")?)
}
