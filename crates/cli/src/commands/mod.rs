pub mod chat;
pub mod ingest;
pub mod init;
pub mod serve;

use std::sync::Arc;

use ikms_config::AppConfig;
use ikms_core::Provider;

/// Load config and resolve the default provider, failing early without a key.
pub(crate) fn load_provider() -> Result<(AppConfig, Arc<dyn Provider>), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    IKMS_API_KEY=sk-...     (generic)");
        eprintln!("    OPENAI_API_KEY=sk-...   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = ikms_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    Ok((config, provider))
}
