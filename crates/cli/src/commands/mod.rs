pub mod chat;
pub mod doctor;
pub mod gateway;
pub mod onboard;
pub mod tools;

use concierge_config::AppConfig;

/// Load and validate the configuration, with a readable error.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.validate().map_err(|e| format!("Invalid config: {e}"))?;
    Ok(config)
}
