//! `concierge onboard`: First-time setup.

use concierge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let data_dir = AppConfig::default().store.data_dir();

    println!("Concierge - First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        println!("  Created data directory: {}", data_dir.display());
    }

    if config_path.exists() {
        println!("  Config file exists, leaving it alone: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Wrote default config: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Set GEMINI_API_KEY (or api_key in config.toml)");
    println!("    2. Optionally seed {}", data_dir.join(concierge_gateway::services::DIRECTORY_FILE).display());
    println!("    3. Run `concierge chat`");

    Ok(())
}
