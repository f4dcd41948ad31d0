//! `concierge doctor`: Diagnose system health.

use concierge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Concierge Doctor - System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file found");
    } else {
        println!("  [warn] No config file, using defaults - run `concierge onboard`");
    }

    let config = match AppConfig::load().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured");
    } else {
        println!("  [fail] No API key - set GEMINI_API_KEY or api_key in config.toml");
        issues += 1;
    }

    let data_dir = config.store.data_dir();
    if config.store.backend == "memory" {
        println!("  [ok]   In-memory store (history is not persisted)");
    } else if data_dir.exists() {
        println!("  [ok]   Data directory exists: {}", data_dir.display());
    } else {
        println!("  [warn] Data directory will be created on first write: {}", data_dir.display());
    }

    let router = concierge_providers::build_from_config(&config);
    match router.default() {
        Some(provider) if config.has_api_key() => match provider.health_check().await {
            Ok(true) => println!("  [ok]   Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  [fail] Provider '{}' unhealthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  [fail] Provider '{}': {e}", provider.name());
                issues += 1;
            }
        },
        Some(_) => println!("  [skip] Provider check needs an API key"),
        None => {
            println!("  [fail] No provider named '{}'", router.default_name());
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
