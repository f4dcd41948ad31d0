//! `concierge chat`: Interactive or single-message chat mode.

use std::io::Write;

use concierge_agent::TurnResult;
use concierge_gateway::Services;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(
    message: Option<String>,
    user_id: String,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY      (or GOOGLE_AI_API_KEY)");
        eprintln!("    CONCIERGE_API_KEY   (takes precedence)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", concierge_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let services = Services::from_config(&config)?;
    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    debug!(user_id = %user_id, session_id = %session_id, "Chat session started");

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let result = services.chat(&user_id, &session_id, &msg).await;
        eprint!("\r              \r");
        print_reply(&result);
        return Ok(());
    }

    println!();
    println!("  Concierge - Interactive Mode");
    println!();
    println!("  Model:     {}", services.orchestrator.model());
    println!("  Tools:     {}", services.orchestrator.tools().names().join(", "));
    println!("  Session:   {session_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let result = services.chat(&user_id, &session_id, line).await;
        eprint!("\r     \r");
        println!();
        print_reply(&result);
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_reply(result: &TurnResult) {
    for line in result.text.lines() {
        println!("  Assistant > {line}");
    }
    for call in &result.tool_calls {
        println!("    [{}] {} ({}ms)", call.name, call.output, call.duration_ms);
    }
}
