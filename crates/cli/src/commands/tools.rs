//! `concierge tools`: List the tools declared to the model.

use concierge_gateway::Services;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let services = Services::from_config(&config)?;
    let tools = services.orchestrator.tools();

    println!("Registered tools ({})", tools.len());
    println!("=====================");
    for declaration in tools.declarations() {
        let kind = if declaration.side_effect_free { "read-only" } else { "writes" };
        println!();
        println!("  {} [{kind}]", declaration.name);
        println!("    {}", declaration.description);
        if let Some(required) = declaration.input_schema["required"].as_array() {
            let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
            println!("    required: {}", names.join(", "));
        }
    }

    Ok(())
}
