//! `adpilot tools`

use crate::app;

pub async fn run() -> anyhow::Result<()> {
    let config = app::load_config()?;
    let store = app::build_store(&config)?;
    let llm = app::init::build_llm(&config).ok();
    let generation = llm.is_some();
    let registry = app::build_registry(&config, store, llm)?;

    println!("🧰 Available tools ({})\n", registry.len());
    for definition in registry.list_definitions() {
        println!(
            "  {:<24} [{}] {}",
            definition.name(),
            definition.category(),
            definition.description
        );
    }

    if !generation {
        println!("\nℹ️  Generation tools need OPENAI_API_KEY.");
    }
    if std::env::var("TAVILY_API_KEY").is_err() {
        println!("ℹ️  web_search needs TAVILY_API_KEY.");
    }
    Ok(())
}
