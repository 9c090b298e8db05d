//! Config command implementation.

use anyhow::Result;
use console::style;

use qio_adapter_azure::{WorkspaceConfig, base_url_for_location};
use qio_core::AZURE_QUANTUM_TOKEN_VAR;

use super::common::load_config;

/// Execute the config command.
pub fn execute(config_path: Option<&str>) -> Result<()> {
    let source = match config_path {
        Some(path) => path.to_string(),
        None => WorkspaceConfig::default_path()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment only".to_string()),
    };
    let config = load_config(config_path)?;

    println!("{} Configuration from {}\n", style("→").cyan().bold(), style(source).dim());
    print!("{}", config.to_redacted_yaml()?);

    let endpoint = config
        .base_url
        .clone()
        .unwrap_or_else(|| base_url_for_location(&config.location));
    println!("\n  {:<10} {}", style("Endpoint:").bold(), endpoint);
    println!(
        "  {:<10} {}",
        style("Storage:").bold(),
        if config.storage.is_some() {
            "connection string"
        } else {
            "workspace linked storage"
        }
    );

    let token = if std::env::var(AZURE_QUANTUM_TOKEN_VAR).is_ok_and(|t| !t.is_empty()) {
        style("set").green()
    } else {
        style("not set").red()
    };
    println!("  {:<10} {} {}", style("Token:").bold(), AZURE_QUANTUM_TOKEN_VAR, token);

    Ok(())
}
