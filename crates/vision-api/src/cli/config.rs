//! `vision config` command: print the effective configuration.

use anyhow::Result;
use console::style;

use vision_types::config::AppConfig;

const REDACTED: &str = "[REDACTED]";

/// Copy of `config` with every secret replaced by a marker.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.auth.token.is_some() {
        shown.auth.token = Some(REDACTED.to_string());
    }
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some(REDACTED.to_string());
    }
    shown
}

/// Display the merged configuration (defaults, file, environment).
pub fn show_config(config: &AppConfig, json: bool) -> Result<()> {
    let shown = redacted(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Vision v{} effective configuration",
        style("⚙").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    for line in toml::to_string_pretty(&shown)?.lines() {
        println!("  {line}");
    }
    println!();
    Ok(())
}
