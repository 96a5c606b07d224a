use anyhow::Context;
use beanstalk_core::config::{Config, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(config_path)
        .with_context(|| format!("cannot read {}", config_path.display()))?;
    let config = Config::parse(&data).context("failed to parse config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "accounts": config.accounts.len(),
            "cron": config.cron.enabled,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if warnings.is_empty() {
        println!(
            "Config is valid. {} account(s), schedule {}.",
            config.accounts.len(),
            if config.cron.enabled { "enabled" } else { "disabled" }
        );
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
