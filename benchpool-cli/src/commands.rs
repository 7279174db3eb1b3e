use anyhow::{Context, Result};
use benchpool_transport::AppConfig;
use std::path::PathBuf;

pub fn execute_config(config: Option<PathBuf>, write: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;

    match write {
        Some(path) => {
            config
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", rendered);
        }
    }
    Ok(())
}
