//! `tranche config` command implementation

use colored::Colorize;
use std::path::Path;

use crate::config::{Config, KEYS};
use crate::error::Result;

pub fn get(config: &Config, key: &str) -> Result<()> {
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a key in the file at `path`. Environment overrides are not written.
pub fn set(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_from(path)?;
    config.set(key, value)?;
    config.save_to(path)?;
    println!("{} {} updated in {}", "✓".green(), key, path.display());
    Ok(())
}

pub fn show(config: &Config, path: &Path) -> Result<()> {
    println!("{}", "Tranche Configuration:".cyan().bold());
    println!("  {}", path.display().to_string().dimmed());
    println!();
    for key in KEYS {
        let value = config.get(key)?;
        let value = if value.is_empty() {
            "(not set)".dimmed().to_string()
        } else {
            value
        };
        println!("  {:<24} {}", format!("{key}:"), value);
    }
    Ok(())
}
