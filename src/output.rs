use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

pub fn render<T: Serialize>(data: &T, format: &str) -> Result<String> {
    let text = match format {
        "yaml" => serde_yaml::to_string(data)?,
        // "json" and "pretty" both print indented JSON
        _ => serde_json::to_string_pretty(data)?,
    };
    Ok(text)
}

pub fn output_data<T: Serialize>(data: &T, format: &str) -> Result<()> {
    println!("{}", render(data, format)?);
    Ok(())
}

/// `archinv_<unix timestamp>.json` in the working directory.
pub fn default_filename() -> PathBuf {
    PathBuf::from(format!("archinv_{}.json", chrono::Utc::now().timestamp()))
}

/// Write `data` as JSON indented with two spaces.
pub fn save_json<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        bail!("filename must be JSON, got {}", path.display());
    }
    let text = serde_json::to_string_pretty(data)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("\x1b[31m❌ Error: {}\x1b[0m", message);
}
