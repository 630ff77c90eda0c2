//! Thin wrappers around the external tools and files the parsers consume.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::hardware::error::{InventoryError, Result};

pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args`, failing on a non-zero exit status.
pub fn run_tool(program: &Path, args: &[&str]) -> Result<ToolOutput> {
    debug!(program = %program.display(), ?args, "running inventory tool");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| InventoryError::Io {
            path: program.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(InventoryError::CommandFailed {
            program: program.display().to_string(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Stdout of a successful run, stderr discarded.
pub fn run_stdout(program: &Path, args: &[&str]) -> Result<String> {
    run_tool(program, args).map(|output| output.stdout)
}

pub fn read_text(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "reading inventory source");
    fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}
