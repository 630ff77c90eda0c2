//! Byte size conversion between raw counts and human readable strings.

use thiserror::Error;

const SIZE_NAMES: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const UNIT_SUFFIXES: [char; 7] = ['B', 'K', 'M', 'G', 'T', 'P', 'E'];

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("invalid size unit in {0:?}, supported units are B, K, M, G, T, P, E")]
    InvalidUnit(String),
    #[error("invalid numeric value in {0:?}")]
    InvalidNumber(String),
    #[error("byte count cannot be negative: {0}")]
    Negative(i64),
}

/// Render a byte count using 1024-based units, e.g. `1536` -> `"1.5 KB"`.
pub fn bytes_to_human(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    // floor(log_1024(bytes)) without going through floating point logs
    let mut index = 0usize;
    let mut divisor: u128 = 1;
    while index + 1 < SIZE_NAMES.len() && (bytes as u128) >= divisor * 1024 {
        divisor *= 1024;
        index += 1;
    }

    let value = ((bytes as f64 / divisor as f64) * 100.0).round() / 100.0;
    if value.fract() == 0.0 {
        format!("{} {}", value as u64, SIZE_NAMES[index])
    } else {
        format!("{} {}", value, SIZE_NAMES[index])
    }
}

/// A signed count reported by a tool, rejected when negative.
pub fn byte_count(value: i64) -> Result<u64, UnitError> {
    u64::try_from(value).map_err(|_| UnitError::Negative(value))
}

/// Parse strings like `"2K"`, `"1.5M"` or `"1024.00M"` into bytes.
pub fn human_to_bytes(input: &str) -> Result<u64, UnitError> {
    let normalized = input.trim().to_uppercase();
    let unit = normalized
        .chars()
        .last()
        .ok_or_else(|| UnitError::InvalidUnit(input.to_string()))?;
    let power = UNIT_SUFFIXES
        .iter()
        .position(|&suffix| suffix == unit)
        .ok_or_else(|| UnitError::InvalidUnit(input.to_string()))?;

    let numeric = normalized[..normalized.len() - unit.len_utf8()].trim();
    let value: f64 = numeric
        .parse()
        .map_err(|_| UnitError::InvalidNumber(input.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(UnitError::InvalidNumber(input.to_string()));
    }

    Ok((value * 1024f64.powi(power as i32)) as u64)
}
