use std::{path::Path, process::Command};

use tracing::warn;

use crate::error::{ResizeError, Result};

pub fn open_folder(path: &Path) {
    let command = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    if let Err(e) = Command::new(command).arg(path).spawn() {
        warn!("Could not open {}: {}", path.display(), e);
    }
}

/// Bytes needed to store `payload` bytes, with a 20% margin.
pub fn required_space(payload: u64) -> u64 {
    (payload as f64 * 1.2).ceil() as u64
}

/// Fails when `dir` does not have room for `payload` bytes plus margin.
/// Returns the required size in megabytes.
pub fn check_storage(dir: &Path, payload: u64) -> Result<f64> {
    let required = required_space(payload);
    let free_space = fs2::available_space(dir)?;

    if free_space < required {
        return Err(ResizeError::InsufficientStorage {
            required_mb: to_mb(required),
            available_mb: to_mb(free_space),
        });
    }

    Ok(to_mb(required))
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
