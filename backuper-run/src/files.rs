//! File measurements reported in the run log.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, RunFailure};

const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Human-readable size: bytes below 1 KiB, otherwise one decimal.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Size of the file at `path`.
pub fn size_of(path: &Path) -> Result<u64, RunFailure> {
    Ok(std::fs::metadata(path).map_err(|e| io_err(path, e))?.len())
}

/// Hex SHA-256 of the file at `path`, streamed.
pub fn file_digest(path: &Path) -> Result<String, RunFailure> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}
