use anyhow::{Context, Result};
use log::warn;
use std::fs::{self, File};
use std::hash::Hasher as _;
use std::io::{ErrorKind, Read};
use std::path::Path;
use twox_hash::XxHash64;

/// Bytes read per chunk; memory use stays fixed regardless of file size.
const CHUNK_SIZE: usize = 256 * 1024;

/// Streams a file through XxHash64.
pub fn try_compute(path: &Path) -> Result<u64> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        hasher.write(&buffer[..read]);
    }
    Ok(hasher.finish())
}

/// Content digest of a file, or `None` when it cannot be read.
pub fn compute(path: &Path) -> Option<u64> {
    match try_compute(path) {
        Ok(digest) => Some(digest),
        Err(e) => {
            warn!("{:#}", e);
            None
        }
    }
}

/// Length of a regular file, `None` if it is absent or cannot be stat'ed.
pub fn file_length(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Deterministic hash of a path string, used to bucket files whose length is
/// zero or unknown.
pub fn path_key(path: &Path) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(path.to_string_lossy().as_bytes());
    hasher.finish()
}
