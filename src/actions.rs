use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

/// Deletes a file, or only reports what would be deleted on a dry run.
pub fn delete_file(path: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        eprintln!("Would delete: {}", path.display());
        return Ok(());
    }

    fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))?;
    info!("Deleted: {}", path.display());
    Ok(())
}
