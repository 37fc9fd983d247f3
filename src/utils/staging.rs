use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Create the staging directory for downloaded attachments if needed.
/// Fails when a regular file already sits at that path.
pub fn prepare_staging_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_dir() {
        return Ok(dir.to_path_buf());
    }
    if dir.is_file() {
        anyhow::bail!(
            "cannot create staging directory {}: a file with that name exists",
            dir.display()
        );
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("create staging directory {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

/// Copy `src` into a new temp file under `staging_dir` and rewind it.
/// The file is deleted when the returned handle is dropped. Returns (file, bytes copied).
pub fn stage_to_temp(staging_dir: &Path, src: &mut dyn Read) -> io::Result<(NamedTempFile, u64)> {
    let mut staged = tempfile::Builder::new()
        .prefix("att-")
        .suffix(".bin")
        .tempfile_in(staging_dir)?;
    let len = io::copy(src, &mut staged)?;
    staged.flush()?;
    staged.seek(SeekFrom::Start(0))?;
    Ok((staged, len))
}

/// Remove the staging directory if nothing is left in it. Leftovers are kept for inspection.
pub fn remove_staging_dir_if_empty(dir: &Path) {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        let _ = fs::remove_dir(dir);
    }
}
