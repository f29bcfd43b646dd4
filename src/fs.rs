//! File system utilities.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes content to a file atomically using a temp file and rename.
///
/// The temp file lives in the target's directory so the rename stays on one
/// filesystem. It is removed when dropped, so a failed write never leaves it
/// behind and never touches the existing file.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    temp.write_all(content.as_bytes())
        .context("Failed to write temp file")?;
    temp.as_file().sync_all().context("Failed to sync temp file")?;

    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
