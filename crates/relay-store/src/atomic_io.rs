use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, Context, Result};

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Replaces the snapshot at `path` in one rename.
///
/// The new content is staged in a sibling file and flushed to disk first, so
/// a crash leaves either the previous snapshot or the new one.
pub fn replace_file_contents(path: &Path, content: &str) -> Result<()> {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("snapshot path '{}' has no file name", path.display());
    };
    if path.is_dir() {
        bail!("snapshot path '{}' is a directory", path.display());
    }

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .with_context(|| format!("cannot create snapshot directory {}", directory.display()))?;

    let staging = staging_path(directory, file_name);
    if let Err(error) = stage(&staging, content) {
        let _ = std::fs::remove_file(&staging);
        return Err(error);
    }
    if let Err(error) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(error).with_context(|| {
            format!("cannot move staged snapshot into {}", path.display())
        });
    }
    Ok(())
}

fn staging_path(directory: &Path, file_name: &str) -> PathBuf {
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    directory.join(format!(
        ".{file_name}.staging-{}-{sequence}",
        std::process::id()
    ))
}

fn stage(staging: &Path, content: &str) -> Result<()> {
    let mut file = File::create(staging)
        .with_context(|| format!("cannot create staging file {}", staging.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("cannot write staging file {}", staging.display()))?;
    file.sync_all()
        .with_context(|| format!("cannot flush staging file {}", staging.display()))
}
