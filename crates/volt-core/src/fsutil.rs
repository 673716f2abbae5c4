use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context as _, Result};

/// Writes `contents` via a sibling temp file, fsync, rename.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Hardlink `src` to `dst`, falling back to a byte copy when the link fails
/// (cross-device, unsupported filesystem).
pub(crate) fn link_or_copy_file(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        fs::remove_file(dst)
            .with_context(|| format!("failed to replace {}", dst.display()))?;
    }
    if fs::hard_link(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Recursively realizes `src` under `dst` with [`link_or_copy_file`] per
/// regular file. Symlinks, pipes, sockets and devices are skipped.
pub(crate) fn link_or_copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if file_type.is_dir() {
            link_or_copy_dir(&from, &to)?;
        } else if file_type.is_file() {
            link_or_copy_file(&from, &to)?;
        }
    }
    Ok(())
}

/// Removes empty ancestors of `start`, never ascending past `root` and
/// stopping at the first non-empty directory.
pub(crate) fn remove_dirs_upward(start: &Path, root: &Path) {
    let mut current = start;
    while current != root && current.starts_with(root) {
        match fs::read_dir(current) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return;
                }
                if fs::remove_dir(current).is_err() {
                    return;
                }
            }
            _ => return,
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return,
        }
    }
}

/// Removes whatever occupies `path`: a directory tree, a regular file, or a
/// link. A directory link is removed without following it, so the target
/// tree is untouched. Missing paths are fine.
pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stat {}", path.display()))
        }
    };
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        fs::remove_file(path)
            .or_else(|_| fs::remove_dir(path))
            .with_context(|| format!("failed to remove link {}", path.display()))?;
    } else if file_type.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}
