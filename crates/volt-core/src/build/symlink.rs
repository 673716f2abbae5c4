use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::debug;
use volt_domain::{FileMap, RepoEntry, RepoKind, VoltPaths};

use super::{copy::copy_pinned_tree, generate_helptags, now_rfc3339, Materialized, Materializer};
use crate::fsutil;
use crate::gitutil;

/// Reference-in-place strategy: the destination is a symlink (directory
/// junction on Windows) to the source tree. A bare repository has nothing to
/// link to, so it falls back to the pinned object-database copy.
pub(crate) struct SymlinkMaterializer;

impl Materializer for SymlinkMaterializer {
    fn materialize(
        &self,
        paths: &VoltPaths,
        vim: &Path,
        entry: &RepoEntry,
        _dirty: bool,
    ) -> Result<Materialized> {
        let src = paths.full_repos_path(&entry.path);
        let dst = paths.pack_repos_path(&entry.path);

        if entry.kind == RepoKind::Git {
            let repo = gitutil::open(&src)?;
            if repo.is_bare() {
                debug!("bare repository, copying from git objects: {}", entry.path);
                fsutil::remove_path(&dst)?;
                let files = copy_pinned_tree(&repo, &entry.version, &dst)?;
                generate_helptags(vim, &dst)?;
                return Ok(Materialized {
                    version: entry.version.clone(),
                    files,
                });
            }
        }

        replace_dir_link(&src, &dst)?;
        generate_helptags(vim, &dst)?;
        let version = match entry.kind {
            RepoKind::Git => entry.version.clone(),
            RepoKind::Static => now_rfc3339(),
        };
        Ok(Materialized {
            version,
            files: FileMap::new(),
        })
    }
}

/// Replaces `link` with a directory link pointing at `target`.
fn replace_dir_link(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fsutil::remove_path(link)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }

    #[cfg(windows)]
    {
        // Junctions do not require elevated privileges, unlike symlinks.
        let output = std::process::Command::new("cmd")
            .arg("/C")
            .arg("mklink")
            .arg("/J")
            .arg(link)
            .arg(target)
            .output()
            .context("failed to invoke cmd.exe for mklink")?;
        if !output.status.success() {
            anyhow::bail!(
                "failed to create junction {} -> {}: {}",
                link.display(),
                target.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
