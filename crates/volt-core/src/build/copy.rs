use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use git2::{ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use tracing::debug;
use volt_domain::{FileMap, RepoEntry, RepoKind, VoltPaths};

use super::{generate_helptags, now_rfc3339, Materialized, Materializer};
use crate::fsutil;
use crate::gitutil;

/// Content-copy strategy. Clean or bare git repositories are reproduced from
/// the object database at the locked commit; dirty working trees and static
/// repositories are copied file by file (hardlink first, byte copy on
/// fallback).
pub(crate) struct CopyMaterializer;

impl Materializer for CopyMaterializer {
    fn materialize(
        &self,
        paths: &VoltPaths,
        vim: &Path,
        entry: &RepoEntry,
        dirty: bool,
    ) -> Result<Materialized> {
        let src = paths.full_repos_path(&entry.path);
        let dst = paths.pack_repos_path(&entry.path);
        fsutil::remove_path(&dst)?;

        let materialized = match entry.kind {
            RepoKind::Git => {
                let repo = gitutil::open(&src)?;
                if repo.is_bare() || !dirty {
                    debug!("copy from git objects: {}", entry.path);
                    let files = copy_pinned_tree(&repo, &entry.version, &dst)?;
                    Materialized {
                        version: entry.version.clone(),
                        files,
                    }
                } else {
                    debug!("copy from filesystem: {}", entry.path);
                    copy_working_tree(&src, &dst)?;
                    // No per-file hashes: treat as always dirty next build.
                    Materialized {
                        version: entry.version.clone(),
                        files: FileMap::new(),
                    }
                }
            }
            RepoKind::Static => {
                let meta = fs::metadata(&src)
                    .with_context(|| format!("failed to stat {}", src.display()))?;
                if !meta.is_dir() {
                    bail!("failed to copy static directory: source is not a directory");
                }
                fsutil::link_or_copy_dir(&src, &dst)?;
                Materialized {
                    version: now_rfc3339(),
                    files: FileMap::new(),
                }
            }
        };

        generate_helptags(vim, &dst)?;
        Ok(materialized)
    }
}

/// Writes every blob of the tree named by `version` under `dst`, preserving
/// executable bits, and returns the relative-path -> blob-hash map. This
/// reproduces the pinned commit without touching the working tree.
pub(crate) fn copy_pinned_tree(
    repo: &Repository,
    version: &str,
    dst: &Path,
) -> Result<FileMap> {
    let oid = Oid::from_str(version)
        .with_context(|| format!("locked revision {version:?} is not a commit hash"))?;
    let commit = repo
        .find_commit(oid)
        .with_context(|| format!("failed to get commit object {version}"))?;
    let tree = commit.tree().context("failed to get commit tree")?;

    let mut files = FileMap::new();
    let mut failure: Option<anyhow::Error> = None;
    let walk_result = tree.walk(TreeWalkMode::PreOrder, |root, item| {
        if item.kind() != Some(ObjectType::Blob) {
            return TreeWalkResult::Ok;
        }
        let Some(name) = item.name() else {
            failure = Some(anyhow::anyhow!("tree entry name is not valid UTF-8"));
            return TreeWalkResult::Abort;
        };
        let rel = format!("{root}{name}");
        match write_blob(repo, item.id(), item.filemode(), &dst.join(&rel)) {
            Ok(()) => {
                files.insert(rel, item.id().to_string());
                TreeWalkResult::Ok
            }
            Err(err) => {
                failure = Some(err.context(format!("failed to write {rel}")));
                TreeWalkResult::Abort
            }
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    walk_result.context("failed to walk commit tree")?;
    Ok(files)
}

fn write_blob(repo: &Repository, id: Oid, filemode: i32, file: &Path) -> Result<()> {
    let blob = repo.find_blob(id)?;
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, blob.content())?;
    #[cfg(unix)]
    if filemode & 0o111 != 0 {
        use std::os::unix::fs::PermissionsExt as _;
        fs::set_permissions(file, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = filemode;
    Ok(())
}

/// Top-level copy of a working tree, skipping `.git`, `.gitignore`, and
/// special file types.
fn copy_working_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read {}", src.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" || name == ".gitignore" {
            continue;
        }
        let file_type = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(&name);
        if file_type.is_dir() {
            fsutil::link_or_copy_dir(&from, &to)?;
        } else if file_type.is_file() {
            fsutil::link_or_copy_file(&from, &to)?;
        }
    }
    Ok(())
}
