use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, StatusOptions};
use volt_domain::RepoKind;

pub(crate) enum PullOutcome {
    AlreadyUpToDate,
    FastForwarded,
}

pub(crate) fn open(path: &Path) -> Result<Repository> {
    Repository::open(path)
        .with_context(|| format!("failed to open repository {}", path.display()))
}

/// `Git` when the directory is a git repository (working or bare),
/// `Static` otherwise.
pub(crate) fn detect_kind(path: &Path) -> RepoKind {
    if Repository::open(path).is_ok() {
        RepoKind::Git
    } else {
        RepoKind::Static
    }
}

/// The 40-hex hash of the commit HEAD points at.
pub(crate) fn head_hash(repo: &Repository) -> Result<String> {
    let commit = repo
        .head()
        .context("failed to resolve HEAD")?
        .peel_to_commit()
        .context("HEAD does not point at a commit")?;
    Ok(commit.id().to_string())
}

/// Whether the working tree has no modified, staged, or untracked entries.
/// Bare repositories are always clean.
pub(crate) fn worktree_is_clean(repo: &Repository) -> Result<bool> {
    if repo.is_bare() {
        return Ok(true);
    }
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    let statuses = repo
        .statuses(Some(&mut opts))
        .context("failed to read worktree status")?;
    Ok(statuses.is_empty())
}

pub(crate) fn clone(url: &str, dst: &Path) -> Result<Repository> {
    RepoBuilder::new()
        .clone(url, dst)
        .with_context(|| format!("failed to clone {url}"))
}

/// Clones by shelling out to the `git` executable. Used as an opt-in
/// fallback (`get.fallback_git_cmd`) for remotes libgit2 cannot negotiate
/// with.
pub(crate) fn clone_with_git_cmd(url: &str, dst: &Path) -> Result<Repository> {
    let output = std::process::Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(dst)
        .output()
        .context("failed to run git")?;
    if !output.status.success() {
        bail!(
            "git clone {url} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    open(dst)
}

/// Fetches `origin` using its configured refspecs. Used for bare
/// repositories, where there is no working tree to advance.
pub(crate) fn fetch_origin(repo: &Repository) -> Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .context("repository has no 'origin' remote")?;
    remote
        .fetch(&[] as &[&str], None, None)
        .context("fetch from origin failed")?;
    Ok(())
}

/// Fetch plus fast-forward of the current branch. Rebase and merge commits
/// are out: diverged history is an error, matching a pull with rebase
/// disabled on a branch that only ever moves forward.
pub(crate) fn pull_fast_forward(repo: &Repository) -> Result<PullOutcome> {
    fetch_origin(repo)?;

    let fetch_head = repo
        .find_reference("FETCH_HEAD")
        .context("fetch produced no FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        return Ok(PullOutcome::AlreadyUpToDate);
    }
    if !analysis.is_fast_forward() {
        bail!("local history has diverged from origin");
    }

    let refname = repo
        .head()?
        .name()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("HEAD reference name is not valid UTF-8"))?;
    repo.find_reference(&refname)?
        .set_target(fetch_commit.id(), "volt: fast-forward")?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))
        .context("failed to check out fast-forwarded HEAD")?;
    Ok(PullOutcome::FastForwarded)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;

    use git2::{Repository, Signature};

    /// Initializes a working repository with one commit containing `files`.
    pub(crate) fn init_repo(path: &Path, files: &[(&str, &str)]) -> Repository {
        std::fs::create_dir_all(path).expect("create repo dir");
        let repo = Repository::init(path).expect("init repo");
        commit_files(&repo, files, "initial import");
        repo
    }

    pub(crate) fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) {
        let workdir = repo.workdir().expect("working repo").to_path_buf();
        for (rel, contents) in files {
            let file = workdir.join(rel);
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&file, contents).unwrap();
        }
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("volt-test", "volt-test@localhost").unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_git_and_static() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join("git");
        testutil::init_repo(&git_dir, &[("plugin/a.vim", "\" a")]);
        assert_eq!(detect_kind(&git_dir), RepoKind::Git);

        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(static_dir.join("plugin")).unwrap();
        assert_eq!(detect_kind(&static_dir), RepoKind::Static);
    }

    #[test]
    fn head_hash_is_forty_hex() {
        let dir = tempfile::tempdir().unwrap();
        let repo = testutil::init_repo(dir.path(), &[("a", "1")]);
        let hash = head_hash(&repo).unwrap();
        assert_eq!(hash.len(), 40);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn untracked_file_dirties_worktree() {
        let dir = tempfile::tempdir().unwrap();
        let repo = testutil::init_repo(dir.path(), &[("a", "1")]);
        assert!(worktree_is_clean(&repo).unwrap());
        std::fs::write(dir.path().join("scratch"), "x").unwrap();
        assert!(!worktree_is_clean(&repo).unwrap());
    }

    #[test]
    fn clone_from_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let upstream = dir.path().join("upstream");
        testutil::init_repo(&upstream, &[("plugin/a.vim", "\" a")]);

        let dst = dir.path().join("clone");
        let cloned = clone(upstream.to_str().unwrap(), &dst).unwrap();
        assert_eq!(
            head_hash(&cloned).unwrap(),
            head_hash(&open(&upstream).unwrap()).unwrap()
        );
    }

    #[test]
    fn pull_fast_forwards_and_reports_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let upstream_dir = dir.path().join("upstream");
        let upstream = testutil::init_repo(&upstream_dir, &[("a", "1")]);

        let local_dir = dir.path().join("local");
        let local = clone(upstream_dir.to_str().unwrap(), &local_dir).unwrap();
        assert!(matches!(
            pull_fast_forward(&local).unwrap(),
            PullOutcome::AlreadyUpToDate
        ));

        testutil::commit_files(&upstream, &[("a", "2")], "bump");
        assert!(matches!(
            pull_fast_forward(&local).unwrap(),
            PullOutcome::FastForwarded
        ));
        assert_eq!(
            head_hash(&local).unwrap(),
            head_hash(&upstream).unwrap()
        );
        assert_eq!(std::fs::read_to_string(local_dir.join("a")).unwrap(), "2");
    }
}
