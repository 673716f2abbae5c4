use std::fs;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, Context as _, Result};
use tracing::{debug, warn};
use volt_domain::{RepoId, RepoKind, VoltPaths};

use crate::fsutil;
use crate::gitutil::{self, PullOutcome};
use crate::plugconf;

/// Targets and hints for one acquisition run.
#[derive(Clone, Debug)]
pub struct AcquireRequest {
    pub targets: Vec<RepoId>,
    pub upgrade: bool,
}

/// Per-unit knobs taken from config.toml.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct AcquireOptions {
    pub create_plugconf: bool,
    pub fallback_git_cmd: bool,
}

/// What one work unit did to its repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Fresh clone into the source tree.
    Installed,
    /// The source directory was already present and no upgrade was asked.
    AlreadyExists,
    /// Fetch/pull moved HEAD.
    Upgraded { from: String },
    /// Fetch/pull found nothing new.
    NoChange,
}

/// Result of one per-repository work unit. `errors` non-empty means the unit
/// failed and rolled back; `head` is the post-acquisition HEAD for git repos.
#[derive(Clone, Debug)]
pub(crate) struct UnitResult {
    pub repo: RepoId,
    pub kind: RepoKind,
    pub head: Option<String>,
    pub outcome: AcquireOutcome,
    pub errors: Vec<String>,
}

impl UnitResult {
    pub(crate) fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Clones or updates every target in parallel. Each unit owns its
/// destination directory and a unique temp directory, so units share no
/// mutable state; results are collected once the pool drains. Completion
/// order is nondeterministic — callers sort before reporting.
pub(crate) fn acquire(
    paths: &VoltPaths,
    request: &AcquireRequest,
    options: AcquireOptions,
) -> Vec<UnitResult> {
    if request.targets.is_empty() {
        return Vec::new();
    }

    let worker_count = thread::available_parallelism()
        .map_or(4, std::num::NonZeroUsize::get)
        .min(request.targets.len());

    let (job_tx, job_rx) = mpsc::channel();
    for target in &request.targets {
        job_tx.send(target.clone()).expect("queue acquisition jobs");
    }
    drop(job_tx);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let (result_tx, result_rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let paths = paths.clone();
        let upgrade = request.upgrade;
        handles.push(thread::spawn(move || loop {
            let target = {
                let guard = job_rx.lock().expect("lock job receiver");
                match guard.recv() {
                    Ok(target) => target,
                    Err(_) => break,
                }
            };
            let result = run_unit(&paths, target, upgrade, options);
            if result_tx.send(result).is_err() {
                break;
            }
        }));
    }
    drop(result_tx);

    let mut results: Vec<UnitResult> = result_rx.iter().collect();
    for handle in handles {
        let _ = handle.join();
    }
    results.sort_by(|a, b| a.repo.cmp(&b.repo));
    results
}

fn run_unit(
    paths: &VoltPaths,
    repo: RepoId,
    upgrade: bool,
    options: AcquireOptions,
) -> UnitResult {
    let dst = paths.full_repos_path(&repo);
    let existed = dst.exists();

    let attempt = if existed && upgrade {
        upgrade_repo(paths, &repo)
    } else if existed {
        Ok(AcquireOutcome::AlreadyExists)
    } else {
        install_repo(paths, &repo, options.fallback_git_cmd)
            .map(|()| AcquireOutcome::Installed)
    };

    let outcome = match attempt {
        Ok(outcome) => outcome,
        Err(err) => return fail_unit(paths, &repo, existed, err),
    };

    let kind = gitutil::detect_kind(&dst);
    let head = if kind == RepoKind::Git {
        match gitutil::open(&dst).and_then(|r| gitutil::head_hash(&r)) {
            Ok(head) => Some(head),
            Err(err) => {
                let err = err.context("failed to get HEAD commit hash");
                return fail_unit(paths, &repo, existed, err);
            }
        }
    } else {
        None
    };

    // Plug-config installation must not sink the unit; the repository itself
    // landed fine.
    if options.create_plugconf {
        if let Err(err) = plugconf::install_skeleton(paths, &repo) {
            warn!("failed to install plugconf for {repo}: {err:#}");
        }
    }

    UnitResult {
        repo,
        kind,
        head,
        outcome,
        errors: Vec::new(),
    }
}

fn install_repo(paths: &VoltPaths, repo: &RepoId, fallback_git_cmd: bool) -> Result<()> {
    if repo.is_local() {
        bail!(
            "local repository does not exist: create {} first",
            paths.full_repos_path(repo).display()
        );
    }
    debug!("installing {repo} ...");

    let temp_root = paths.temp_dir();
    fs::create_dir_all(&temp_root)
        .with_context(|| format!("failed to create {}", temp_root.display()))?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("{}-", repo.name()))
        .tempdir_in(&temp_root)
        .context("failed to create scratch clone directory")?;

    // Clone into scratch first; the final directory appears atomically or
    // not at all (a killed clone leaves only garbage under tmp/).
    let clone_dst = scratch.path().join(repo.name());
    let url = repo.clone_url();
    if let Err(err) = gitutil::clone(&url, &clone_dst) {
        if !fallback_git_cmd {
            return Err(err);
        }
        warn!("{err:#}; retrying with the git command");
        fsutil::remove_path(&clone_dst)?;
        gitutil::clone_with_git_cmd(&url, &clone_dst)?;
    }

    let dst = paths.full_repos_path(repo);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if dst.exists() {
        bail!("repository exists: {}", dst.display());
    }
    fs::rename(&clone_dst, &dst)
        .with_context(|| format!("failed to move clone into {}", dst.display()))?;
    Ok(())
}

fn upgrade_repo(paths: &VoltPaths, repo: &RepoId) -> Result<AcquireOutcome> {
    let dst = paths.full_repos_path(repo);
    let git_repo = match gitutil::open(&dst) {
        Ok(git_repo) => git_repo,
        // Static repositories are ignored by upgrades.
        Err(_) => return Ok(AcquireOutcome::AlreadyExists),
    };
    debug!("upgrading {repo} ...");

    let from = gitutil::head_hash(&git_repo).context("failed to get HEAD commit hash")?;
    if git_repo.is_bare() {
        gitutil::fetch_origin(&git_repo)?;
        let to = gitutil::head_hash(&git_repo)?;
        if to == from {
            return Ok(AcquireOutcome::NoChange);
        }
        return Ok(AcquireOutcome::Upgraded { from });
    }

    match gitutil::pull_fast_forward(&git_repo)? {
        PullOutcome::AlreadyUpToDate => Ok(AcquireOutcome::NoChange),
        PullOutcome::FastForwarded => Ok(AcquireOutcome::Upgraded { from }),
    }
}

/// Rollback: the unit's destination directory is removed and empty ancestors
/// pruned up to (never past) the repos root.
fn fail_unit(
    paths: &VoltPaths,
    repo: &RepoId,
    existed_before: bool,
    err: anyhow::Error,
) -> UnitResult {
    let mut errors = vec![format!("{err:#}")];
    let dst = paths.full_repos_path(repo);
    if dst.exists() {
        debug!("rolling back {} ...", dst.display());
        match fs::remove_dir_all(&dst) {
            Ok(()) => {
                if let Some(parent) = dst.parent() {
                    fsutil::remove_dirs_upward(parent, &paths.repos_dir());
                }
            }
            Err(remove_err) => {
                errors.push(format!(
                    "rollback failed: cannot remove '{}': {remove_err}",
                    dst.display()
                ));
            }
        }
    }
    let verb = if existed_before { "upgrade" } else { "install" };
    errors[0] = format!("{verb} failed > {}", errors[0]);
    UnitResult {
        repo: repo.clone(),
        kind: RepoKind::Git,
        head: None,
        outcome: AcquireOutcome::Installed,
        errors,
    }
}
