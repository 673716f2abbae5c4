mod copy;
mod symlink;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::SystemTime;

use anyhow::{anyhow, bail, Context as _, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use volt_domain::{
    BuildManifest, FileMap, LockDocument, ManifestEntry, Profile, RepoEntry, RepoId, RepoKind,
    VoltPaths,
};

use crate::config::Strategy;
use crate::context::CommandContext;
use crate::fsutil;
use crate::gitutil;
use crate::plugconf;

/// Output of one materialization: what goes into the manifest entry.
pub(crate) struct Materialized {
    pub version: String,
    pub files: FileMap,
}

/// Per-repository materialization strategy. Implementations must leave the
/// destination usable on success; the engine removes it on error.
pub(crate) trait Materializer {
    fn materialize(
        &self,
        paths: &VoltPaths,
        vim: &Path,
        entry: &RepoEntry,
        dirty: bool,
    ) -> Result<Materialized>;
}

fn materializer(strategy: Strategy) -> &'static dyn Materializer {
    match strategy {
        Strategy::Symlink => &symlink::SymlinkMaterializer,
        Strategy::Copy => &copy::CopyMaterializer,
    }
}

/// Per-repo failures of an otherwise completed build pass.
#[derive(Debug, Default)]
pub(crate) struct BuildSummary {
    pub errors: Vec<String>,
}

enum WorkUnit {
    Materialize { entry: RepoEntry, dirty: bool },
    Remove { id: RepoId },
}

enum UnitOutput {
    Materialized(ManifestEntry),
    Removed(RepoId),
}

/// Reconciles the runtime tree under `pack/volt/start` with the declared
/// lock document. `full` ignores the previous manifest and re-materializes
/// every active repository.
pub(crate) fn run(ctx: &CommandContext, full: bool) -> Result<BuildSummary> {
    let paths = ctx.paths();
    let vim = ctx.vim_executable()?;

    let lock = LockDocument::load(&paths.lock_json())
        .context("could not read lock.json")?;
    let prev = if full {
        BuildManifest::default()
    } else {
        BuildManifest::load(&paths.build_info_json())?
    };

    let start_dir = paths.start_dir();
    fs::create_dir_all(&start_dir)
        .with_context(|| format!("failed to create {}", start_dir.display()))?;

    let active: Vec<RepoEntry> = lock.active_repos().into_iter().cloned().collect();
    let mut units = plan_orphan_removals(&start_dir, &active)?;
    let mut failures: Vec<(RepoId, String)> = Vec::new();

    for entry in &active {
        let src = paths.full_repos_path(&entry.path);
        if !src.exists() {
            failures.push((
                entry.path.clone(),
                format!("no repository was installed: {}", src.display()),
            ));
            continue;
        }
        let dirty = entry_is_dirty(paths, entry);
        if needs_rebuild(full, entry, prev.find(&entry.path), &src, dirty) {
            units.push(WorkUnit::Materialize {
                entry: entry.clone(),
                dirty,
            });
        } else {
            debug!("no change, skipping {}", entry.path);
        }
    }

    let (outputs, unit_failures) =
        dispatch(paths, &vim, ctx.config().strategy, units);
    failures.extend(unit_failures);

    let mut manifest = prev;
    for output in &outputs {
        match output {
            UnitOutput::Materialized(entry) => manifest.upsert(entry.clone()),
            UnitOutput::Removed(id) => manifest.remove(id),
        }
    }
    // A failed repository has no destination directory anymore; its stale
    // manifest entry must go with it or the next build would skip it.
    for (id, _) in &failures {
        manifest.remove(id);
    }

    if !outputs.is_empty() {
        install_rc_files(paths, lock.current_profile())?;
        write_bundled_plugconf(paths, &active)?;
        link_ftdetect_files(paths, &active)?;
        manifest
            .save(&paths.build_info_json())
            .context("could not write build-info.json")?;
    }

    Ok(BuildSummary {
        errors: failures
            .into_iter()
            .map(|(id, err)| format!("failed to build repository '{id}': {err}"))
            .collect(),
    })
}

/// Directories under the runtime tree that decode to a repository id not in
/// the active set are scheduled for removal. Names that do not decode (the
/// shared `system` directory) are left alone.
fn plan_orphan_removals(start_dir: &Path, active: &[RepoEntry]) -> Result<Vec<WorkUnit>> {
    let mut units = Vec::new();
    for dir_entry in fs::read_dir(start_dir)
        .with_context(|| format!("failed to read {}", start_dir.display()))?
    {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name();
        let Ok(id) = RepoId::decode_pack_name(&name.to_string_lossy()) else {
            continue;
        };
        if !active.iter().any(|e| e.path == id) {
            units.push(WorkUnit::Remove { id });
        }
    }
    Ok(units)
}

fn entry_is_dirty(paths: &VoltPaths, entry: &RepoEntry) -> bool {
    if entry.kind != RepoKind::Git {
        return false;
    }
    let src = paths.full_repos_path(&entry.path);
    let Ok(repo) = gitutil::open(&src) else {
        return false;
    };
    if let Ok(head) = gitutil::head_hash(&repo) {
        if head != entry.version {
            warn!("{}: HEAD and locked revision are different", entry.path);
            warn!("  HEAD: {head}");
            warn!("  locked revision: {}", entry.version);
            warn!(
                "  run 'volt get {}' to update the locked revision",
                entry.path
            );
        }
    }
    !gitutil::worktree_is_clean(&repo).unwrap_or(false)
}

/// The change predicate: whether one active repository must be
/// re-materialized.
fn needs_rebuild(
    full: bool,
    entry: &RepoEntry,
    prev: Option<&ManifestEntry>,
    src: &Path,
    dirty: bool,
) -> bool {
    if full {
        return true;
    }
    let Some(prev) = prev else {
        return true;
    };
    if dirty || prev.dirty_worktree {
        return true;
    }
    match entry.kind {
        RepoKind::Git => entry.version != prev.version,
        RepoKind::Static => static_tree_is_newer(src, &prev.version),
    }
}

fn static_tree_is_newer(src: &Path, recorded: &str) -> bool {
    let Ok(recorded) = OffsetDateTime::parse(recorded, &Rfc3339) else {
        return true;
    };
    let Ok(latest) = latest_mtime(src) else {
        return true;
    };
    OffsetDateTime::from(latest) > recorded
}

fn latest_mtime(path: &Path) -> Result<SystemTime> {
    let mut latest = SystemTime::UNIX_EPOCH;
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        let modified = entry.metadata()?.modified()?;
        if modified > latest {
            latest = modified;
        }
    }
    Ok(latest)
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC 3339 formatting of a UTC timestamp cannot fail")
}

/// Runs the work units across a thread pool; one unit owns one destination
/// directory, so units never contend on the tree.
fn dispatch(
    paths: &VoltPaths,
    vim: &Path,
    strategy: Strategy,
    units: Vec<WorkUnit>,
) -> (Vec<UnitOutput>, Vec<(RepoId, String)>) {
    if units.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let worker_count = thread::available_parallelism()
        .map_or(4, std::num::NonZeroUsize::get)
        .min(units.len());

    let (job_tx, job_rx) = mpsc::channel();
    for unit in units {
        job_tx.send(unit).expect("queue build jobs");
    }
    drop(job_tx);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let (result_tx, result_rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let paths = paths.clone();
        let vim = vim.to_path_buf();
        handles.push(thread::spawn(move || loop {
            let unit = {
                let guard = job_rx.lock().expect("lock job receiver");
                match guard.recv() {
                    Ok(unit) => unit,
                    Err(_) => break,
                }
            };
            let result = run_unit(&paths, &vim, strategy, unit);
            if result_tx.send(result).is_err() {
                break;
            }
        }));
    }
    drop(result_tx);

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for result in result_rx {
        match result {
            Ok(output) => outputs.push(output),
            Err((id, err)) => failures.push((id, err)),
        }
    }
    for handle in handles {
        let _ = handle.join();
    }
    (outputs, failures)
}

fn run_unit(
    paths: &VoltPaths,
    vim: &Path,
    strategy: Strategy,
    unit: WorkUnit,
) -> Result<UnitOutput, (RepoId, String)> {
    match unit {
        WorkUnit::Materialize { entry, dirty } => {
            info!(
                "installing {} repository {} ...",
                kind_name(entry.kind),
                entry.path
            );
            let dst = paths.pack_repos_path(&entry.path);
            match materializer(strategy).materialize(paths, vim, &entry, dirty) {
                Ok(materialized) => Ok(UnitOutput::Materialized(ManifestEntry {
                    kind: entry.kind,
                    path: entry.path,
                    version: materialized.version,
                    dirty_worktree: dirty,
                    files: materialized.files,
                })),
                Err(err) => {
                    // Confine the damage to this repo's destination.
                    if let Err(remove_err) = fsutil::remove_path(&dst) {
                        warn!("cleanup of {} failed: {remove_err:#}", dst.display());
                    }
                    Err((entry.path, format!("{err:#}")))
                }
            }
        }
        WorkUnit::Remove { id } => {
            info!("removing {id} ...");
            let dst = paths.pack_repos_path(&id);
            match fsutil::remove_path(&dst) {
                Ok(()) => Ok(UnitOutput::Removed(id)),
                Err(err) => Err((id, format!("{err:#}"))),
            }
        }
    }
}

fn kind_name(kind: RepoKind) -> &'static str {
    match kind {
        RepoKind::Git => "git",
        RepoKind::Static => "static",
    }
}

const RC_MAGIC: &str =
    "\" This file was generated by volt; edit files under the volt rc directory instead.";

/// Installs or removes the profile's vimrc/gvimrc copies under the editor
/// directory. A user-owned rc file (no magic first line) is never clobbered.
fn install_rc_files(paths: &VoltPaths, profile: &Profile) -> Result<()> {
    info!("installing vimrc and gvimrc ...");
    for (enabled, name) in [(profile.use_vimrc, "vimrc"), (profile.use_gvimrc, "gvimrc")] {
        let src = paths.rc_dir(&profile.name).join(name);
        let dst = paths.vim_dir().join(name);
        let dst_is_volt = fs::read_to_string(&dst)
            .map(|c| c.starts_with(RC_MAGIC))
            .unwrap_or(false);
        if enabled && src.exists() {
            if dst.exists() && !dst_is_volt {
                bail!(
                    "{} already exists and was not generated by volt; \
                     remove it or set use_{name} to false",
                    dst.display()
                );
            }
            let body = fs::read_to_string(&src)
                .with_context(|| format!("failed to read {}", src.display()))?;
            fsutil::atomic_write(&dst, format!("{RC_MAGIC}\n{body}").as_bytes())?;
        } else if dst_is_volt {
            fs::remove_file(&dst)
                .with_context(|| format!("failed to remove {}", dst.display()))?;
        }
    }
    Ok(())
}

fn write_bundled_plugconf(paths: &VoltPaths, active: &[RepoEntry]) -> Result<()> {
    let mut ids: Vec<RepoId> = active.iter().map(|e| e.path.clone()).collect();
    ids.sort();
    let bundle = plugconf::generate_bundle(paths, &ids)
        .map_err(|errors| anyhow!("plugconf parse errors:\n  {}", errors.join("\n  ")))?;
    fsutil::atomic_write(&paths.bundled_plugconf(), bundle.as_bytes())
}

/// Aggregates every active repo's `ftdetect/` entries into the shared
/// runtime ftdetect directory.
fn link_ftdetect_files(paths: &VoltPaths, active: &[RepoEntry]) -> Result<()> {
    let dst_dir = paths.ftdetect_dir();
    fs::create_dir_all(&dst_dir)
        .with_context(|| format!("failed to create {}", dst_dir.display()))?;
    for entry in active {
        let src_dir = paths.pack_repos_path(&entry.path).join("ftdetect");
        if !src_dir.is_dir() {
            continue;
        }
        for file in fs::read_dir(&src_dir)
            .with_context(|| format!("failed to read {}", src_dir.display()))?
        {
            let file = file?;
            if !file.file_type()?.is_file() {
                continue;
            }
            let to = dst_dir.join(file.file_name());
            fsutil::link_or_copy_file(&file.path(), &to)
                .with_context(|| format!("could not create {}", to.display()))?;
        }
    }
    Ok(())
}

/// Shells out to the editor to regenerate `doc/tags`. Missing `doc/` is not
/// an error; a non-zero exit is.
pub(crate) fn generate_helptags(vim: &Path, dst: &Path) -> Result<()> {
    let doc = dst.join("doc");
    if !doc.is_dir() {
        return Ok(());
    }
    let output = Command::new(vim)
        .args(["-N", "-u", "NONE", "-i", "NONE", "-e", "-s", "-c"])
        .arg(format!("helptags {}", doc.display()))
        .args(["-c", "qall!"])
        .output()
        .with_context(|| format!("failed to run {}", vim.display()))?;
    if !output.status.success() {
        bail!(
            "failed to generate help tags for {}: {}",
            dst.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
