use anyhow::anyhow;
use volt_domain::{LockDocument, RepoEntry, RepoId, RepoKind};

use crate::acquire::{self, AcquireOptions, AcquireOutcome, AcquireRequest, UnitResult};
use crate::build;
use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::transaction::Transaction;

/// `volt get [-l] [-u] {repository} ...`
#[derive(Clone, Debug, Default)]
pub struct GetRequest {
    pub repos: Vec<String>,
    /// `-l`: use every installed repository as the target set.
    pub all: bool,
    /// `-u`: upgrade existing git repositories.
    pub upgrade: bool,
}

/// Installs or upgrades the requested repositories, records them in the lock
/// document under a fresh transaction id, and reconciles the runtime tree.
pub fn get(ctx: &CommandContext, request: &GetRequest) -> CommandResult {
    let paths = ctx.paths();
    let mut lock = LockDocument::load(&paths.lock_json())
        .map_err(|err| CommandError::LockRead(err.into()))?;

    let targets: Vec<RepoId> = if request.all {
        lock.repos.iter().map(|e| e.path.clone()).collect()
    } else {
        request
            .repos
            .iter()
            .map(|raw| RepoId::parse_local(raw))
            .collect::<Result<_, _>>()
            .map_err(|err| CommandError::Input(err.into()))?
    };
    if targets.is_empty() {
        return Err(CommandError::EmptyTarget);
    }

    let _trx = Transaction::acquire(paths).map_err(CommandError::engine)?;
    let trx_id = lock.begin_transaction();

    let results = acquire::acquire(
        paths,
        &AcquireRequest {
            targets,
            upgrade: request.upgrade,
        },
        AcquireOptions {
            create_plugconf: ctx.config().create_skeleton_plugconf,
            fallback_git_cmd: ctx.config().fallback_git_cmd,
        },
    );

    let mut report = CommandReport::default();
    let mut updated = false;
    for result in &results {
        if result.failed() {
            report.line(format_failure(result));
            continue;
        }
        report.line(merge_unit(&mut lock, trx_id, result));
        updated = true;
    }
    report.lines.sort();

    if updated {
        lock.save(&paths.lock_json())
            .map_err(|err| CommandError::engine(anyhow!("could not write to lock.json: {err}")))?;
    }

    let summary = build::run(ctx, false).map_err(CommandError::engine)?;
    if results.iter().any(UnitResult::failed) {
        report.fail("failed to install some plugins");
    } else if !summary.errors.is_empty() {
        report.fail(summary.errors.join("\n"));
    }
    Ok(report)
}

/// Records a successful unit in the lock document and renders its status
/// line. New entries and new profile references both count as "added".
fn merge_unit(lock: &mut LockDocument, trx_id: u64, result: &UnitResult) -> String {
    let prev_version = lock.find_repo(&result.repo).map(|e| e.version.clone());
    let version = match (&result.head, &prev_version) {
        (Some(head), _) => head.clone(),
        // Static repos keep their stamp until the next build re-captures it.
        (None, Some(prev)) => prev.clone(),
        (None, None) => build::now_rfc3339(),
    };

    let mut added = false;
    match lock.find_repo_mut(&result.repo) {
        Some(entry) => {
            entry.trx_id = trx_id;
            entry.version = version.clone();
        }
        None => {
            lock.repos.push(RepoEntry {
                kind: result.kind,
                trx_id,
                path: result.repo.clone(),
                version: version.clone(),
            });
            added = true;
        }
    }
    let profile = lock.current_profile_mut();
    if !profile.contains(&result.repo) {
        profile.repos_path.push(result.repo.clone());
        added = true;
    }

    let repo = &result.repo;
    match &result.outcome {
        AcquireOutcome::Installed => format!("+ {repo} > installed"),
        AcquireOutcome::Upgraded { from } => {
            format!("* {repo} > upgraded ({from}..{version})")
        }
        AcquireOutcome::AlreadyExists | AcquireOutcome::NoChange => {
            let drifted = result.kind == RepoKind::Git
                && prev_version.as_deref().is_some_and(|prev| prev != version);
            if added {
                format!("+ {repo} > added repository to current profile")
            } else if drifted {
                let prev = prev_version.unwrap_or_default();
                format!("* {repo} > updated lock.json revision ({prev}..{version})")
            } else if result.outcome == AcquireOutcome::AlreadyExists {
                format!("# {repo} > already exists")
            } else {
                format!("# {repo} > no change")
            }
        }
    }
}

fn format_failure(result: &UnitResult) -> String {
    let mut line = format!("! {} > {}", result.repo, result.errors[0]);
    for extra in &result.errors[1..] {
        line.push_str("\n  * ");
        line.push_str(extra);
    }
    line
}
