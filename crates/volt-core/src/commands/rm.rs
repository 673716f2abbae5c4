use std::fs;

use anyhow::anyhow;
use tracing::info;
use volt_domain::{LockDocument, RepoId};

use crate::context::CommandContext;
use crate::fsutil;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::transaction::Transaction;

/// `volt rm [-p] {repository} ...`
#[derive(Clone, Debug, Default)]
pub struct RmRequest {
    pub repos: Vec<String>,
    /// `-p`: also remove the user plug-config file.
    pub remove_plugconf: bool,
}

/// Uninstalls repositories: deletes the source directory, drops the lock
/// entry and every profile reference. The materialized directory becomes an
/// orphan that the next build removes.
pub fn rm(ctx: &CommandContext, request: &RmRequest) -> CommandResult {
    let paths = ctx.paths();
    let targets: Vec<RepoId> = request
        .repos
        .iter()
        .map(|raw| RepoId::parse_local(raw))
        .collect::<Result<_, _>>()
        .map_err(|err| CommandError::Input(err.into()))?;
    if targets.is_empty() {
        return Err(CommandError::EmptyTarget);
    }

    let mut lock = LockDocument::load(&paths.lock_json())
        .map_err(|err| CommandError::LockRead(err.into()))?;

    let _trx = Transaction::acquire(paths).map_err(CommandError::engine)?;
    lock.begin_transaction();

    let mut report = CommandReport::default();
    for id in &targets {
        let src = paths.full_repos_path(id);
        let known = lock.find_repo(id).is_some();
        if !known && !src.exists() {
            return Err(CommandError::engine(anyhow!(
                "no repository was installed: {}",
                src.display()
            )));
        }
        if src.exists() {
            info!("removing {} ...", src.display());
            fs::remove_dir_all(&src).map_err(|err| {
                CommandError::engine(anyhow!("failed to remove '{}': {err}", src.display()))
            })?;
            if let Some(parent) = src.parent() {
                fsutil::remove_dirs_upward(parent, &paths.repos_dir());
            }
        }
        if request.remove_plugconf {
            let plugconf = paths.user_plugconf(id);
            if plugconf.exists() {
                fs::remove_file(&plugconf).map_err(|err| {
                    CommandError::engine(anyhow!(
                        "failed to remove '{}': {err}",
                        plugconf.display()
                    ))
                })?;
                if let Some(parent) = plugconf.parent() {
                    fsutil::remove_dirs_upward(parent, &paths.plugconf_dir());
                }
            }
        }
        if known {
            lock.remove_repo(id).map_err(CommandError::engine)?;
        }
        report.line(format!("- {id} > removed"));
    }
    report.lines.sort();

    lock.save(&paths.lock_json())
        .map_err(|err| CommandError::engine(anyhow!("could not write to lock.json: {err}")))?;
    Ok(report)
}
