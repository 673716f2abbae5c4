use anyhow::anyhow;
use tracing::info;
use volt_domain::{LockDocument, Profile, RepoId};

use crate::build as engine;
use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::transaction::Transaction;

/// `volt profile <subcommand>`. `name: None` means the current profile
/// (`-current` on the command line).
#[derive(Clone, Debug)]
pub enum ProfileRequest {
    Set { name: String },
    Show { name: Option<String> },
    List,
    New { name: String },
    Destroy { name: String },
    Add { name: Option<String>, repos: Vec<String> },
    Rm { name: Option<String>, repos: Vec<String> },
    Use { name: Option<String>, rc: RcFile, value: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RcFile {
    Vimrc,
    Gvimrc,
}

pub fn profile(ctx: &CommandContext, request: &ProfileRequest) -> CommandResult {
    let mut lock = LockDocument::load(&ctx.paths().lock_json())
        .map_err(|err| CommandError::LockRead(err.into()))?;

    match request {
        ProfileRequest::Show { name } => show(&lock, name.as_deref()),
        ProfileRequest::List => {
            let mut report = CommandReport::default();
            for profile in &lock.profiles {
                let marker = if profile.name == lock.current_profile_name {
                    '*'
                } else {
                    ' '
                };
                report.line(format!("{marker} {}", profile.name));
            }
            Ok(report)
        }
        ProfileRequest::Set { name } => set(ctx, &mut lock, name),
        ProfileRequest::New { name } => new(ctx, &mut lock, name),
        ProfileRequest::Destroy { name } => destroy(ctx, &mut lock, name),
        ProfileRequest::Add { name, repos } => {
            edit_repos(ctx, &mut lock, name.as_deref(), repos, true)
        }
        ProfileRequest::Rm { name, repos } => {
            edit_repos(ctx, &mut lock, name.as_deref(), repos, false)
        }
        ProfileRequest::Use { name, rc, value } => use_rc(ctx, &mut lock, name.as_deref(), *rc, *value),
    }
}

fn resolve_name(lock: &LockDocument, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => lock.current_profile_name.clone(),
    }
}

fn require_profile<'l>(
    lock: &'l LockDocument,
    name: &str,
) -> Result<&'l Profile, CommandError> {
    lock.find_profile(name)
        .ok_or_else(|| CommandError::engine(anyhow!("profile '{name}' does not exist")))
}

fn show(lock: &LockDocument, name: Option<&str>) -> CommandResult {
    let name = resolve_name(lock, name);
    let profile = require_profile(lock, &name)?;
    let mut report = CommandReport::default();
    report.line(format!("name: {}", profile.name));
    report.line(format!("use vimrc: {}", profile.use_vimrc));
    report.line(format!("use gvimrc: {}", profile.use_gvimrc));
    report.line("repos path:");
    for id in &profile.repos_path {
        let version = lock
            .find_repo(id)
            .map_or("?", |entry| entry.version.as_str());
        report.line(format!("  {id} ({version})"));
    }
    Ok(report)
}

fn set(ctx: &CommandContext, lock: &mut LockDocument, name: &str) -> CommandResult {
    if lock.current_profile_name == name {
        return Err(CommandError::engine(anyhow!("'{name}' is current profile")));
    }
    require_profile(lock, name)?;

    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    lock.begin_transaction();
    lock.current_profile_name = name.to_string();
    save(ctx, lock)?;
    info!("changed current profile: {name}");
    rebuild(ctx, true)
}

fn new(ctx: &CommandContext, lock: &mut LockDocument, name: &str) -> CommandResult {
    if lock.find_profile(name).is_some() {
        return Err(CommandError::engine(anyhow!(
            "profile '{name}' already exists"
        )));
    }
    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    lock.begin_transaction();
    lock.profiles.push(Profile::new(name));
    save(ctx, lock)?;

    let mut report = CommandReport::default();
    report.line(format!("created new profile '{name}'"));
    Ok(report)
}

fn destroy(ctx: &CommandContext, lock: &mut LockDocument, name: &str) -> CommandResult {
    if lock.current_profile_name == name {
        return Err(CommandError::engine(anyhow!(
            "cannot destroy current profile: {name}"
        )));
    }
    require_profile(lock, name)?;

    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    lock.begin_transaction();
    lock.profiles.retain(|p| p.name != name);
    save(ctx, lock)?;

    let mut report = CommandReport::default();
    report.line(format!("deleted profile '{name}'"));
    Ok(report)
}

/// `profile add` / `profile rm` (and through them `enable` / `disable`).
fn edit_repos(
    ctx: &CommandContext,
    lock: &mut LockDocument,
    name: Option<&str>,
    repos: &[String],
    add: bool,
) -> CommandResult {
    if repos.is_empty() {
        return Err(CommandError::EmptyTarget);
    }
    let targets: Vec<RepoId> = repos
        .iter()
        .map(|raw| RepoId::parse_local(raw))
        .collect::<Result<_, _>>()
        .map_err(|err| CommandError::Input(err.into()))?;
    let name = resolve_name(lock, name);
    require_profile(lock, &name)?;
    if add {
        for id in &targets {
            if lock.find_repo(id).is_none() {
                return Err(CommandError::Input(anyhow!(
                    "repository '{id}' is not installed"
                )));
            }
        }
    }

    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    lock.begin_transaction();
    let profile = lock
        .find_profile_mut(&name)
        .expect("checked above: profile exists");
    let mut report = CommandReport::default();
    for id in &targets {
        if add {
            if !profile.contains(id) {
                profile.repos_path.push(id.clone());
                report.line(format!("+ {id} > enabled in profile '{name}'"));
            } else {
                report.line(format!("# {id} > already enabled in profile '{name}'"));
            }
        } else if profile.contains(id) {
            profile.repos_path.retain(|p| p != id);
            report.line(format!("- {id} > disabled in profile '{name}'"));
        } else {
            report.line(format!("# {id} > not enabled in profile '{name}'"));
        }
    }
    report.lines.sort();
    save(ctx, lock)?;

    let build_report = rebuild(ctx, false)?;
    report.failure = build_report.failure;
    Ok(report)
}

fn use_rc(
    ctx: &CommandContext,
    lock: &mut LockDocument,
    name: Option<&str>,
    rc: RcFile,
    value: bool,
) -> CommandResult {
    let name = resolve_name(lock, name);
    require_profile(lock, &name)?;

    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    lock.begin_transaction();
    let profile = lock
        .find_profile_mut(&name)
        .expect("checked above: profile exists");
    match rc {
        RcFile::Vimrc => profile.use_vimrc = value,
        RcFile::Gvimrc => profile.use_gvimrc = value,
    }
    save(ctx, lock)?;
    rebuild(ctx, false)
}

fn save(ctx: &CommandContext, lock: &LockDocument) -> Result<(), CommandError> {
    lock.save(&ctx.paths().lock_json())
        .map_err(|err| CommandError::engine(anyhow!("could not write to lock.json: {err}")))
}

fn rebuild(ctx: &CommandContext, full: bool) -> CommandResult {
    let summary = engine::run(ctx, full).map_err(CommandError::engine)?;
    let mut report = CommandReport::default();
    if !summary.errors.is_empty() {
        report.fail(summary.errors.join("\n"));
    }
    Ok(report)
}
