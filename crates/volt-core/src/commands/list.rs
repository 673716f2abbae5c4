use volt_domain::{LockDocument, RepoKind};

use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};

/// `volt list`: every installed repository with its locked version; entries
/// enabled in the current profile are starred.
pub fn list(ctx: &CommandContext) -> CommandResult {
    let lock = LockDocument::load(&ctx.paths().lock_json())
        .map_err(|err| CommandError::LockRead(err.into()))?;

    let profile = lock.current_profile();
    let mut report = CommandReport::default();
    for entry in &lock.repos {
        let marker = if profile.contains(&entry.path) { '*' } else { ' ' };
        let version = match entry.kind {
            RepoKind::Git => entry.version.get(..7).unwrap_or(&entry.version),
            RepoKind::Static => entry.version.as_str(),
        };
        report.line(format!("{marker} {} ({version})", entry.path));
    }
    Ok(report)
}
