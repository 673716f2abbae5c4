use anyhow::anyhow;
use volt_domain::LockDocument;

use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::transaction::Transaction;

/// `volt migrate`: reading lock.json migrates old schemas in memory on every
/// command; this one persists the migrated structure so later reads are
/// quiet.
pub fn migrate(ctx: &CommandContext) -> CommandResult {
    let paths = ctx.paths();
    let lock = LockDocument::load(&paths.lock_json())
        .map_err(|err| CommandError::LockRead(err.into()))?;

    let _trx = Transaction::acquire(paths).map_err(CommandError::engine)?;
    lock.save(&paths.lock_json())
        .map_err(|err| CommandError::engine(anyhow!("could not write to lock.json: {err}")))?;

    let mut report = CommandReport::default();
    report.line(format!("migrated lock.json to version {}", lock.version));
    Ok(report)
}
