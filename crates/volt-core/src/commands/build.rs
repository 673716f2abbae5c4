use crate::build as engine;
use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::transaction::Transaction;

/// `volt build` / `volt rebuild`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildRequest {
    /// `rebuild`: ignore the previous manifest and re-materialize everything.
    pub full: bool,
}

/// Reconciles the runtime tree with the lock document. Incremental unless
/// `full` is set; per-repo failures are reported after every other unit has
/// run.
pub fn build(ctx: &CommandContext, request: &BuildRequest) -> CommandResult {
    let _trx = Transaction::acquire(ctx.paths()).map_err(CommandError::engine)?;
    let summary = engine::run(ctx, request.full).map_err(CommandError::engine)?;

    let mut report = CommandReport::default();
    if !summary.errors.is_empty() {
        report.fail(summary.errors.join("\n"));
    }
    Ok(report)
}
