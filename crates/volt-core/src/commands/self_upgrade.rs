use std::fs;

use anyhow::anyhow;
use tracing::debug;

use crate::context::CommandContext;
use crate::report::{CommandError, CommandReport, CommandResult};
use crate::VOLT_VERSION;

/// `volt self-upgrade [-check]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfUpgradeRequest {
    pub check_only: bool,
}

/// Release download and binary replacement are delegated to the packaging
/// side; the subcommand still owns the post-upgrade handoff: a freshly
/// replaced binary re-invokes itself with `VOLT_SELF_UPGRADE_PPID` set so the
/// old executable left beside it can be deleted.
pub fn self_upgrade(ctx: &CommandContext, request: &SelfUpgradeRequest) -> CommandResult {
    if let Some(ppid) = ctx.env_var("VOLT_SELF_UPGRADE_PPID") {
        debug!("cleaning up after self-upgrade (old pid {ppid})");
        let exe = std::env::current_exe()
            .map_err(|err| CommandError::engine(anyhow!("cannot locate own binary: {err}")))?;
        let old = exe.with_extension("old");
        if old.exists() {
            fs::remove_file(&old).map_err(|err| {
                CommandError::engine(anyhow!("failed to remove {}: {err}", old.display()))
            })?;
        }
        let mut report = CommandReport::default();
        report.line(format!("volt {VOLT_VERSION}"));
        return Ok(report);
    }

    let verb = if request.check_only { "check" } else { "upgrade" };
    Err(CommandError::engine(anyhow!(
        "cannot {verb}: this build has no release-download support; \
         current version is {VOLT_VERSION}"
    )))
}
