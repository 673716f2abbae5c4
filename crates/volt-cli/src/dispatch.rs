use volt_core::{
    BuildRequest, CommandContext, CommandError, CommandReport, GetRequest, ProfileRequest,
    RcFile, RmRequest, SelfUpgradeRequest,
};

use crate::cli::{CommandCli, ProfileCli, RcFileCli};

pub fn dispatch_command(
    ctx: &CommandContext,
    command: &CommandCli,
) -> Result<CommandReport, CommandError> {
    match command {
        CommandCli::Get(args) => volt_core::get(
            ctx,
            &GetRequest {
                repos: args.repos.clone(),
                all: args.all,
                upgrade: args.upgrade,
            },
        ),
        CommandCli::Rm(args) => volt_core::rm(
            ctx,
            &RmRequest {
                repos: args.repos.clone(),
                remove_plugconf: args.plugconf,
            },
        ),
        CommandCli::Build => volt_core::build(ctx, &BuildRequest { full: false }),
        CommandCli::Rebuild => volt_core::build(ctx, &BuildRequest { full: true }),
        CommandCli::List => volt_core::list(ctx),
        CommandCli::Enable(args) => volt_core::profile(
            ctx,
            &ProfileRequest::Add {
                name: None,
                repos: args.repos.clone(),
            },
        ),
        CommandCli::Disable(args) => volt_core::profile(
            ctx,
            &ProfileRequest::Rm {
                name: None,
                repos: args.repos.clone(),
            },
        ),
        CommandCli::Migrate => volt_core::migrate(ctx),
        CommandCli::Profile(profile) => {
            volt_core::profile(ctx, &profile_request(profile))
        }
        CommandCli::SelfUpgrade(args) => volt_core::self_upgrade(
            ctx,
            &SelfUpgradeRequest {
                check_only: args.check,
            },
        ),
    }
}

fn profile_request(cli: &ProfileCli) -> ProfileRequest {
    match cli {
        ProfileCli::Set { name } => ProfileRequest::Set { name: name.clone() },
        ProfileCli::Show { name } => ProfileRequest::Show {
            name: profile_name(name.as_deref()),
        },
        ProfileCli::List => ProfileRequest::List,
        ProfileCli::New { name } => ProfileRequest::New { name: name.clone() },
        ProfileCli::Destroy { name } => ProfileRequest::Destroy { name: name.clone() },
        ProfileCli::Add { name, repos } => ProfileRequest::Add {
            name: profile_name(Some(name)),
            repos: repos.clone(),
        },
        ProfileCli::Rm { name, repos } => ProfileRequest::Rm {
            name: profile_name(Some(name)),
            repos: repos.clone(),
        },
        ProfileCli::Use { name, rc, value } => ProfileRequest::Use {
            name: profile_name(Some(name)),
            rc: match rc {
                RcFileCli::Vimrc => RcFile::Vimrc,
                RcFileCli::Gvimrc => RcFile::Gvimrc,
            },
            value: *value,
        },
    }
}

/// The literal `-current` (or an omitted name) selects the current profile.
fn profile_name(raw: Option<&str>) -> Option<String> {
    match raw {
        None | Some("-current") => None,
        Some(name) => Some(name.to_string()),
    }
}
