use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

pub const VOLT_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const VOLT_BEFORE_HELP: &str = concat!(
    "volt ",
    env!("CARGO_PKG_VERSION"),
    " – a package manager for Vim plugins\n\n",
    "Core workflow\n",
    "  get              Install or upgrade plugins; records them in lock.json.\n",
    "  rm               Uninstall plugins.\n",
    "  build            Reconcile ~/.vim/pack/volt with lock.json (incremental).\n",
    "  rebuild          Same as build, but re-materializes everything.\n",
    "  list             Show installed plugins and their locked versions.\n\n",
    "Profiles\n",
    "  profile          Manage named plugin sets (set/show/list/new/destroy/add/rm/use).\n",
    "  enable           Shortcut for 'profile add -current'.\n",
    "  disable          Shortcut for 'profile rm -current'.\n\n",
    "Maintenance\n",
    "  migrate          Persist the migrated lock.json schema.\n",
    "  self-upgrade     Replace this binary with the latest release.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "volt",
    version,
    disable_help_subcommand = true,
    before_help = VOLT_BEFORE_HELP,
    help_template = VOLT_HELP_TEMPLATE
)]
pub struct VoltCli {
    #[arg(short, long, help = "Suppress informational output", global = true)]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(
        about = "Install or upgrade the given plugins.",
        override_usage = "volt get [-l] [-u] [{repository} ...]"
    )]
    Get(GetArgs),
    #[command(
        about = "Uninstall the given plugins from every profile.",
        override_usage = "volt rm [-p] {repository} [{repository} ...]"
    )]
    Rm(RmArgs),
    #[command(about = "Reconcile the runtime tree with lock.json.")]
    Build,
    #[command(about = "Like build, but re-materializes every plugin.")]
    Rebuild,
    #[command(about = "Show installed plugins and their locked versions.")]
    List,
    #[command(
        about = "Enable plugins in the current profile.",
        override_usage = "volt enable {repository} [{repository} ...]"
    )]
    Enable(ReposArgs),
    #[command(
        about = "Disable plugins in the current profile.",
        override_usage = "volt disable {repository} [{repository} ...]"
    )]
    Disable(ReposArgs),
    #[command(about = "Persist the migrated lock.json schema.")]
    Migrate,
    #[command(subcommand, about = "Manage profiles (named plugin sets).")]
    Profile(ProfileCli),
    #[command(
        name = "self-upgrade",
        about = "Replace this binary with the latest release."
    )]
    SelfUpgrade(SelfUpgradeArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(short = 'l', help = "Use all installed repositories as targets")]
    pub all: bool,
    #[arg(short = 'u', help = "Upgrade repositories")]
    pub upgrade: bool,
    #[arg(value_name = "REPOSITORY")]
    pub repos: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    #[arg(short = 'p', help = "Remove also the plugconf file")]
    pub plugconf: bool,
    #[arg(value_name = "REPOSITORY", required = true)]
    pub repos: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReposArgs {
    #[arg(value_name = "REPOSITORY", required = true)]
    pub repos: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SelfUpgradeArgs {
    #[arg(long, help = "Only check whether a newer release exists")]
    pub check: bool,
}

/// Everywhere a profile name is taken, the literal `-current` names the
/// current profile.
#[derive(Subcommand, Debug)]
pub enum ProfileCli {
    #[command(about = "Switch the current profile.")]
    Set {
        #[arg(value_name = "PROFILE")]
        name: String,
    },
    #[command(about = "Show a profile (defaults to the current one).")]
    Show {
        #[arg(value_name = "PROFILE", allow_hyphen_values = true)]
        name: Option<String>,
    },
    #[command(about = "List profiles; the current one is starred.")]
    List,
    #[command(about = "Create a new, empty profile.")]
    New {
        #[arg(value_name = "PROFILE")]
        name: String,
    },
    #[command(about = "Delete a profile (not the current one).")]
    Destroy {
        #[arg(value_name = "PROFILE")]
        name: String,
    },
    #[command(about = "Add plugins to a profile.")]
    Add {
        #[arg(value_name = "PROFILE", allow_hyphen_values = true)]
        name: String,
        #[arg(value_name = "REPOSITORY", required = true)]
        repos: Vec<String>,
    },
    #[command(about = "Remove plugins from a profile.")]
    Rm {
        #[arg(value_name = "PROFILE", allow_hyphen_values = true)]
        name: String,
        #[arg(value_name = "REPOSITORY", required = true)]
        repos: Vec<String>,
    },
    #[command(about = "Toggle vimrc/gvimrc installation for a profile.")]
    Use {
        #[arg(value_name = "PROFILE", allow_hyphen_values = true)]
        name: String,
        #[arg(value_name = "RC")]
        rc: RcFileCli,
        #[arg(value_name = "BOOL", action = clap::ArgAction::Set)]
        value: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RcFileCli {
    Vimrc,
    Gvimrc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_flags() {
        let cli = VoltCli::try_parse_from(["volt", "get", "-l", "-u"]).unwrap();
        match cli.command {
            CommandCli::Get(args) => {
                assert!(args.all);
                assert!(args.upgrade);
                assert!(args.repos.is_empty());
            }
            other => panic!("expected get, got {other:?}"),
        }
    }

    #[test]
    fn rm_requires_a_repository() {
        assert!(VoltCli::try_parse_from(["volt", "rm"]).is_err());
        assert!(VoltCli::try_parse_from(["volt", "rm", "-p", "u/r"]).is_ok());
    }

    #[test]
    fn profile_add_accepts_current_placeholder() {
        let cli =
            VoltCli::try_parse_from(["volt", "profile", "add", "-current", "u/r"]).unwrap();
        match cli.command {
            CommandCli::Profile(ProfileCli::Add { name, repos }) => {
                assert_eq!(name, "-current");
                assert_eq!(repos, ["u/r"]);
            }
            other => panic!("expected profile add, got {other:?}"),
        }
    }

    #[test]
    fn profile_use_parses_rc_and_bool() {
        let cli = VoltCli::try_parse_from([
            "volt", "profile", "use", "myspec", "gvimrc", "false",
        ])
        .unwrap();
        match cli.command {
            CommandCli::Profile(ProfileCli::Use { name, rc, value }) => {
                assert_eq!(name, "myspec");
                assert!(matches!(rc, RcFileCli::Gvimrc));
                assert!(!value);
            }
            other => panic!("expected profile use, got {other:?}"),
        }
    }
}
