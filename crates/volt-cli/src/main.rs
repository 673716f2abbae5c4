#![deny(clippy::all, warnings)]

use std::env;
use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::Parser;
use volt_core::{CommandContext, Config, GlobalOptions};
use volt_domain::VoltPaths;

mod cli;
mod dispatch;
mod output;

use cli::VoltCli;
use dispatch::dispatch_command;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args = expand_alias(env::args_os().collect());
    let cli = match VoltCli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return 0;
        }
        Err(err) => {
            let _ = err.print();
            return 10;
        }
    };

    init_tracing(cli.quiet, cli.verbose);
    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    let ctx = match CommandContext::new(global) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            return 20;
        }
    };

    match dispatch_command(&ctx, &cli.command) {
        Ok(report) => output::emit(&report),
        Err(err) => {
            eprintln!("[ERROR] {err}");
            err.exit_code()
        }
    }
}

/// Replaces an aliased subcommand with its expansion from `[alias]` in
/// config.toml before clap sees the arguments.
fn expand_alias(args: Vec<OsString>) -> Vec<OsString> {
    let Ok(paths) = VoltPaths::discover() else {
        return args;
    };
    let Ok(config) = Config::load(&paths.config_toml()) else {
        return args;
    };
    apply_alias(args, &config)
}

fn apply_alias(mut args: Vec<OsString>, config: &Config) -> Vec<OsString> {
    let Some(first) = args.get(1).and_then(|a| a.to_str()) else {
        return args;
    };
    if let Some(expansion) = config.expand_alias(first) {
        let tail = args.split_off(2);
        args.truncate(1);
        args.extend(expansion.iter().map(OsString::from));
        args.extend(tail);
    }
    args
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = format!("volt={level},volt_cli={level},volt_core={level},volt_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
