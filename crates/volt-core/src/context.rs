use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use volt_domain::VoltPaths;

use crate::config::Config;

/// Flags shared by every subcommand.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
}

/// Immutable copy of the process environment, captured once per command.
#[derive(Clone, Debug)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

/// Everything a command needs: global flags, environment, paths, config.
pub struct CommandContext {
    pub global: GlobalOptions,
    env: EnvSnapshot,
    paths: VoltPaths,
    config: Config,
}

impl CommandContext {
    pub fn new(global: GlobalOptions) -> Result<Self> {
        let env = EnvSnapshot::capture();
        let paths = resolve_paths(&env)?;
        let config = Config::load(&paths.config_toml())?;
        Ok(Self {
            global,
            env,
            paths,
            config,
        })
    }

    #[cfg(test)]
    pub(crate) fn testing(paths: VoltPaths, env: EnvSnapshot) -> Self {
        let config = Config::load(&paths.config_toml()).expect("test config");
        Self {
            global: GlobalOptions::default(),
            env,
            paths,
            config,
        }
    }

    pub fn paths(&self) -> &VoltPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn env_var(&self, key: &str) -> Option<&str> {
        self.env.var(key)
    }

    /// Looks up the editor executable on `PATH`. Build and rebuild refuse to
    /// run without it because help-tag generation shells out to it.
    pub(crate) fn vim_executable(&self) -> Result<PathBuf> {
        let path_var = self
            .env
            .var("PATH")
            .context("PATH is not set; cannot look up vim executable")?;
        for dir in env::split_paths(path_var) {
            for name in editor_names() {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        bail!("vim executable not found in PATH")
    }
}

fn editor_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["vim.exe", "vim.bat", "vim"]
    } else {
        &["vim"]
    }
}

fn resolve_paths(env: &EnvSnapshot) -> Result<VoltPaths> {
    let home = match env
        .var("HOME")
        .filter(|v| !v.is_empty())
        .or_else(|| env.var("USERPROFILE").filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .or_else(dirs_next::home_dir)
    {
        Some(home) => home,
        None => bail!("could not look up home directory"),
    };
    let volt_root = match env.var("VOLTPATH").filter(|v| !v.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => home.join("volt"),
    };
    Ok(VoltPaths::new(volt_root, home))
}
