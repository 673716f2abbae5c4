use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::repoid::RepoId;

/// Resolves every filesystem location volt touches.
///
/// Construction captures the two roots (volt root and home); everything else
/// is a pure mapping so commands and tests can relocate the whole tree by
/// swapping the roots.
#[derive(Clone, Debug)]
pub struct VoltPaths {
    volt_root: PathBuf,
    home: PathBuf,
}

impl VoltPaths {
    pub fn new(volt_root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            volt_root: volt_root.into(),
            home: home.into(),
        }
    }

    /// Resolves roots from the process environment: `VOLTPATH` overrides the
    /// volt root (default `$HOME/volt`); home comes from `HOME`, then
    /// `USERPROFILE`, then the platform lookup.
    pub fn discover() -> Result<Self> {
        let home = match std::env::var_os("HOME")
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var_os("USERPROFILE").filter(|v| !v.is_empty()))
            .map(PathBuf::from)
            .or_else(dirs_next::home_dir)
        {
            Some(home) => home,
            None => bail!("could not look up home directory"),
        };
        let volt_root = match std::env::var_os("VOLTPATH").filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => home.join("volt"),
        };
        Ok(Self::new(volt_root, home))
    }

    pub fn volt_root(&self) -> &Path {
        &self.volt_root
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn lock_json(&self) -> PathBuf {
        self.volt_root.join("lock.json")
    }

    pub fn trx_lock(&self) -> PathBuf {
        self.volt_root.join("trx.lock")
    }

    pub fn config_toml(&self) -> PathBuf {
        self.volt_root.join("config.toml")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.volt_root.join("tmp")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.volt_root.join("repos")
    }

    /// `$VOLTPATH/repos/{site}/{user}/{name}`, the source of truth per repo.
    pub fn full_repos_path(&self, id: &RepoId) -> PathBuf {
        self.repos_dir()
            .join(id.site())
            .join(id.user())
            .join(id.name())
    }

    pub fn plugconf_dir(&self) -> PathBuf {
        self.volt_root.join("plugconf")
    }

    pub fn user_plugconf(&self, id: &RepoId) -> PathBuf {
        self.plugconf_path(id, "user")
    }

    pub fn system_plugconf(&self, id: &RepoId) -> PathBuf {
        self.plugconf_path(id, "system")
    }

    fn plugconf_path(&self, id: &RepoId, kind: &str) -> PathBuf {
        self.plugconf_dir()
            .join(kind)
            .join(id.site())
            .join(id.user())
            .join(format!("{}.vim", id.name()))
    }

    /// `$VOLTPATH/rc/{profile}`, per-profile vimrc/gvimrc sources.
    pub fn rc_dir(&self, profile: &str) -> PathBuf {
        self.volt_root.join("rc").join(profile)
    }

    /// `$HOME/.vim` on POSIX, `$HOME/vimfiles` on Windows.
    pub fn vim_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.home.join("vimfiles")
        } else {
            self.home.join(".vim")
        }
    }

    pub fn pack_dir(&self) -> PathBuf {
        self.vim_dir().join("pack").join("volt")
    }

    pub fn start_dir(&self) -> PathBuf {
        self.pack_dir().join("start")
    }

    /// The materialized runtime directory for one repo, using the reversible
    /// underscore encoding.
    pub fn pack_repos_path(&self, id: &RepoId) -> PathBuf {
        self.start_dir().join(id.encode_pack_name())
    }

    pub fn build_info_json(&self) -> PathBuf {
        self.pack_dir().join("build-info.json")
    }

    pub fn bundled_plugconf(&self) -> PathBuf {
        self.start_dir()
            .join("system")
            .join("plugin")
            .join("bundled_plugconf.vim")
    }

    pub fn ftdetect_dir(&self) -> PathBuf {
        self.start_dir()
            .join("system")
            .join("ftdetect")
    }
}
