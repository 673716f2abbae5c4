use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repoid::RepoId;

/// Current lock.json schema version.
pub const LOCK_VERSION: u64 = 2;

const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("could not read lock.json: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock.json is corrupt: {reason}")]
    Corrupt { reason: String },
    #[error("lock.json migration from version {from} failed: {reason}")]
    MigrationFailed { from: u64, reason: String },
    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),
    #[error("repository '{0}' is not installed")]
    RepoNotFound(RepoId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Git,
    Static,
}

/// One installed repository. For git repos `version` is a 40-hex commit
/// hash; for static repos it is an RFC 3339 timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(rename = "type")]
    pub kind: RepoKind,
    pub trx_id: u64,
    pub path: RepoId,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub repos_path: Vec<RepoId>,
    pub use_vimrc: bool,
    pub use_gvimrc: bool,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repos_path: Vec::new(),
            use_vimrc: true,
            use_gvimrc: true,
        }
    }

    pub fn contains(&self, id: &RepoId) -> bool {
        self.repos_path.iter().any(|p| p == id)
    }
}

/// The declarative state document (`$VOLTPATH/lock.json`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockDocument {
    pub version: u64,
    pub trx_id: u64,
    pub current_profile_name: String,
    pub repos: Vec<RepoEntry>,
    pub profiles: Vec<Profile>,
}

impl Default for LockDocument {
    fn default() -> Self {
        Self {
            version: LOCK_VERSION,
            trx_id: 0,
            current_profile_name: DEFAULT_PROFILE.to_string(),
            repos: Vec::new(),
            profiles: vec![Profile::new(DEFAULT_PROFILE)],
        }
    }
}

impl LockDocument {
    /// Reads the lock document, running schema migration on the in-memory
    /// copy. A missing file yields a fresh document with a `default`
    /// profile; re-saving is the only way to persist a migration.
    pub fn load(path: &Path) -> Result<Self, LockError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|err| LockError::Corrupt {
                reason: err.to_string(),
            })?;
        let value = migrate(value)?;
        let doc: Self = serde_json::from_value(value).map_err(|err| LockError::Corrupt {
            reason: err.to_string(),
        })?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serializes to a sibling temp file, fsyncs, and renames over the
    /// destination, so a reader sees either the old or the new document.
    pub fn save(&self, path: &Path) -> Result<(), LockError> {
        self.validate()?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let mut out = serde_json::to_string_pretty(self).map_err(|err| LockError::Corrupt {
            reason: err.to_string(),
        })?;
        out.push('\n');
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(out.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), LockError> {
        let corrupt = |reason: String| LockError::Corrupt { reason };
        if self
            .profiles
            .iter()
            .all(|p| p.name != self.current_profile_name)
        {
            return Err(corrupt(format!(
                "current profile '{}' does not exist",
                self.current_profile_name
            )));
        }
        for (i, entry) in self.repos.iter().enumerate() {
            if self.repos[..i].iter().any(|e| e.path == entry.path) {
                return Err(corrupt(format!("duplicate repository '{}'", entry.path)));
            }
            if entry.kind == RepoKind::Git && !is_commit_hash(&entry.version) {
                return Err(corrupt(format!(
                    "repository '{}' has invalid commit hash '{}'",
                    entry.path, entry.version
                )));
            }
        }
        for profile in &self.profiles {
            for (i, id) in profile.repos_path.iter().enumerate() {
                if profile.repos_path[..i].contains(id) {
                    return Err(corrupt(format!(
                        "profile '{}' lists '{}' twice",
                        profile.name, id
                    )));
                }
                if self.find_repo(id).is_none() {
                    return Err(corrupt(format!(
                        "profile '{}' references unknown repository '{}'",
                        profile.name, id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Increments the transaction id once per mutating command. The returned
    /// id is stamped into every entry touched during that command.
    pub fn begin_transaction(&mut self) -> u64 {
        self.trx_id += 1;
        self.trx_id
    }

    pub fn find_repo(&self, id: &RepoId) -> Option<&RepoEntry> {
        self.repos.iter().find(|e| &e.path == id)
    }

    pub fn find_repo_mut(&mut self, id: &RepoId) -> Option<&mut RepoEntry> {
        self.repos.iter_mut().find(|e| &e.path == id)
    }

    /// Removes the entry and every profile reference. Errors if the
    /// repository is unknown.
    pub fn remove_repo(&mut self, id: &RepoId) -> Result<(), LockError> {
        let before = self.repos.len();
        self.repos.retain(|e| &e.path != id);
        if self.repos.len() == before {
            return Err(LockError::RepoNotFound(id.clone()));
        }
        for profile in &mut self.profiles {
            profile.repos_path.retain(|p| p != id);
        }
        Ok(())
    }

    pub fn find_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn find_profile_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    pub fn current_profile(&self) -> &Profile {
        self.find_profile(&self.current_profile_name)
            .expect("validated: current profile exists")
    }

    pub fn current_profile_mut(&mut self) -> &mut Profile {
        let name = self.current_profile_name.clone();
        self.find_profile_mut(&name)
            .expect("validated: current profile exists")
    }

    /// Entries referenced by the current profile, in profile order.
    pub fn active_repos(&self) -> Vec<&RepoEntry> {
        self.current_profile()
            .repos_path
            .iter()
            .filter_map(|id| self.find_repo(id))
            .collect()
    }
}

pub(crate) fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Structural upgrade from older schema versions. Version 1 named the
/// current profile `active_profile` and carried no transaction ids.
fn migrate(mut value: serde_json::Value) -> Result<serde_json::Value, LockError> {
    let version = value.get("version").and_then(serde_json::Value::as_u64);
    match version {
        Some(LOCK_VERSION) => Ok(value),
        Some(1) => {
            let failed = |reason: &str| LockError::MigrationFailed {
                from: 1,
                reason: reason.to_string(),
            };
            let obj = value
                .as_object_mut()
                .ok_or_else(|| failed("document is not an object"))?;
            let current = obj
                .remove("active_profile")
                .ok_or_else(|| failed("missing active_profile"))?;
            obj.insert("current_profile_name".to_string(), current);
            let trx_id = obj
                .entry("trx_id")
                .or_insert_with(|| serde_json::json!(1))
                .as_u64()
                .ok_or_else(|| failed("trx_id is not an integer"))?;
            if let Some(repos) = obj.get_mut("repos").and_then(serde_json::Value::as_array_mut) {
                for repo in repos {
                    let repo = repo
                        .as_object_mut()
                        .ok_or_else(|| failed("repos entry is not an object"))?;
                    repo.entry("trx_id").or_insert_with(|| serde_json::json!(trx_id));
                }
            }
            obj.insert("version".to_string(), serde_json::json!(LOCK_VERSION));
            Ok(value)
        }
        Some(other) if other > LOCK_VERSION => Err(LockError::MigrationFailed {
            from: other,
            reason: "newer than this volt understands".to_string(),
        }),
        _ => Err(LockError::Corrupt {
            reason: "missing or invalid version field".to_string(),
        }),
    }
}
