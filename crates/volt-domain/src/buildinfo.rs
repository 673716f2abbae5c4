use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::lockfile::RepoKind;
use crate::repoid::RepoId;

/// Relative path -> git blob hash of the materialized file. Populated only
/// by the pinned object-database copy path; an empty map means "treat as
/// always dirty on the next build".
pub type FileMap = BTreeMap<String, String>;

/// One materialized repository in `build-info.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: RepoKind,
    pub path: RepoId,
    pub version: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dirty_worktree: bool,
    #[serde(default, skip_serializing_if = "FileMap::is_empty")]
    pub files: FileMap,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Persisted record of the last successful build
/// (`$EDITOR_ROOT/pack/volt/build-info.json`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    pub repos: Vec<ManifestEntry>,
}

impl BuildManifest {
    /// Reads the manifest; a missing file is an empty manifest (full build).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Atomic write: temp sibling, fsync, rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(out.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn find(&self, id: &RepoId) -> Option<&ManifestEntry> {
        self.repos.iter().find(|e| &e.path == id)
    }

    pub fn remove(&mut self, id: &RepoId) {
        self.repos.retain(|e| &e.path != id);
    }

    /// Inserts or replaces the entry for `entry.path`.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        self.remove(&entry.path);
        self.repos.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = BuildManifest::load(&dir.path().join("build-info.json")).unwrap();
        assert!(manifest.repos.is_empty());
    }

    #[test]
    fn roundtrip_with_file_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build-info.json");
        let mut manifest = BuildManifest::default();
        let mut files = FileMap::new();
        files.insert(
            "plugin/caw.vim".to_string(),
            "c4f3000000000000000000000000000000000000".to_string(),
        );
        manifest.upsert(ManifestEntry {
            kind: RepoKind::Git,
            path: RepoId::parse("tyru/caw.vim").unwrap(),
            version: "0123456789abcdef0123456789abcdef01234567".to_string(),
            dirty_worktree: false,
            files,
        });
        manifest.save(&path).unwrap();

        let loaded = BuildManifest::load(&path).unwrap();
        let entry = loaded.find(&RepoId::parse("tyru/caw.vim").unwrap()).unwrap();
        assert_eq!(entry.files.len(), 1);
        assert!(!entry.dirty_worktree);

        // dirty_worktree and an empty file map are omitted from the JSON.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("dirty_worktree"));
    }

    #[test]
    fn upsert_replaces() {
        let mut manifest = BuildManifest::default();
        let id = RepoId::parse("tyru/caw.vim").unwrap();
        for version in ["a", "b"] {
            manifest.upsert(ManifestEntry {
                kind: RepoKind::Static,
                path: id.clone(),
                version: version.to_string(),
                dirty_worktree: false,
                files: FileMap::new(),
            });
        }
        assert_eq!(manifest.repos.len(), 1);
        assert_eq!(manifest.find(&id).unwrap().version, "b");
    }
}
