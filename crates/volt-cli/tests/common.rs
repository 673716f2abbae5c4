#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use git2::{Repository, Signature};
use serde_json::Value;
use tempfile::TempDir;

/// Scratch HOME + VOLTPATH + a stub `vim` on PATH, so every test runs
/// against an isolated tree.
pub struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("volt-test")
            .tempdir()
            .expect("tempdir");
        fs::create_dir_all(temp.path().join("home")).expect("home dir");
        fs::create_dir_all(temp.path().join("volt")).expect("volt dir");

        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).expect("bin dir");
        let vim = bin.join("vim");
        fs::write(&vim, "#!/bin/sh\nexit 0\n").expect("stub vim");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(&vim, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { temp }
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    pub fn volt_root(&self) -> PathBuf {
        self.temp.path().join("volt")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("volt").expect("volt binary");
        cmd.env_clear()
            .env("HOME", self.home())
            .env("VOLTPATH", self.volt_root())
            .env("PATH", self.temp.path().join("bin"));
        cmd
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.volt_root().join("config.toml"), contents).expect("config.toml");
    }

    /// Seeds `$VOLTPATH/repos/{site}/{user}/{name}` with a one-commit git
    /// repository and returns the canonical identifier.
    pub fn seed_git_repo(&self, raw: &str, files: &[(&str, &str)]) -> String {
        let canonical = canonicalize(raw);
        let path = self.repos_path(&canonical);
        fs::create_dir_all(&path).expect("create repo dir");
        let repo = Repository::init(&path).expect("init repo");
        commit_files(&repo, files, "initial import");
        canonical
    }

    /// Seeds a local static repository and returns `localhost/local/{name}`.
    pub fn seed_static_repo(&self, name: &str, files: &[(&str, &str)]) -> String {
        let canonical = format!("localhost/local/{name}");
        let path = self.repos_path(&canonical);
        for (rel, contents) in files {
            let file = path.join(rel);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, contents).unwrap();
        }
        canonical
    }

    pub fn commit_to(&self, canonical: &str, files: &[(&str, &str)], message: &str) {
        let repo = Repository::open(self.repos_path(canonical)).expect("open repo");
        commit_files(&repo, files, message);
    }

    pub fn repos_path(&self, canonical: &str) -> PathBuf {
        let mut path = self.volt_root().join("repos");
        for segment in canonical.split('/') {
            path = path.join(segment);
        }
        path
    }

    pub fn pack_path(&self, canonical: &str) -> PathBuf {
        let encoded = canonical.replace('_', "__").replace('/', "_");
        self.home()
            .join(".vim")
            .join("pack")
            .join("volt")
            .join("start")
            .join(encoded)
    }

    pub fn lock_json(&self) -> Value {
        let raw = fs::read_to_string(self.volt_root().join("lock.json")).expect("lock.json");
        serde_json::from_str(&raw).expect("valid lock.json")
    }

    pub fn build_info(&self) -> Value {
        let path = self
            .home()
            .join(".vim")
            .join("pack")
            .join("volt")
            .join("build-info.json");
        let raw = fs::read_to_string(path).expect("build-info.json");
        serde_json::from_str(&raw).expect("valid build-info.json")
    }

    pub fn manifest_entry(&self, canonical: &str) -> Value {
        self.build_info()["repos"]
            .as_array()
            .expect("repos array")
            .iter()
            .find(|entry| entry["path"] == canonical)
            .unwrap_or_else(|| panic!("no manifest entry for {canonical}"))
            .clone()
    }
}

fn canonicalize(raw: &str) -> String {
    if raw.contains('/') {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() == 2 {
            format!("github.com/{raw}")
        } else {
            raw.to_string()
        }
    } else {
        format!("localhost/local/{raw}")
    }
}

fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) {
    let workdir = repo.workdir().expect("working repo").to_path_buf();
    for (rel, contents) in files {
        let file = workdir.join(rel);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file, contents).unwrap();
    }
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("volt-test", "volt-test@localhost").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "scratch").unwrap();
}
