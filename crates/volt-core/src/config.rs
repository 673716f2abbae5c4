use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context as _, Result};
use toml_edit::{DocumentMut, Item, Value};

/// How the build engine realizes a repository under the runtime tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    #[default]
    Symlink,
    Copy,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "symlink" => Ok(Self::Symlink),
            "copy" => Ok(Self::Copy),
            other => bail!(
                "build.strategy is {other:?}: valid values are \"symlink\" or \"copy\""
            ),
        }
    }
}

/// Typed view of `$VOLTPATH/config.toml`. Unknown keys are ignored; missing
/// keys take defaults.
#[derive(Clone, Debug)]
pub struct Config {
    pub strategy: Strategy,
    pub create_skeleton_plugconf: bool,
    pub fallback_git_cmd: bool,
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::Symlink,
            create_skeleton_plugconf: true,
            fallback_git_cmd: false,
            aliases: BTreeMap::new(),
        }
    }
}

impl Config {
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
        Self::parse(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn parse(raw: &str) -> Result<Self> {
        let doc: DocumentMut = raw.parse()?;
        let mut config = Self::default();

        if let Some(strategy) = string_at(&doc, "build", "strategy") {
            config.strategy = strategy.parse()?;
        }
        if let Some(flag) = bool_at(&doc, "get", "create_skeleton_plugconf")? {
            config.create_skeleton_plugconf = flag;
        }
        if let Some(flag) = bool_at(&doc, "get", "fallback_git_cmd")? {
            config.fallback_git_cmd = flag;
        }

        if let Some(aliases) = doc.get("alias").and_then(Item::as_table) {
            for (name, item) in aliases.iter() {
                let Some(values) = item.as_array() else {
                    bail!("alias.{name} must be an array of strings");
                };
                let mut expansion = Vec::with_capacity(values.len());
                for value in values.iter() {
                    match value {
                        Value::String(s) => expansion.push(s.value().clone()),
                        _ => bail!("alias.{name} must contain only strings"),
                    }
                }
                config.aliases.insert(name.to_string(), expansion);
            }
        }

        Ok(config)
    }

    /// Expands a subcommand through `[alias]`, or returns `None` when the
    /// name is not aliased.
    pub fn expand_alias(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(Vec::as_slice)
    }
}

fn string_at<'d>(doc: &'d DocumentMut, table: &str, key: &str) -> Option<&'d str> {
    doc.get(table)?.get(key)?.as_str()
}

fn bool_at(doc: &DocumentMut, table: &str, key: &str) -> Result<Option<bool>> {
    match doc.get(table).and_then(|t| t.get(key)) {
        None => Ok(None),
        Some(item) => match item.as_bool() {
            Some(flag) => Ok(Some(flag)),
            None => bail!("{table}.{key} must be a boolean"),
        },
    }
}
