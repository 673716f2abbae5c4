use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Site used when the input carries only `user/name`.
pub const DEFAULT_SITE: &str = "github.com";
/// Site of local-only repositories (`localhost/local/{name}`).
pub const LOCAL_SITE: &str = "localhost";
/// User of local-only repositories.
pub const LOCAL_USER: &str = "local";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoIdError {
    #[error("invalid format of repository: {0}")]
    InvalidFormat(String),
}

/// Canonical `{site}/{user}/{name}` identifier of a repository.
///
/// Accepted input forms:
/// 1. `user/name[.git]`
/// 2. `site/user/name[.git]`
/// 3. `scheme://site/user/name[.git]` for `git`, `http` and `https` schemes
///
/// Backslashes are normalized to forward slashes before parsing. Parsing is
/// case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    site: String,
    user: String,
    name: String,
}

impl RepoId {
    pub fn new(
        site: impl Into<String>,
        user: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            user: user.into(),
            name: name.into(),
        }
    }

    /// Normalizes a user-supplied repository string.
    pub fn parse(raw: &str) -> Result<Self, RepoIdError> {
        let normalized = raw.replace('\\', "/");
        let trimmed = normalized.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();

        let triple: Vec<&str> = match segments.as_slice() {
            [user, name] => vec![DEFAULT_SITE, user, name],
            [site, user, name] => vec![site, user, name],
            [scheme, ..] if matches!(*scheme, "https:" | "http:" | "git:") => {
                if segments.len() < 5 {
                    return Err(RepoIdError::InvalidFormat(raw.to_string()));
                }
                segments[segments.len() - 3..].to_vec()
            }
            _ => return Err(RepoIdError::InvalidFormat(raw.to_string())),
        };

        let name = triple[2].trim_end_matches('/');
        let name = name.strip_suffix(".git").unwrap_or(name);
        if triple[0].is_empty() || triple[1].is_empty() || name.is_empty() {
            return Err(RepoIdError::InvalidFormat(raw.to_string()));
        }
        Ok(Self::new(triple[0], triple[1], name))
    }

    /// Like [`RepoId::parse`], but a bare name (no `/`) becomes a local
    /// repository `localhost/local/{name}`.
    pub fn parse_local(raw: &str) -> Result<Self, RepoIdError> {
        if raw.is_empty() {
            return Err(RepoIdError::InvalidFormat(raw.to_string()));
        }
        if !raw.contains('/') && !raw.contains('\\') {
            return Ok(Self::new(LOCAL_SITE, LOCAL_USER, raw));
        }
        Self::parse(raw)
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        self.site == LOCAL_SITE && self.user == LOCAL_USER
    }

    /// The https URL the repository is cloned from.
    pub fn clone_url(&self) -> String {
        format!("https://{self}")
    }

    /// Flattens the identifier into a single directory name. Underscores are
    /// doubled and slashes become single underscores, so the mapping is
    /// reversible.
    pub fn encode_pack_name(&self) -> String {
        self.to_string().replace('_', "__").replace('/', "_")
    }

    /// Inverse of [`RepoId::encode_pack_name`].
    pub fn decode_pack_name(encoded: &str) -> Result<Self, RepoIdError> {
        let mut decoded = String::with_capacity(encoded.len());
        let mut chars = encoded.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '_' {
                decoded.push(c);
            } else if chars.peek() == Some(&'_') {
                chars.next();
                decoded.push('_');
            } else {
                decoded.push('/');
            }
        }
        let segments: Vec<&str> = decoded.split('/').collect();
        match segments.as_slice() {
            [site, user, name] if !site.is_empty() && !user.is_empty() && !name.is_empty() => {
                Ok(Self::new(*site, *user, *name))
            }
            _ => Err(RepoIdError::InvalidFormat(encoded.to_string())),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.user, self.name)
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RepoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RepoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}
