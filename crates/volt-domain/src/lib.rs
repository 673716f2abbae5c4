#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod buildinfo;
pub mod lockfile;
pub mod paths;
pub mod repoid;

pub use buildinfo::{BuildManifest, ManifestEntry, FileMap};
pub use lockfile::{
    LockDocument, LockError, Profile, RepoEntry, RepoKind, LOCK_VERSION,
};
pub use paths::VoltPaths;
pub use repoid::{RepoId, RepoIdError, DEFAULT_SITE, LOCAL_SITE, LOCAL_USER};
