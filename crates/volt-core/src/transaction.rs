use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;
use volt_domain::VoltPaths;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("transaction lock is held by PID {pid}; remove {path} if that process is gone")]
    Held { pid: String, path: PathBuf },
    #[error("failed to create transaction lock: {0}")]
    Io(#[from] std::io::Error),
}

/// Scoped guard over `$VOLTPATH/trx.lock`. Every mutating command acquires
/// one before touching the lock document or the repos tree; dropping the
/// guard removes the sentinel.
///
/// The lock is advisory and cooperative: creation is exclusive, and the
/// write-then-read-back of our own pid is the race check. A sentinel left by
/// a crashed process must be removed manually.
pub struct Transaction {
    path: PathBuf,
    pid: String,
}

impl Transaction {
    pub fn acquire(paths: &VoltPaths) -> Result<Self, SentinelError> {
        let path = paths.trx_lock();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let pid = std::process::id().to_string();

        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                use std::io::Write as _;
                let mut file = file;
                file.write_all(pid.as_bytes())?;
                file.sync_all()?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(SentinelError::Held {
                    pid: holder.trim().to_string(),
                    path,
                });
            }
            Err(err) => return Err(err.into()),
        }

        // Another process may have won a create race on filesystems where
        // O_EXCL is unreliable; trust only what the file actually contains.
        let written = fs::read_to_string(&path)?;
        if written != pid {
            return Err(SentinelError::Held {
                pid: written.trim().to_string(),
                path,
            });
        }
        Ok(Self { path, pid })
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(content) if content == self.pid => {
                if let Err(err) = fs::remove_file(&self.path) {
                    warn!("failed to remove {}: {err}", self.path.display());
                }
            }
            Ok(content) => {
                warn!(
                    "cannot remove another process's trx.lock (held by PID {})",
                    content.trim()
                );
            }
            Err(_) => warn!("trx.lock was already removed"),
        }
    }
}
