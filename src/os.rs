//! Filesystem operations used by the log reclaimers, behind a trait so the
//! reclaimers can be tested without touching the real log root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{trace, warn};

pub trait OsInterface: Send + Sync {
    /// Names of the entries directly under `path`.
    /// A missing directory yields an empty list.
    fn read_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Recursively remove `path`. Removing something already gone succeeds.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Paths matching a glob pattern
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Whether `path` exists, following symlinks
    fn exists(&self, path: &Path) -> bool;

    /// Remove a single file or symlink
    fn remove(&self, path: &Path) -> Result<()>;
}

/// The real filesystem.
pub struct RealOs;

impl OsInterface for RealOs {
    fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "os:directory missing, nothing to list");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read directory {}", path.display()));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("Failed to read entry in {}", path.display()))?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "os:skipping non utf-8 entry"),
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            // Files and symlinks are removed as entries, never followed
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "os:unreadable glob entry");
                    None
                }
            })
            .collect();
        Ok(paths)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}
