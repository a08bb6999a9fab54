//! Selection of stale pod log directories and dangling legacy log symlinks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::os::OsInterface;
use crate::pods::PodGetter;

/// Legacy per-container log symlinks are named `<pod>_<namespace>_<container>-<id>.log`.
const LEGACY_LOG_SUFFIX: &str = "log";

/// Pod log directories under `root` whose pod UID is unknown to `pods`.
///
/// Returns nothing unless `all_sources_ready`: until every pod source has
/// synced, an unknown UID may belong to a pod not yet observed.
pub fn select_pod_log_dirs(
    os: &dyn OsInterface,
    pods: &dyn PodGetter,
    root: &Path,
    all_sources_ready: bool,
) -> Result<Vec<PathBuf>> {
    if !all_sources_ready {
        debug!("gc:pod sources not ready, keeping all pod log directories");
        return Ok(Vec::new());
    }

    let names = os
        .read_dir(root)
        .with_context(|| format!("Failed to list pod log root {}", root.display()))?;
    Ok(names
        .into_iter()
        .filter(|uid| pods.is_pod_deleted(uid))
        .map(|uid| root.join(uid))
        .collect())
}

/// Legacy container log symlinks under `dir` whose target no longer exists.
pub fn select_dangling_symlinks(os: &dyn OsInterface, dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(format!("*.{}", LEGACY_LOG_SUFFIX));
    let links = os.glob(&pattern.to_string_lossy())?;
    Ok(links.into_iter().filter(|link| !os.exists(link)).collect())
}
