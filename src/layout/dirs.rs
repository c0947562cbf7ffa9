//! Directory and Symlink Creation
//!
//! Every job set gets a directory named after its key, and every job a
//! directory named after the job. Next to each, a numbered symlink
//! (`subflow-N`, `step-N`) points at it so a pipeline position can be found
//! without knowing the names.
//!
//! Links are created relative to their directory with absolute link paths;
//! the process working directory is never changed. Existing entries are left
//! untouched, so reruns are idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{BuildError, Result};

/// Prefix of the numbered job set symlinks.
pub const SUBFLOW_PREFIX: &str = "subflow";

/// Prefix of the numbered job symlinks.
pub const STEP_PREFIX: &str = "step";

/// Creates `base_path` (and parents) and a sibling `subflow-{index}` symlink
/// pointing at it.
///
/// Returns the path of the symlink.
pub fn ensure_subflow_dir(base_path: &Path, index: usize) -> Result<PathBuf> {
    create_dir(base_path)?;
    link_sibling(base_path, &format!("{}-{}", SUBFLOW_PREFIX, index))
}

/// Creates the directory holding `job_file_path` and a sibling
/// `step-{index}` symlink pointing at it.
///
/// Returns the path of the symlink.
pub fn ensure_job_dir(job_file_path: &Path, index: usize) -> Result<PathBuf> {
    let job_dir = job_file_path
        .parent()
        .ok_or_else(|| invalid_path(job_file_path, "job file has no parent directory"))?;

    create_dir(job_dir)?;
    link_sibling(job_dir, &format!("{}-{}", STEP_PREFIX, index))
}

/// Creates a symlink `dir/link_name` pointing at `target`, unless an entry
/// with that name already exists.
///
/// `target` is stored as given, so a bare name yields a link relative to
/// `dir`.
pub fn link_in_dir(dir: &Path, link_name: &str, target: &Path) -> Result<PathBuf> {
    let link_path = dir.join(link_name);

    if fs::symlink_metadata(&link_path).is_ok() {
        debug!("Link already present: {}", link_path.display());
        return Ok(link_path);
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &link_path)
        .map_err(|e| BuildError::fs(&link_path, e))?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(target, &link_path)
        .map_err(|e| BuildError::fs(&link_path, e))?;
    #[cfg(not(any(unix, windows)))]
    return Err(BuildError::fs(
        &link_path,
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot link to {}: symlinks unsupported", target.display()),
        ),
    ));

    debug!("Linked {} -> {}", link_path.display(), target.display());
    Ok(link_path)
}

fn link_sibling(path: &Path, link_name: &str) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| invalid_path(path, "directory has no parent"))?;
    let name = path
        .file_name()
        .ok_or_else(|| invalid_path(path, "directory has no name"))?;

    link_in_dir(parent, link_name, Path::new(name))
}

fn create_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| BuildError::fs(path, e))?;
        debug!("Created directory: {}", path.display());
    }
    Ok(())
}

fn invalid_path(path: &Path, reason: &str) -> BuildError {
    BuildError::fs(path, io::Error::new(io::ErrorKind::InvalidInput, reason))
}
