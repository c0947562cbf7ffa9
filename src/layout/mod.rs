//! Output Layout Module
//!
//! Path conventions for a build and the directory/symlink bookkeeping that
//! keeps them stable across reruns.
//!
//! ```text
//! <outdir>/<timestamp>/
//! ├── sbatch_scripts.txt
//! ├── subflow-1 -> sample-1
//! └── sample-1/
//!     ├── step-1 -> rsync
//!     └── rsync/
//!         ├── rsync.yaml
//!         └── rsync.sbatch.sh
//! ```

pub mod dirs;

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

pub use dirs::{ensure_job_dir, ensure_subflow_dir, link_in_dir};

/// File name of the build manifest.
pub const MANIFEST_FILE_NAME: &str = "sbatch_scripts.txt";

/// Extension of rendered scripts.
pub const SCRIPT_EXTENSION: &str = "sbatch.sh";

/// Extension of per-job lookup files.
pub const JOB_FILE_EXTENSION: &str = "yaml";

/// Anchors a relative path at the current working directory.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = env::current_dir().map_err(|e| BuildError::fs(path, e))?;
    Ok(cwd.join(path))
}

/// Paths for one build, rooted at `<outdir>/<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    /// Creates the layout for a build under `outdir`.
    pub fn new(outdir: impl AsRef<Path>, timestamp: &str) -> Self {
        Self {
            root: outdir.as_ref().join(timestamp),
        }
    }

    /// `<outdir>/<timestamp>`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<key>`
    pub fn subflow_dir(&self, job_set_key: &str) -> PathBuf {
        self.root.join(job_set_key)
    }

    /// `<root>/<key>/<job>`
    pub fn job_dir(&self, job_set_key: &str, job_name: &str) -> PathBuf {
        self.subflow_dir(job_set_key).join(job_name)
    }

    /// `<root>/<key>/<job>/<job>.yaml`
    pub fn job_file(&self, job_set_key: &str, job_name: &str) -> PathBuf {
        self.job_dir(job_set_key, job_name)
            .join(format!("{}.{}", job_name, JOB_FILE_EXTENSION))
    }

    /// `<root>/<key>/<job>/<job>.sbatch.sh`
    pub fn script_file(&self, job_set_key: &str, job_name: &str) -> PathBuf {
        self.job_dir(job_set_key, job_name)
            .join(format!("{}.{}", job_name, SCRIPT_EXTENSION))
    }

    /// `<root>/sbatch_scripts.txt`
    pub fn manifest_file(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }
}
