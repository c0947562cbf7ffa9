//! Build Manifest
//!
//! The manifest lists every generated script in emission order, one absolute
//! path per line, under a header of `#` comment lines recording where the
//! build came from. A submission wrapper walks it top to bottom.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use crate::error::{BuildError, Result};
use crate::layout::MANIFEST_FILE_NAME;
use crate::{APP_NAME, VERSION};

/// Where and when a build was produced.
#[derive(Debug, Clone)]
pub struct Provenance {
    /// Generating tool, e.g. `slurm-workflow-utils v0.1.0`
    pub tool: String,
    /// When the build started
    pub created: DateTime<Local>,
    /// Invoking user
    pub user: String,
    /// Control file the build was generated from
    pub control_file: Option<PathBuf>,
    /// Log file of the build
    pub log_file: Option<PathBuf>,
}

impl Provenance {
    /// Provenance for a build starting now, run by the current user.
    pub fn new() -> Self {
        Self {
            tool: format!("{} v{}", APP_NAME, VERSION),
            created: Local::now(),
            user: current_user(),
            control_file: None,
            log_file: None,
        }
    }

    /// Records the control file.
    pub fn with_control_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.control_file = Some(path.into());
        self
    }

    /// Records the log file.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the invoking user, taken from the environment.
pub fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn describe(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Writes the manifest to `<output_dir>/sbatch_scripts.txt`, replacing any
/// existing file.
///
/// Returns the manifest path.
pub fn write_manifest(
    script_paths: &[PathBuf],
    output_dir: &Path,
    provenance: &Provenance,
) -> Result<PathBuf> {
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);

    let header = [
        format!("# generated by: {}", provenance.tool),
        format!("# created: {}", provenance.created.to_rfc3339()),
        format!("# user: {}", provenance.user),
        format!("# control file: {}", describe(&provenance.control_file)),
        format!("# log file: {}", describe(&provenance.log_file)),
    ];
    let content: String = header
        .into_iter()
        .chain(script_paths.iter().map(|path| path.display().to_string()))
        .map(|line| line + "\n")
        .collect();

    fs::create_dir_all(output_dir).map_err(|e| BuildError::fs(output_dir, e))?;
    fs::write(&manifest_path, content).map_err(|e| BuildError::fs(&manifest_path, e))?;

    info!(
        "Manifest written: {} ({} scripts)",
        manifest_path.display(),
        script_paths.len()
    );
    Ok(manifest_path)
}

/// Reads the script paths from a manifest, skipping header comments and
/// blank lines.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::fs(path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn provenance() -> Provenance {
        Provenance::new()
            .with_control_file("/home/me/control.yaml")
            .with_log_file("/tmp/build.log")
    }

    #[test]
    fn test_write_manifest_header_and_order() {
        let temp_dir = tempdir().unwrap();
        let scripts = vec![
            PathBuf::from("/out/s1/rsync/rsync.sbatch.sh"),
            PathBuf::from("/out/s1/align/align.sbatch.sh"),
        ];

        let path = write_manifest(&scripts, temp_dir.path(), &provenance()).unwrap();

        assert_eq!(path, temp_dir.path().join("sbatch_scripts.txt"));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert!(lines[0].starts_with("# generated by: slurm-workflow-utils v"));
        assert!(lines[1].starts_with("# created: "));
        assert!(lines[2].starts_with("# user: "));
        assert_eq!(lines[3], "# control file: /home/me/control.yaml");
        assert_eq!(lines[4], "# log file: /tmp/build.log");
        assert_eq!(&lines[5..], &["/out/s1/rsync/rsync.sbatch.sh", "/out/s1/align/align.sbatch.sh"]);
    }

    #[test]
    fn test_manifest_is_newline_terminated() {
        let temp_dir = tempdir().unwrap();
        let scripts = vec![PathBuf::from("/out/s1/rsync/rsync.sbatch.sh")];

        let path = write_manifest(&scripts, temp_dir.path(), &provenance()).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert_eq!(content.matches('\n').count(), 6);
        assert!(content.ends_with("/out/s1/rsync/rsync.sbatch.sh\n"));
    }

    #[test]
    fn test_write_manifest_overwrites() {
        let temp_dir = tempdir().unwrap();
        let first = vec![PathBuf::from("/a.sh"), PathBuf::from("/b.sh")];
        let second = vec![PathBuf::from("/c.sh")];

        write_manifest(&first, temp_dir.path(), &provenance()).unwrap();
        let path = write_manifest(&second, temp_dir.path(), &provenance()).unwrap();

        assert_eq!(read_manifest(&path).unwrap(), second);
    }

    #[test]
    fn test_manifest_without_provenance_paths() {
        let temp_dir = tempdir().unwrap();
        let path = write_manifest(&[], temp_dir.path(), &Provenance::new()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# control file: -"));
        assert!(read_manifest(&path).unwrap().is_empty());
    }

    #[test]
    fn test_current_user_not_empty() {
        assert!(!current_user().is_empty());
    }
}
