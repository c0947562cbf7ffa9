//! Build Errors
//!
//! Every failure the generator can hit maps onto one [`BuildError`]
//! variant. Variants are grouped into an [`ErrorKind`] so callers can tell
//! configuration mistakes (fix the control file) apart from filesystem
//! failures (which may succeed on a retry).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Coarse classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The control file is missing, malformed or inconsistent
    Configuration,
    /// A directory, symlink or file could not be created or written
    Filesystem,
    /// A script template could not be rendered
    Render,
    /// Placeholders remained unresolved (strict mode only)
    Substitution,
}

/// Errors raised while building a workflow.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read control file '{}': {source}", path.display())]
    ControlFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse control file: {0}")]
    ControlFileParse(#[from] serde_yaml::Error),

    #[error("Control file is missing required section '{0}'")]
    MissingSection(String),

    #[error("The common block must define '{0}' naming the job set key field")]
    MissingKeyPlaceholder(String),

    #[error("Job set #{index} has no '{field}' field (named by %KEY%)")]
    MissingKeyField { index: usize, field: String },

    #[error("Job set key '{0}' is used by more than one job set")]
    DuplicateJobSetKey(String),

    #[error("Job definition #{index} has no '{placeholder}' value")]
    MissingJobName { index: usize, placeholder: String },

    #[error("Job name '{0}' is defined more than once")]
    DuplicateJobName(String),

    #[error("Job '{job}' has no 'template_file' and the common block defines none")]
    MissingTemplate { job: String },

    #[error("Value of '{key}' must be a scalar, found a nested sequence or mapping")]
    NonScalarValue { key: String },

    #[error("Job '{job}' is not first in its chain but no previous job was recorded")]
    MissingPreviousJob { job: String },

    #[error("Filesystem error at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write job file '{}': {reason}", path.display())]
    Serialize { path: PathBuf, reason: String },

    #[error("Failed to render template '{}': {reason}", template.display())]
    Render { template: PathBuf, reason: String },

    #[error("Job '{job}' has unresolved placeholders: {}", tokens.join(", "))]
    UnresolvedPlaceholders { job: String, tokens: Vec<String> },
}

impl BuildError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns the coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Serialize { .. } | Self::Render { .. } => ErrorKind::Render,
            Self::UnresolvedPlaceholders { .. } => ErrorKind::Substitution,
            _ => ErrorKind::Configuration,
        }
    }

    /// Only filesystem failures can succeed when the same build is rerun.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Filesystem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = BuildError::MissingSection("job_sets".to_string());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());

        let err = BuildError::fs("/tmp/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.is_retryable());

        let err = BuildError::UnresolvedPlaceholders {
            job: "align".to_string(),
            tokens: vec!["%REF%".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::Substitution);
    }

    #[test]
    fn test_error_display_names_missing_key() {
        let err = BuildError::MissingTemplate {
            job: "rsync".to_string(),
        };
        assert!(err.to_string().contains("rsync"));
        assert!(err.to_string().contains("template_file"));

        let err = BuildError::MissingKeyField {
            index: 2,
            field: "SAMPLE".to_string(),
        };
        assert!(err.to_string().contains("SAMPLE"));
    }

    #[test]
    fn test_unresolved_display_lists_tokens() {
        let err = BuildError::UnresolvedPlaceholders {
            job: "align".to_string(),
            tokens: vec!["%A%".to_string(), "%B%".to_string()],
        };
        assert!(err.to_string().contains("%A%, %B%"));
    }
}
