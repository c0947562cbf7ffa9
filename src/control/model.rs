//! Control File Data Model
//!
//! The control file declares the job sets (parallel branches, e.g. one per
//! sample) and the job definitions (pipeline stages) applied in order to every
//! job set.
//!
//! # Example YAML Format
//!
//! ```yaml
//! job_sets:
//!   - SAMPLE: sample-1
//!     FASTQ: /data/raw/sample-1.fastq.gz
//!   - SAMPLE: sample-2
//!     FASTQ: /data/raw/sample-2.fastq.gz
//!
//! workflow:
//!   common:
//!     "%KEY%": SAMPLE
//!     "%JOB_SET_OUTDIR%": /scratch/project/runs
//!     template_file: templates/default.sbatch
//!   definitions:
//!     - "%JOB_NAME%": rsync
//!     - "%JOB_NAME%": align
//!       template_file: templates/align.sbatch
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder in the common block naming the job set key field.
pub const KEY_PLACEHOLDER: &str = "%KEY%";

/// Placeholder for the build timestamp directory.
pub const TIMESTAMP_PLACEHOLDER: &str = "%TIMESTAMP%";

/// Placeholder for the output root directory.
pub const OUTDIR_PLACEHOLDER: &str = "%JOB_SET_OUTDIR%";

/// Placeholder holding each job definition's name.
pub const JOB_NAME_PLACEHOLDER: &str = "%JOB_NAME%";

/// Placeholder receiving the computed scheduler dependency directive.
pub const DEPENDENCY_PLACEHOLDER: &str = "%DEPENDENCY%";

/// Placeholder for the job's stdout path.
pub const STDOUT_PLACEHOLDER: &str = "%STDOUT%";

/// Placeholder for the job's stderr path.
pub const STDERR_PLACEHOLDER: &str = "%STDERR%";

/// Key referencing the script template for a job.
pub const TEMPLATE_FILE_KEY: &str = "template_file";

/// An ordered, flat key-value mapping.
///
/// Used for the common block, job set descriptors, job definitions and the
/// resolved per-job lookups. Insertion order is preserved because the
/// placeholder engine walks keys in that order.
pub type Layer = IndexMap<String, String>;

/// The parsed control file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ControlSpec {
    /// Parallel branches, each identified by the field named by `%KEY%`
    pub job_sets: Vec<Layer>,

    /// Placeholders shared by every job
    pub common: Layer,

    /// Pipeline stages, applied in order to every job set
    pub definitions: Vec<Layer>,
}

impl ControlSpec {
    /// Creates a control spec with the given common block and no job sets
    /// or definitions.
    ///
    /// # Example
    ///
    /// ```
    /// use slurm_workflow_utils::control::{ControlSpec, Layer};
    ///
    /// let mut common = Layer::new();
    /// common.insert("%KEY%".to_string(), "SAMPLE".to_string());
    ///
    /// let mut sample = Layer::new();
    /// sample.insert("SAMPLE".to_string(), "sample-1".to_string());
    ///
    /// let mut rsync = Layer::new();
    /// rsync.insert("%JOB_NAME%".to_string(), "rsync".to_string());
    ///
    /// let spec = ControlSpec::new(common)
    ///     .with_job_set(sample)
    ///     .with_definition(rsync);
    /// assert_eq!(spec.job_count(), 1);
    /// ```
    pub fn new(common: Layer) -> Self {
        Self {
            job_sets: Vec::new(),
            common,
            definitions: Vec::new(),
        }
    }

    /// Appends a job set.
    pub fn with_job_set(mut self, job_set: Layer) -> Self {
        self.job_sets.push(job_set);
        self
    }

    /// Appends a job definition.
    pub fn with_definition(mut self, definition: Layer) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Name of the job set field that identifies each job set.
    pub fn key_field(&self) -> Option<&str> {
        self.common
            .get(KEY_PLACEHOLDER)
            .map(String::as_str)
            .filter(|field| !field.is_empty())
    }

    /// Identifier of a job set, read through the `%KEY%` field name.
    pub fn job_set_key<'a>(&self, job_set: &'a Layer) -> Option<&'a str> {
        self.key_field()
            .and_then(|field| job_set.get(field))
            .map(String::as_str)
    }

    /// Number of scripts a full build emits.
    pub fn job_count(&self) -> usize {
        self.job_sets.len() * self.definitions.len()
    }

    /// Sets a common placeholder, replacing any value from the control file.
    pub fn set_common(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.common.insert(key.into(), value.into());
    }
}
