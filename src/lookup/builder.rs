//! Job Lookup Builder
//!
//! Produces the fully-resolved placeholder mapping for one concrete job
//! (one job set × one job definition). Layers are merged into a fresh map,
//! later layers overwriting earlier ones:
//!
//! 1. the job set descriptor
//! 2. the common block
//! 3. computed fields (`%DEPENDENCY%`, default `%STDOUT%` / `%STDERR%`)
//! 4. the job definition
//!
//! The merged map is then run through a [`PlaceholderResolver`].
//!
//! Default stream paths are written in placeholders and resolved against the
//! merged map, so a definition that overrides `%JOB_SET_OUTDIR%` or
//! `%TIMESTAMP%` moves its stdout/stderr along with it. Job directories are
//! always placed under the output root of the common block; such a job's
//! streams then land outside its job directory.

use log::debug;

use super::placeholders::PlaceholderResolver;
use crate::control::model::{
    DEPENDENCY_PLACEHOLDER, JOB_NAME_PLACEHOLDER, OUTDIR_PLACEHOLDER, STDERR_PLACEHOLDER,
    STDOUT_PLACEHOLDER, TEMPLATE_FILE_KEY, TIMESTAMP_PLACEHOLDER,
};
use crate::control::Layer;
use crate::error::{BuildError, Result};

/// The resolved placeholder mapping for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLookup {
    job_name: String,
    values: Layer,
}

impl JobLookup {
    /// Resolved `%JOB_NAME%`.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Resolved `template_file`, if any.
    pub fn template_file(&self) -> Option<&str> {
        self.values
            .get(TEMPLATE_FILE_KEY)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    /// Resolved `%DEPENDENCY%` (empty for the first job of a chain).
    pub fn dependency(&self) -> &str {
        self.values
            .get(DEPENDENCY_PLACEHOLDER)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Looks up a single resolved value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All resolved values, in merge order.
    pub fn values(&self) -> &Layer {
        &self.values
    }

    /// Consumes the lookup, returning the underlying map.
    pub fn into_values(self) -> Layer {
        self.values
    }
}

/// Builds the scheduler dependency directive for a job that must wait on
/// `previous_job_name`.
///
/// The job id is read from a shell variable named after the previous job,
/// which the submission wrapper sets from `sbatch --parsable`.
///
/// # Example
///
/// ```
/// use slurm_workflow_utils::lookup::dependency_directive;
///
/// assert_eq!(dependency_directive("rsync"), "--dependency=afterok:${rsync_JOB_ID}");
/// assert_eq!(dependency_directive("qc-pass.1"), "--dependency=afterok:${qc_pass_1_JOB_ID}");
/// ```
pub fn dependency_directive(previous_job_name: &str) -> String {
    let ident: String = previous_job_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("--dependency=afterok:${{{}_JOB_ID}}", ident)
}

/// Default stdout/stderr path for a job, expressed in placeholders so it
/// follows any override of the output root, timestamp or job name.
fn default_stream_path(job_set_key: &str, extension: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}.{}",
        OUTDIR_PLACEHOLDER,
        TIMESTAMP_PLACEHOLDER,
        job_set_key,
        JOB_NAME_PLACEHOLDER,
        JOB_NAME_PLACEHOLDER,
        extension
    )
}

/// Builds the resolved lookup for one job.
///
/// # Arguments
///
/// * `common` - Placeholders shared by all jobs
/// * `job_set` - Descriptor of the job set being expanded
/// * `job_set_key` - The job set's identifier (value of its `%KEY%` field)
/// * `definition` - The job definition being applied
/// * `step` - 1-based position of the definition in the chain
/// * `previous_job_name` - Resolved name of the job at `step - 1`
/// * `resolver` - Placeholder resolver applied to the merged map
///
/// # Errors
///
/// * [`BuildError::MissingPreviousJob`] when `step > 1` and no previous job
///   name is given
/// * [`BuildError::MissingTemplate`] when neither the definition nor the
///   common block names a template
/// * [`BuildError::MissingJobName`] when the definition has no job name
pub fn build_job_lookup(
    common: &Layer,
    job_set: &Layer,
    job_set_key: &str,
    definition: &Layer,
    step: usize,
    previous_job_name: Option<&str>,
    resolver: &dyn PlaceholderResolver,
) -> Result<JobLookup> {
    let declared_name = definition
        .get(JOB_NAME_PLACEHOLDER)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| BuildError::MissingJobName {
            index: step,
            placeholder: JOB_NAME_PLACEHOLDER.to_string(),
        })?;

    let dependency = match (step, previous_job_name) {
        (1, _) => String::new(),
        (_, Some(previous)) => dependency_directive(previous),
        (_, None) => {
            return Err(BuildError::MissingPreviousJob {
                job: declared_name.clone(),
            })
        }
    };

    let mut values = job_set.clone();
    values.extend(common.iter().map(|(k, v)| (k.clone(), v.clone())));

    values.insert(DEPENDENCY_PLACEHOLDER.to_string(), dependency);
    if !definition.contains_key(STDOUT_PLACEHOLDER) {
        values.insert(
            STDOUT_PLACEHOLDER.to_string(),
            default_stream_path(job_set_key, "stdout"),
        );
    }
    if !definition.contains_key(STDERR_PLACEHOLDER) {
        values.insert(
            STDERR_PLACEHOLDER.to_string(),
            default_stream_path(job_set_key, "stderr"),
        );
    }

    // A blank template in the definition falls back to the common one.
    values.extend(
        definition
            .iter()
            .filter(|(k, v)| k.as_str() != TEMPLATE_FILE_KEY || !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    let has_template = values
        .get(TEMPLATE_FILE_KEY)
        .is_some_and(|t| !t.trim().is_empty());
    if !has_template {
        return Err(BuildError::MissingTemplate {
            job: declared_name.clone(),
        });
    }

    resolver.resolve(&mut values);

    let job_name = values
        .get(JOB_NAME_PLACEHOLDER)
        .cloned()
        .unwrap_or_else(|| declared_name.clone());

    debug!("Lookup for {}/{}: {:?}", job_set_key, job_name, values);

    Ok(JobLookup { job_name, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::placeholders::BoundedSubstitution;

    fn layer(pairs: &[(&str, &str)]) -> Layer {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn common() -> Layer {
        layer(&[
            ("%KEY%", "SAMPLE"),
            ("%TIMESTAMP%", "2024-01-01"),
            ("%JOB_SET_OUTDIR%", "/tmp/out"),
            ("template_file", "default.sbatch"),
        ])
    }

    fn build(
        common: &Layer,
        job_set: &Layer,
        definition: &Layer,
        step: usize,
        previous: Option<&str>,
    ) -> Result<JobLookup> {
        build_job_lookup(
            common,
            job_set,
            "s1",
            definition,
            step,
            previous,
            &BoundedSubstitution::default(),
        )
    }

    #[test]
    fn test_definition_outdir_moves_default_streams() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "qc"), ("%JOB_SET_OUTDIR%", "/scratch/qc")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(
            lookup.get("%STDOUT%"),
            Some("/scratch/qc/2024-01-01/s1/qc/qc.stdout")
        );
        assert_eq!(
            lookup.get("%STDERR%"),
            Some("/scratch/qc/2024-01-01/s1/qc/qc.stderr")
        );
    }

    #[test]
    fn test_first_job_has_empty_dependency() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.job_name(), "rsync");
        assert_eq!(lookup.dependency(), "");
    }

    #[test]
    fn test_later_job_depends_on_previous() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "align")]),
            2,
            Some("rsync"),
        )
        .unwrap();

        assert_eq!(lookup.dependency(), "--dependency=afterok:${rsync_JOB_ID}");
    }

    #[test]
    fn test_later_job_without_previous_is_error() {
        let err = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "align")]),
            2,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::MissingPreviousJob { ref job } if job == "align"));
    }

    #[test]
    fn test_default_stream_paths() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(
            lookup.get("%STDOUT%"),
            Some("/tmp/out/2024-01-01/s1/rsync/rsync.stdout")
        );
        assert_eq!(
            lookup.get("%STDERR%"),
            Some("/tmp/out/2024-01-01/s1/rsync/rsync.stderr")
        );
    }

    #[test]
    fn test_explicit_stream_paths_kept() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync"), ("%STDOUT%", "/logs/out.txt")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.get("%STDOUT%"), Some("/logs/out.txt"));
        assert!(lookup.get("%STDERR%").unwrap().ends_with("rsync.stderr"));
    }

    #[test]
    fn test_common_overrides_job_set() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1"), ("%JOB_SET_OUTDIR%", "/elsewhere")]),
            &layer(&[("%JOB_NAME%", "rsync")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.get("%JOB_SET_OUTDIR%"), Some("/tmp/out"));
    }

    #[test]
    fn test_definition_overrides_common() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync"), ("template_file", "rsync.sbatch")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.template_file(), Some("rsync.sbatch"));
    }

    #[test]
    fn test_template_falls_back_to_common() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync"), ("template_file", "")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.template_file(), Some("default.sbatch"));
    }

    #[test]
    fn test_missing_template_is_error() {
        let mut common = common();
        common.shift_remove("template_file");

        let err = build(
            &common,
            &layer(&[("SAMPLE", "s1")]),
            &layer(&[("%JOB_NAME%", "rsync")]),
            1,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::MissingTemplate { .. }));
    }

    #[test]
    fn test_missing_job_name_is_error() {
        let err = build(&common(), &layer(&[("SAMPLE", "s1")]), &Layer::new(), 1, None)
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingJobName { .. }));
    }

    #[test]
    fn test_placeholders_resolved_across_layers() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1"), ("%FASTQ%", "/raw/SAMPLE.fastq")]),
            &layer(&[
                ("%JOB_NAME%", "align"),
                ("%CMD%", "bwa mem %FASTQ% > %JOB_NAME%.sam"),
            ]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.get("%FASTQ%"), Some("/raw/s1.fastq"));
        assert_eq!(lookup.get("%CMD%"), Some("bwa mem /raw/s1.fastq > align.sam"));
        assert_eq!(lookup.get("%KEY%"), Some("s1"));
    }

    #[test]
    fn test_job_name_resolved_through_placeholders() {
        let lookup = build(
            &common(),
            &layer(&[("SAMPLE", "s1"), ("%ALIGNER%", "bwa")]),
            &layer(&[("%JOB_NAME%", "%ALIGNER%-align")]),
            1,
            None,
        )
        .unwrap();

        assert_eq!(lookup.job_name(), "bwa-align");
        assert_eq!(
            lookup.get("%STDOUT%"),
            Some("/tmp/out/2024-01-01/s1/bwa-align/bwa-align.stdout")
        );
    }

    #[test]
    fn test_inputs_not_mutated() {
        let common = common();
        let job_set = layer(&[("SAMPLE", "s1")]);
        let definition = layer(&[("%JOB_NAME%", "rsync")]);

        let before = (common.clone(), job_set.clone(), definition.clone());
        build(&common, &job_set, &definition, 1, None).unwrap();

        assert_eq!((common, job_set, definition), before);
    }

    #[test]
    fn test_dependency_directive_sanitizes_name() {
        assert_eq!(
            dependency_directive("call-variants"),
            "--dependency=afterok:${call_variants_JOB_ID}"
        );
    }
}
