//! Script Emission Driver
//!
//! Expands a control spec into its chain of batch scripts:
//! - Job sets are processed in order, each getting a subflow directory
//! - Within a job set, definitions are applied in order, each job depending
//!   on the one before it
//! - Every job gets a YAML job file and a rendered script
//! - A manifest listing all scripts is written last
//!
//! Processing is strictly sequential. Any error aborts the whole build and
//! no manifest is written.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info, warn};

use crate::control::model::{OUTDIR_PLACEHOLDER, TIMESTAMP_PLACEHOLDER};
use crate::control::{validate_control, ControlSpec};
use crate::error::{BuildError, Result};
use crate::layout::{absolute_path, ensure_job_dir, ensure_subflow_dir, BuildLayout};
use crate::lookup::{
    build_job_lookup, unresolved_placeholders, BoundedSubstitution, JobLookup,
    PlaceholderResolver,
};

use super::manifest::{current_user, write_manifest, Provenance};
use super::render::{write_job_file, ScriptRenderer, TemplateRenderer};

/// Format of the default build timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Directory name used under the temp dir when no output root is given.
const DEFAULT_OUTDIR_NAME: &str = "slurm-workflow-utils";

/// Default output root: `<temp dir>/<user>/slurm-workflow-utils`.
pub fn default_outdir() -> PathBuf {
    std::env::temp_dir()
        .join(current_user())
        .join(DEFAULT_OUTDIR_NAME)
}

/// Timestamp for a build starting now.
pub fn default_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One generated job.
#[derive(Debug, Clone)]
pub struct EmittedJob {
    /// Identifier of the job set the job belongs to
    pub job_set_key: String,
    /// 1-based position of the job within its chain
    pub step: usize,
    /// The resolved lookup the script was rendered from
    pub lookup: JobLookup,
    /// Path of the YAML job file
    pub job_file: PathBuf,
    /// Path of the rendered script
    pub script: PathBuf,
}

/// Outcome of a build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// `<outdir>/<timestamp>`
    pub root: PathBuf,
    /// Jobs in emission order
    pub jobs: Vec<EmittedJob>,
    /// Manifest path (`None` for dry runs)
    pub manifest: Option<PathBuf>,
}

impl BuildReport {
    /// Script paths in emission order.
    pub fn scripts(&self) -> Vec<PathBuf> {
        self.jobs.iter().map(|job| job.script.clone()).collect()
    }
}

/// Workflow build driver.
///
/// # Example
///
/// ```rust,no_run
/// use slurm_workflow_utils::control::load_control_file;
/// use slurm_workflow_utils::Builder;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let spec = load_control_file("control.yaml")?;
///     let mut builder = Builder::new(spec);
///     builder.set_control_path("control.yaml");
///     builder.set_outdir("/scratch/runs");
///
///     let report = builder.run()?;
///     println!("{} scripts generated", report.jobs.len());
///     Ok(())
/// }
/// ```
pub struct Builder {
    spec: ControlSpec,
    control_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    outdir: Option<PathBuf>,
    timestamp: Option<String>,
    dry_run: bool,
    strict: bool,
    resolver: Box<dyn PlaceholderResolver>,
    renderer: Box<dyn ScriptRenderer>,
}

impl Builder {
    /// Creates a builder for a control spec.
    pub fn new(spec: ControlSpec) -> Self {
        Self {
            spec,
            control_path: None,
            log_file: None,
            outdir: None,
            timestamp: None,
            dry_run: false,
            strict: false,
            resolver: Box::new(BoundedSubstitution::default()),
            renderer: Box::new(TemplateRenderer),
        }
    }

    /// Sets the control file path. Relative template paths resolve against
    /// its directory, and it is recorded in the manifest.
    pub fn set_control_path(&mut self, path: impl Into<PathBuf>) {
        self.control_path = Some(path.into());
    }

    /// Sets the log file path recorded in the manifest.
    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) {
        self.log_file = Some(path.into());
    }

    /// Overrides `%JOB_SET_OUTDIR%`.
    pub fn set_outdir(&mut self, dir: impl Into<PathBuf>) {
        self.outdir = Some(dir.into());
    }

    /// Overrides `%TIMESTAMP%`.
    pub fn set_timestamp(&mut self, timestamp: impl Into<String>) {
        self.timestamp = Some(timestamp.into());
    }

    /// Enables or disables dry run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Makes leftover placeholders an error instead of a warning.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Replaces the placeholder resolver.
    pub fn set_resolver(&mut self, resolver: impl PlaceholderResolver + 'static) {
        self.resolver = Box::new(resolver);
    }

    /// Replaces the script renderer.
    pub fn set_renderer(&mut self, renderer: impl ScriptRenderer + 'static) {
        self.renderer = Box::new(renderer);
    }

    /// Runs the build.
    ///
    /// 1. Applies output root and timestamp overrides to the common block
    /// 2. Validates the control spec
    /// 3. For each job set, creates its subflow directory
    /// 4. For each definition, builds the lookup, creates the job directory,
    ///    writes the job file and renders the script
    /// 5. Writes the manifest
    pub fn run(&mut self) -> Result<BuildReport> {
        let provenance = self.provenance();
        self.apply_overrides();
        validate_control(&self.spec)?;

        let layout = self.layout()?;
        info!(
            "Building {} job sets x {} definitions under {}{}",
            self.spec.job_sets.len(),
            self.spec.definitions.len(),
            layout.root().display(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let mut jobs = Vec::with_capacity(self.spec.job_count());

        for (set_index, job_set) in self.spec.job_sets.iter().enumerate() {
            let subflow = set_index + 1;
            let key = self.spec.job_set_key(job_set).ok_or_else(|| {
                BuildError::MissingKeyField {
                    index: subflow,
                    field: self.spec.key_field().unwrap_or_default().to_string(),
                }
            })?;

            info!("Job set {}: {}", subflow, key);

            if !self.dry_run {
                let link = ensure_subflow_dir(&layout.subflow_dir(key), subflow)?;
                debug!("Subflow link: {}", link.display());
            }

            let mut previous_job_name: Option<String> = None;
            let mut job_names: HashSet<String> = HashSet::new();

            for (def_index, definition) in self.spec.definitions.iter().enumerate() {
                let step = def_index + 1;
                let lookup = build_job_lookup(
                    &self.spec.common,
                    job_set,
                    key,
                    definition,
                    step,
                    previous_job_name.as_deref(),
                    self.resolver.as_ref(),
                )?;

                self.check_unresolved(key, &lookup)?;

                // Directories are named after the resolved name, not the declared one.
                if !job_names.insert(lookup.job_name().to_string()) {
                    return Err(BuildError::DuplicateJobName(lookup.job_name().to_string()));
                }

                let job_file = layout.job_file(key, lookup.job_name());
                let script = layout.script_file(key, lookup.job_name());

                if self.dry_run {
                    println!();
                    println!("[DRY RUN] {} / step {}: {}", key, step, lookup.job_name());
                    println!("  Job file: {}", job_file.display());
                    println!("  Script: {}", script.display());
                    println!("  Dependency: {}", lookup.dependency());
                } else {
                    self.emit(&lookup, &job_file, &script, step)?;
                }

                info!("  [{}] {} -> {}", step, lookup.job_name(), script.display());

                previous_job_name = Some(lookup.job_name().to_string());
                jobs.push(EmittedJob {
                    job_set_key: key.to_string(),
                    step,
                    lookup,
                    job_file,
                    script,
                });
            }
        }

        let manifest = if self.dry_run {
            None
        } else {
            let scripts: Vec<PathBuf> = jobs.iter().map(|job| job.script.clone()).collect();
            Some(write_manifest(&scripts, layout.root(), &provenance)?)
        };

        info!("Generated {} scripts", jobs.len());

        Ok(BuildReport {
            root: layout.root().to_path_buf(),
            jobs,
            manifest,
        })
    }

    /// Writes the job file and renders the script for one job.
    fn emit(&self, lookup: &JobLookup, job_file: &Path, script: &Path, step: usize) -> Result<()> {
        let link = ensure_job_dir(job_file, step)?;
        debug!("Step link: {}", link.display());

        write_job_file(lookup.values(), job_file)?;

        let template = lookup
            .template_file()
            .map(|t| self.template_path(t))
            .ok_or_else(|| BuildError::MissingTemplate {
                job: lookup.job_name().to_string(),
            })?;

        self.renderer.render(job_file, &template, script)
    }

    /// Resolves a template path against the control file's directory.
    fn template_path(&self, template: &str) -> PathBuf {
        let path = Path::new(template);
        if path.is_absolute() {
            return path.to_path_buf();
        }

        match self.control_path.as_deref().and_then(Path::parent) {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    fn check_unresolved(&self, key: &str, lookup: &JobLookup) -> Result<()> {
        let tokens = unresolved_placeholders(lookup.values());
        if tokens.is_empty() {
            return Ok(());
        }

        let job = format!("{}/{}", key, lookup.job_name());
        if self.strict {
            return Err(BuildError::UnresolvedPlaceholders { job, tokens });
        }

        warn!("Job '{}' has unresolved placeholders: {}", job, tokens.join(", "));
        Ok(())
    }

    /// CLI overrides win over the control file, which wins over defaults.
    fn apply_overrides(&mut self) {
        match &self.outdir {
            Some(dir) => {
                let dir = dir.display().to_string();
                self.spec.set_common(OUTDIR_PLACEHOLDER, dir);
            }
            None if !self.spec.common.contains_key(OUTDIR_PLACEHOLDER) => {
                let dir = default_outdir().display().to_string();
                info!("No output directory given, using {}", dir);
                self.spec.set_common(OUTDIR_PLACEHOLDER, dir);
            }
            None => {}
        }

        match &self.timestamp {
            Some(ts) => {
                let ts = ts.clone();
                self.spec.set_common(TIMESTAMP_PLACEHOLDER, ts);
            }
            None if !self.spec.common.contains_key(TIMESTAMP_PLACEHOLDER) => {
                self.spec.set_common(TIMESTAMP_PLACEHOLDER, default_timestamp());
            }
            None => {}
        }
    }

    /// Build root from the resolved common block.
    ///
    /// A relative output root is anchored at the working directory and
    /// written back to the common block, so every derived path is absolute.
    fn layout(&mut self) -> Result<BuildLayout> {
        let mut common = self.spec.common.clone();
        self.resolver.resolve(&mut common);

        let outdir = common
            .get(OUTDIR_PLACEHOLDER)
            .map(PathBuf::from)
            .unwrap_or_default();
        let timestamp = common
            .get(TIMESTAMP_PLACEHOLDER)
            .cloned()
            .unwrap_or_default();

        if outdir.is_absolute() {
            return Ok(BuildLayout::new(outdir, &timestamp));
        }

        let anchored = absolute_path(&outdir)?;
        debug!(
            "Anchored output root {} at {}",
            outdir.display(),
            anchored.display()
        );
        self.spec
            .set_common(OUTDIR_PLACEHOLDER, anchored.display().to_string());

        Ok(BuildLayout::new(anchored, &timestamp))
    }

    fn provenance(&self) -> Provenance {
        let mut provenance = Provenance::new();
        if let Some(path) = &self.control_path {
            provenance = provenance.with_control_file(path);
        }
        if let Some(path) = &self.log_file {
            provenance = provenance.with_log_file(path);
        }
        provenance
    }
}
