//! Control File Validation
//!
//! Checks that a [`ControlSpec`] can be expanded without ambiguity:
//! - The common block names a key field
//! - Every job set carries that field, with a unique value
//! - Every job definition has a unique declared job name (the build driver
//!   checks resolved names again per job set)
//! - Every job definition can resolve a template file
//!
//! The first violation aborts the build. Nothing touches the filesystem
//! before validation has passed.

use std::collections::HashSet;

use log::{debug, warn};

use super::model::{ControlSpec, JOB_NAME_PLACEHOLDER, KEY_PLACEHOLDER, TEMPLATE_FILE_KEY};
use crate::error::{BuildError, Result};

/// Validates the control spec, returning the first problem found.
pub fn validate_control(spec: &ControlSpec) -> Result<()> {
    debug!(
        "Validating control spec: {} job sets, {} definitions",
        spec.job_sets.len(),
        spec.definitions.len()
    );

    let key_field = spec
        .key_field()
        .ok_or_else(|| BuildError::MissingKeyPlaceholder(KEY_PLACEHOLDER.to_string()))?;

    if spec.job_sets.is_empty() {
        warn!("Control file declares no job sets; nothing will be generated");
    }

    if spec.definitions.is_empty() {
        warn!("Control file declares no job definitions; nothing will be generated");
    }

    let mut seen_keys: HashSet<&str> = HashSet::new();
    for (index, job_set) in spec.job_sets.iter().enumerate() {
        let key = job_set
            .get(key_field)
            .ok_or_else(|| BuildError::MissingKeyField {
                index: index + 1,
                field: key_field.to_string(),
            })?;

        if !seen_keys.insert(key.as_str()) {
            return Err(BuildError::DuplicateJobSetKey(key.clone()));
        }
    }

    let common_template = spec
        .common
        .get(TEMPLATE_FILE_KEY)
        .filter(|t| !t.trim().is_empty());

    let mut seen_names: HashSet<&str> = HashSet::new();
    for (index, definition) in spec.definitions.iter().enumerate() {
        let job_name = definition
            .get(JOB_NAME_PLACEHOLDER)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BuildError::MissingJobName {
                index: index + 1,
                placeholder: JOB_NAME_PLACEHOLDER.to_string(),
            })?;

        if !seen_names.insert(job_name) {
            return Err(BuildError::DuplicateJobName(job_name.to_string()));
        }

        let has_template = definition
            .get(TEMPLATE_FILE_KEY)
            .is_some_and(|t| !t.trim().is_empty());

        if !has_template && common_template.is_none() {
            return Err(BuildError::MissingTemplate {
                job: job_name.to_string(),
            });
        }
    }

    debug!("Control spec is valid");
    Ok(())
}
