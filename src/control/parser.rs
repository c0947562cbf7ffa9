//! Control File Parser
//!
//! Loads a control file from YAML into a [`ControlSpec`]. Top-level sections
//! are checked here so a missing section is reported by name instead of as a
//! generic deserialization error.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use serde_yaml::Value;

use super::model::{ControlSpec, Layer};
use super::validator::validate_control;
use crate::error::{BuildError, Result};

type RawLayer = IndexMap<String, Value>;

#[derive(Deserialize, Debug)]
struct RawControl {
    job_sets: Option<Vec<RawLayer>>,
    workflow: Option<RawWorkflow>,
}

#[derive(Deserialize, Debug)]
struct RawWorkflow {
    common: Option<RawLayer>,
    definitions: Option<Vec<RawLayer>>,
}

/// Loads and validates a control file.
///
/// # Arguments
///
/// * `path` - Path to the control YAML file
///
/// # Example
///
/// ```rust,no_run
/// use slurm_workflow_utils::control::load_control_file;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let spec = load_control_file("control.yaml")?;
///     println!("{} scripts will be generated", spec.job_count());
///     Ok(())
/// }
/// ```
pub fn load_control_file(path: impl AsRef<Path>) -> Result<ControlSpec> {
    let path = path.as_ref();
    info!("Loading control file: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|source| BuildError::ControlFileRead {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let spec = parse_control(&yaml_content)?;
    validate_control(&spec)?;

    info!(
        "Parsed {} job sets, {} job definitions",
        spec.job_sets.len(),
        spec.definitions.len()
    );

    Ok(spec)
}

/// Parses control YAML without validating cross-field consistency.
pub fn parse_control(yaml: &str) -> Result<ControlSpec> {
    let raw: RawControl = serde_yaml::from_str(yaml)?;

    let job_sets = raw
        .job_sets
        .ok_or_else(|| BuildError::MissingSection("job_sets".to_string()))?;
    let workflow = raw
        .workflow
        .ok_or_else(|| BuildError::MissingSection("workflow".to_string()))?;
    let common = workflow
        .common
        .ok_or_else(|| BuildError::MissingSection("workflow.common".to_string()))?;
    let definitions = workflow
        .definitions
        .ok_or_else(|| BuildError::MissingSection("workflow.definitions".to_string()))?;

    Ok(ControlSpec {
        job_sets: job_sets
            .into_iter()
            .map(flatten_layer)
            .collect::<Result<_>>()?,
        common: flatten_layer(common)?,
        definitions: definitions
            .into_iter()
            .map(flatten_layer)
            .collect::<Result<_>>()?,
    })
}

/// Converts YAML scalars to strings, keeping key order.
fn flatten_layer(raw: RawLayer) -> Result<Layer> {
    raw.into_iter()
        .map(|(key, value)| {
            let value = scalar_to_string(&key, value)?;
            Ok((key, value))
        })
        .collect()
}

fn scalar_to_string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Tagged(tagged) => scalar_to_string(key, tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err(BuildError::NonScalarValue {
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::model::{JOB_NAME_PLACEHOLDER, KEY_PLACEHOLDER};
    use tempfile::tempdir;

    const VALID: &str = r#"
job_sets:
  - SAMPLE: sample-1
    LANE: 3
  - SAMPLE: sample-2
    LANE: 4
workflow:
  common:
    "%KEY%": SAMPLE
    "%JOB_SET_OUTDIR%": /tmp/out
    template_file: default.sbatch
  definitions:
    - "%JOB_NAME%": rsync
    - "%JOB_NAME%": align
      "%MEM%": 16G
"#;

    #[test]
    fn test_parse_valid_control() {
        let spec = parse_control(VALID).unwrap();

        assert_eq!(spec.job_sets.len(), 2);
        assert_eq!(spec.definitions.len(), 2);
        assert_eq!(spec.common.get(KEY_PLACEHOLDER).unwrap(), "SAMPLE");
        assert_eq!(spec.definitions[1].get(JOB_NAME_PLACEHOLDER).unwrap(), "align");
    }

    #[test]
    fn test_parse_numbers_become_strings() {
        let spec = parse_control(VALID).unwrap();
        assert_eq!(spec.job_sets[0].get("LANE").unwrap(), "3");
    }

    #[test]
    fn test_parse_preserves_key_order() {
        let spec = parse_control(VALID).unwrap();
        let keys: Vec<&String> = spec.common.keys().collect();
        assert_eq!(keys, vec!["%KEY%", "%JOB_SET_OUTDIR%", "template_file"]);
    }

    #[test]
    fn test_parse_null_becomes_empty() {
        let yaml = r#"
job_sets: []
workflow:
  common:
    "%KEY%": SAMPLE
    "%EXTRA%":
  definitions: []
"#;
        let spec = parse_control(yaml).unwrap();
        assert_eq!(spec.common.get("%EXTRA%").unwrap(), "");
    }

    #[test]
    fn test_parse_missing_job_sets() {
        let yaml = "workflow:\n  common: {}\n  definitions: []\n";
        let err = parse_control(yaml).unwrap_err();
        assert!(matches!(err, BuildError::MissingSection(ref s) if s == "job_sets"));
    }

    #[test]
    fn test_parse_missing_workflow() {
        let err = parse_control("job_sets: []\n").unwrap_err();
        assert!(matches!(err, BuildError::MissingSection(ref s) if s == "workflow"));
    }

    #[test]
    fn test_parse_missing_common() {
        let yaml = "job_sets: []\nworkflow:\n  definitions: []\n";
        let err = parse_control(yaml).unwrap_err();
        assert!(matches!(err, BuildError::MissingSection(ref s) if s == "workflow.common"));
    }

    #[test]
    fn test_parse_missing_definitions() {
        let yaml = "job_sets: []\nworkflow:\n  common: {}\n";
        let err = parse_control(yaml).unwrap_err();
        assert!(matches!(err, BuildError::MissingSection(ref s) if s == "workflow.definitions"));
    }

    #[test]
    fn test_parse_nested_value_rejected() {
        let yaml = r#"
job_sets: []
workflow:
  common:
    "%KEY%": [a, b]
  definitions: []
"#;
        let err = parse_control(yaml).unwrap_err();
        assert!(matches!(err, BuildError::NonScalarValue { ref key } if key == "%KEY%"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse_control("this is not valid yaml: [[[").unwrap_err();
        assert!(matches!(err, BuildError::ControlFileParse(_)));
    }

    #[test]
    fn test_load_control_file_not_found() {
        let err = load_control_file("/nonexistent/path/control.yaml").unwrap_err();
        assert!(matches!(err, BuildError::ControlFileRead { .. }));
    }

    #[test]
    fn test_load_control_file_valid() {
        let temp_dir = tempdir().unwrap();
        let control_path = temp_dir.path().join("control.yaml");
        std::fs::write(&control_path, VALID).unwrap();

        let spec = load_control_file(&control_path).unwrap();
        assert_eq!(spec.job_count(), 4);
    }

    #[test]
    fn test_load_control_file_runs_validation() {
        let temp_dir = tempdir().unwrap();
        let control_path = temp_dir.path().join("control.yaml");
        std::fs::write(&control_path, VALID.replace("SAMPLE: sample-2", "OTHER: x")).unwrap();

        let err = load_control_file(&control_path).unwrap_err();
        assert!(matches!(err, BuildError::MissingKeyField { index: 2, .. }));
    }
}
