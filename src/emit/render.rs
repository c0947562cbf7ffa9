//! Script Rendering
//!
//! Handles the two per-job outputs:
//! - The job file: the resolved lookup serialized as YAML
//! - The batch script: a template with every lookup key replaced by its value
//!
//! Rendering sits behind [`ScriptRenderer`] so another template engine can
//! consume the same job files.

use std::fs;
use std::path::Path;

use log::debug;

use crate::control::Layer;
use crate::error::{BuildError, Result};

/// Renders a batch script from a job file and a template.
pub trait ScriptRenderer {
    /// Renders `template_file` with the lookup stored in `job_file`,
    /// writing the result to `output_script`.
    fn render(&self, job_file: &Path, template_file: &Path, output_script: &Path) -> Result<()>;
}

/// Default renderer: plain key substitution over the template text.
///
/// Keys are applied in job file order with substring matching, the same
/// rule used when resolving the lookup itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl ScriptRenderer for TemplateRenderer {
    fn render(&self, job_file: &Path, template_file: &Path, output_script: &Path) -> Result<()> {
        let lookup = read_job_file(job_file)?;

        let template = fs::read_to_string(template_file).map_err(|e| BuildError::Render {
            template: template_file.to_path_buf(),
            reason: e.to_string(),
        })?;

        let script = render_text(&template, &lookup);
        write_script(output_script, &script)?;

        debug!(
            "Rendered {} -> {}",
            template_file.display(),
            output_script.display()
        );
        Ok(())
    }
}

/// Replaces every lookup key found in `template` with its value.
pub fn render_text(template: &str, lookup: &Layer) -> String {
    lookup
        .iter()
        .filter(|(key, _)| !key.is_empty())
        .fold(template.to_string(), |text, (key, value)| {
            if text.contains(key.as_str()) {
                text.replace(key.as_str(), value)
            } else {
                text
            }
        })
}

/// Serializes a lookup to a YAML job file, overwriting any previous one.
pub fn write_job_file(lookup: &Layer, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(lookup).map_err(|e| BuildError::Serialize {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, yaml).map_err(|e| BuildError::fs(path, e))?;
    debug!("Job file written: {}", path.display());
    Ok(())
}

/// Reads a job file back into a lookup.
pub fn read_job_file(path: &Path) -> Result<Layer> {
    let yaml = fs::read_to_string(path).map_err(|e| BuildError::fs(path, e))?;
    serde_yaml::from_str(&yaml).map_err(|e| BuildError::Serialize {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Writes an executable script.
fn write_script(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| BuildError::fs(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| BuildError::fs(path, e))?;
    }

    Ok(())
}
