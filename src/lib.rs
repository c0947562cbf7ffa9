//! slurm-workflow-utils - SLURM Workflow Builder
//!
//! Expands a YAML control file into a tree of ready-to-submit SLURM batch
//! scripts. Every job set (one sample, lane, chunk...) is run through the
//! same ordered chain of job definitions; each job depends on the one
//! before it in its chain.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`control`]: Control file model, parsing and validation
//! - [`lookup`]: Layer merging and placeholder substitution
//! - [`layout`]: Output paths, directories and numbered symlinks
//! - [`emit`]: Job files, script rendering and the build manifest
//!
//! # Example
//!
//! ```rust,no_run
//! use slurm_workflow_utils::{load_control_file, Builder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load and validate the control file
//!     let spec = load_control_file("control.yaml")?;
//!
//!     // Configure the build
//!     let mut builder = Builder::new(spec);
//!     builder.set_control_path("control.yaml");
//!     builder.set_outdir("/scratch/runs");
//!
//!     // Generate scripts and manifest
//!     let report = builder.run()?;
//!     println!("Manifest: {:?}", report.manifest);
//!     Ok(())
//! }
//! ```

pub mod control;
pub mod emit;
pub mod error;
pub mod layout;
pub mod lookup;

// Re-export commonly used types
pub use control::{load_control_file, ControlSpec, Layer};
pub use emit::{BuildReport, Builder};
pub use error::{BuildError, ErrorKind, Result};
pub use lookup::{build_job_lookup, resolve_placeholders, JobLookup};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "slurm-workflow-utils";
