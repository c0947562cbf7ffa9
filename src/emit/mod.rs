//! Script Emission Module
//!
//! Turns a validated control spec into files on disk.
//!
//! # Structure
//!
//! - [`driver`]: Build driver iterating job sets and definitions
//! - [`render`]: Job file serialization and template rendering
//! - [`manifest`]: Ordered list of generated scripts

pub mod driver;
pub mod manifest;
pub mod render;

pub use driver::{default_outdir, default_timestamp, BuildReport, Builder, EmittedJob};
pub use manifest::{read_manifest, write_manifest, Provenance};
pub use render::{read_job_file, render_text, write_job_file, ScriptRenderer, TemplateRenderer};
