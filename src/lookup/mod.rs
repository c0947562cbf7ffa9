//! Job Lookup Module
//!
//! Merges the control file layers into one resolved placeholder mapping per
//! job.
//!
//! - [`placeholders`]: Bounded substitution engine
//! - [`builder`]: Layer merging and computed fields

pub mod builder;
pub mod placeholders;

pub use builder::{build_job_lookup, dependency_directive, JobLookup};
pub use placeholders::{
    resolve_placeholders, unresolved_placeholders, BoundedSubstitution, PlaceholderResolver,
    DEFAULT_ROUNDS,
};
