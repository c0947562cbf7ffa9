//! Control File Module
//!
//! Data structures, parsing and validation for the YAML control file that
//! drives a build.
//!
//! # Structure
//!
//! - [`model`]: Control spec, layers and the reserved placeholder names
//! - [`parser`]: YAML loading
//! - [`validator`]: Consistency checks run before any output is written

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{ControlSpec, Layer};
pub use parser::{load_control_file, parse_control};
pub use validator::validate_control;
