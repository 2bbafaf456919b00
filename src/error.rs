//! Error taxonomy for the validator.
//!
//! Two fatal error classes short-circuit the pipeline before any findings
//! are produced:
//! - [`ValidationError::Parse`] - the input is not well-formed YAML
//! - [`ValidationError::Model`] - the YAML is well-formed but lacks the
//!   minimum compose shape (no `services` key, or a structurally broken node)
//!
//! Recoverable problems (a single rule hitting malformed field data) never
//! surface here; the rule engine downgrades them to warning findings and
//! keeps going.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// A fatal error that prevented the document from being analyzed.
///
/// Callers can use this to distinguish "could not analyze" from
/// "analyzed and found problems" (which is a [`crate::validator::Report`]).
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The input text is not syntactically valid YAML.
    #[error("YAML parse error at line {line}, column {column}: {detail}")]
    Parse {
        /// 1-indexed line of the syntax error.
        line: u32,
        /// 1-indexed column of the syntax error.
        column: u32,
        /// Scanner detail message.
        detail: String,
    },

    /// The YAML parsed but does not have a usable compose structure.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Structurally valid YAML that cannot be modeled as a compose document.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("document has no `services` key")]
    MissingServices,

    #[error("document root must be a mapping")]
    RootNotMapping,

    #[error("`services` must be a mapping of service name to definition")]
    ServicesNotMapping,

    #[error("service `{0}` must be a mapping")]
    ServiceNotMapping(String),
}

impl ValidationError {
    /// Exit code for a command-line invocation: parse/model failures are 2.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
