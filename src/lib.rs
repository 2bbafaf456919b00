//! # composeguard
//!
//! A static security-baseline validator for Docker Compose files. It parses
//! compose YAML (without contacting a Docker daemon or pulling images),
//! builds a normalized model of the declared services, evaluates a fixed set
//! of container-hardening rules against it, and aggregates the results into
//! a deterministic [`validator::Report`].
//!
//! Rules cover dropped capabilities, privilege escalation, read-only root
//! filesystems, resource limits, log rotation, healthchecks, network
//! isolation, inline credentials, image pinning, restart policies, and host
//! port bindings. Deliberate deviations can be accepted through documented
//! exception comments that state both a reason and a compensating control.
//!
//! Library entry point: [`validator::validate`].

pub mod cli;
pub mod error;
pub mod validator;

pub use error::{Result, ValidationError};
pub use validator::{validate, validate_with_context, Report, Verdict};

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
