//! Compose security-baseline validation pipeline.
//!
//! One call runs Loader -> Model Builder -> Rule Engine -> Aggregator,
//! synchronously and without shared state; concurrent calls need no
//! coordination. Fatal errors ([`crate::error::ValidationError`]) short-
//! circuit before any findings exist; a completed validation always yields
//! a full [`Report`], even when individual rules degraded to fail-closed
//! warnings.
//!
//! # Example
//!
//! ```rust
//! use composeguard::validator::{validate, Verdict};
//!
//! let compose = r#"
//! services:
//!   web:
//!     image: nginx:1.25.3
//! "#;
//!
//! let report = validate(compose).unwrap();
//! assert_eq!(report.verdict, Verdict::Fail);
//! ```

pub mod exceptions;
pub mod format;
pub mod loader;
pub mod model;
pub mod report;
pub mod rules;
pub mod types;

pub use exceptions::ExceptionIndex;
pub use format::OutputFormat;
pub use model::{ComposeDocument, NetworkDef, SecretDef, Service};
pub use report::{aggregate, Report, Summary, Verdict};
pub use rules::{evaluate, RuleSet};
pub use types::{Finding, RuleId, Severity};

use crate::error::Result;

/// Validate compose text against the full security baseline.
pub fn validate(text: &str) -> Result<Report> {
    validate_with_context(text, None)
}

/// Validate with an optional context label (e.g. the originating filename).
///
/// The label is carried into the report as metadata only; it never affects
/// evaluation.
pub fn validate_with_context(text: &str, context: Option<&str>) -> Result<Report> {
    let rules = RuleSet::baseline();
    validate_with_rules(text, context, &rules)
}

/// Validate against a caller-supplied rule set.
pub fn validate_with_rules(text: &str, context: Option<&str>, rules: &RuleSet) -> Result<Report> {
    log::debug!(
        "validating compose document{}",
        context.map(|c| format!(" ({c})")).unwrap_or_default()
    );

    let tree = loader::load(text)?;
    let doc = model::build(&tree, text, context.map(String::from))?;
    let findings = rules::evaluate(rules, &doc);
    let report = report::aggregate(findings, doc.context.clone());

    log::debug!(
        "verdict: {} ({} critical, {} warning, {} info)",
        report.verdict.as_str(),
        report.summary.critical,
        report.summary.warning,
        report.summary.info
    );
    Ok(report)
}
