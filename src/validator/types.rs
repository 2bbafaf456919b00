//! Core value types for the validator.
//!
//! - `Severity` - finding severity levels
//! - `RuleId` - closed set of baseline rule identifiers
//! - `Finding` - the outcome of evaluating one rule against one service
//!   (or the whole document)

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Severity of a finding.
///
/// Ordered from most to least severe: `Critical > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Baseline violations that must be fixed; any failed critical finding
    /// fails the whole document.
    Critical,
    /// Deviations that should be fixed but do not fail the document alone.
    Warning,
    /// Informational: compliant checks and accepted documented exceptions.
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the rank so Critical > Warning > Info.
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identifier for a baseline rule.
///
/// The baseline is a stable compliance set, not a plugin surface, so the
/// ids are a closed enum rather than open-ended strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum RuleId {
    CapDropAll,
    NoNewPrivs,
    ReadOnlyFs,
    ResourceLimits,
    LogRotation,
    Healthcheck,
    NetworkIsolation,
    SecretNotInline,
    ImageTagPinned,
    RestartPolicy,
    PortBinding,
}

impl RuleId {
    /// The stable external identifier (e.g. `CAP-DROP-ALL`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapDropAll => "CAP-DROP-ALL",
            Self::NoNewPrivs => "NO-NEW-PRIVS",
            Self::ReadOnlyFs => "READ-ONLY-FS",
            Self::ResourceLimits => "RESOURCE-LIMITS",
            Self::LogRotation => "LOG-ROTATION",
            Self::Healthcheck => "HEALTHCHECK",
            Self::NetworkIsolation => "NETWORK-ISOLATION",
            Self::SecretNotInline => "SECRET-NOT-INLINE",
            Self::ImageTagPinned => "IMAGE-TAG-PINNED",
            Self::RestartPolicy => "RESTART-POLICY",
            Self::PortBinding => "PORT-BINDING",
        }
    }

    /// All rule ids, in registry order.
    pub fn all() -> &'static [RuleId] {
        &[
            Self::CapDropAll,
            Self::NoNewPrivs,
            Self::ReadOnlyFs,
            Self::ResourceLimits,
            Self::LogRotation,
            Self::Healthcheck,
            Self::NetworkIsolation,
            Self::SecretNotInline,
            Self::ImageTagPinned,
            Self::RestartPolicy,
            Self::PortBinding,
        ]
    }

    /// Look up a rule id from its external identifier.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|id| id.as_str() == s)
    }
}

impl From<RuleId> for &'static str {
    fn from(id: RuleId) -> Self {
        id.as_str()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of evaluating one rule against one service or the document.
///
/// Findings are immutable value objects; the aggregator only sorts and
/// counts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: RuleId,
    pub severity: Severity,
    /// `None` means the finding is document-level.
    pub service_name: Option<String>,
    pub message: String,
    pub passed: bool,
    /// `true` when a failed check was accepted via a documented exception.
    pub accepted_exception: bool,
}

impl Finding {
    /// A failed check at the given severity.
    pub fn fail(
        rule_id: RuleId,
        severity: Severity,
        service_name: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            severity,
            service_name: service_name.map(String::from),
            message: message.into(),
            passed: false,
            accepted_exception: false,
        }
    }

    /// A compliant check, recorded at info severity for the audit trail.
    pub fn pass(rule_id: RuleId, service_name: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity: Severity::Info,
            service_name: service_name.map(String::from),
            message: message.into(),
            passed: true,
            accepted_exception: false,
        }
    }

    /// A baseline deviation covered by a documented exception.
    pub fn accepted_exception(rule_id: RuleId, service_name: &str, deviation: &str) -> Self {
        Self {
            rule_id,
            severity: Severity::Info,
            service_name: Some(service_name.to_string()),
            message: format!(
                "{} - accepted: documented exception (why + compensating control) found",
                deviation
            ),
            passed: true,
            accepted_exception: true,
        }
    }
}
