//! Report aggregation: findings to a deterministic, summarized report.

use serde::Serialize;

use crate::validator::types::{Finding, Severity};

/// Overall verdict for a validated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Exit code for a command-line invocation: 0 = pass, 1 = fail.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }
}

/// Exact per-severity tallies across all findings, passed or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

/// The externally observable result of one validation call.
///
/// Built once per call by [`aggregate`] and otherwise throwaway; nothing is
/// cached across calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub verdict: Verdict,
    pub summary: Summary,
    pub findings: Vec<Finding>,
    /// Caller-supplied context label (e.g. originating filename); metadata
    /// only, never part of evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Report {
    /// Failed findings only, in report order.
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed)
    }
}

/// Aggregate findings into a [`Report`].
///
/// Sort is deterministic regardless of evaluation order: severity
/// descending, then rule id, then service name (document-level first).
/// The verdict is `fail` iff at least one critical finding failed;
/// warning-only outcomes are a soft pass.
pub fn aggregate(mut findings: Vec<Finding>, context: Option<String>) -> Report {
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.rule_id.as_str().cmp(b.rule_id.as_str()))
            .then_with(|| a.service_name.cmp(&b.service_name))
    });

    let mut summary = Summary::default();
    for finding in &findings {
        match finding.severity {
            Severity::Critical => summary.critical += 1,
            Severity::Warning => summary.warning += 1,
            Severity::Info => summary.info += 1,
        }
    }

    let failed_critical = findings
        .iter()
        .any(|f| f.severity == Severity::Critical && !f.passed);
    let verdict = if failed_critical {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    Report {
        verdict,
        summary,
        findings,
        context,
    }
}
