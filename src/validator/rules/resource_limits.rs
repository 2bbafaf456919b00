//! RESOURCE-LIMITS: memory, CPU, and pid ceilings on every service.
//!
//! Presence matters more than the value: an unbounded service can OOM the
//! host, starve neighbors, or fork-bomb it. A present-but-unparseable
//! limit fails closed as a warning naming the malformed value.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services must set mem_limit, cpus, and pids_limit (or deploy.resources.limits).";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::ResourceLimits,
        description: DESCRIPTION,
        severity: Severity::Warning,
        scope: Scope::Service,
        allows_exception: true,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    let Some(service) = service else {
        return Vec::new();
    };

    // Fail closed on malformed values: the limit exists but cannot be
    // evaluated, so report it instead of treating it as satisfied.
    if let Some(raw) = &service.mem_limit_raw {
        if service.mem_limit_bytes.is_none() {
            return vec![Finding::fail(
                RuleId::ResourceLimits,
                Severity::Warning,
                Some(&service.name),
                format!(
                    "service `{}` has a mem_limit of `{}` that could not be evaluated as a byte count",
                    service.name, raw
                ),
            )];
        }
    }
    if let Some(raw) = &service.pids_limit_raw {
        if service.pids_limit.is_none() {
            return vec![Finding::fail(
                RuleId::ResourceLimits,
                Severity::Warning,
                Some(&service.name),
                format!(
                    "service `{}` has a pids_limit of `{}` that could not be evaluated as an integer",
                    service.name, raw
                ),
            )];
        }
    }

    let mut missing = Vec::new();
    if service.mem_limit_raw.is_none() {
        missing.push("mem_limit");
    }
    if service.cpus.is_none() {
        missing.push("cpus");
    }
    if service.pids_limit_raw.is_none() {
        missing.push("pids_limit");
    }

    let fail_msg = format!(
        "service `{}` is missing resource limits: {}",
        service.name,
        missing.join(", ")
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        missing.is_empty(),
        "mem_limit, cpus, and pids_limit are all set",
        fail_msg,
    )]
}
