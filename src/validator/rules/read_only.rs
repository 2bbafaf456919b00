//! READ-ONLY-FS: immutable root filesystem.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services should run with `read_only: true` and writable tmpfs/volumes where needed.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::ReadOnlyFs,
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

    let fail_msg = format!(
        "service `{}` does not set `read_only: true`; mount tmpfs or named volumes for writable paths",
        service.name
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        service.read_only,
        "root filesystem is read-only",
        fail_msg,
    )]
}
