//! RESTART-POLICY: services recover from crashes and host reboots.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services should set a restart policy such as `unless-stopped`.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::RestartPolicy,
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

    let compliant = service
        .restart
        .as_deref()
        .is_some_and(|policy| policy != "no");
    let fail_msg = format!(
        "service `{}` has no restart policy; set `restart: unless-stopped`",
        service.name
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "restart policy is set",
        fail_msg,
    )]
}
