//! NETWORK-ISOLATION: services stay inside explicit trust-zone networks.
//!
//! Three checks per service:
//! - references to undeclared, non-external networks (dangling refs; a
//!   finding rather than a model error, since the document may be a valid
//!   excerpt)
//! - `network_mode: host`, which bypasses network isolation entirely
//! - services left on the implicit default network in a multi-service
//!   document, where every service can reach every other

use crate::validator::model::Service;
use crate::validator::rules::{RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services must join explicit networks matching their trust zone.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::NetworkIsolation,
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

    let mut deviations = Vec::new();

    if service
        .network_mode
        .as_deref()
        .is_some_and(|mode| mode == "host")
    {
        deviations.push(format!(
            "service `{}` uses `network_mode: host`, bypassing network isolation",
            service.name
        ));
    }

    for network in &service.networks {
        if !ctx.doc.networks.contains_key(network) {
            deviations.push(format!(
                "service `{}` references network `{}` which is not declared under top-level `networks`",
                service.name, network
            ));
        }
    }

    if service.networks.is_empty() && service.network_mode.is_none() && ctx.doc.services.len() > 1 {
        deviations.push(format!(
            "service `{}` sits on the implicit default network shared by all services; attach it to an explicit network for its trust zone",
            service.name
        ));
    }

    if deviations.is_empty() {
        return vec![Finding::pass(
            RuleId::NetworkIsolation,
            Some(&service.name),
            "network attachment is explicit and declared",
        )];
    }

    let excepted = def().allows_exception
        && ctx
            .exceptions
            .has_documented_exception(&service.name, RuleId::NetworkIsolation);

    deviations
        .into_iter()
        .map(|msg| {
            if excepted {
                Finding::accepted_exception(RuleId::NetworkIsolation, &service.name, &msg)
            } else {
                Finding::fail(
                    RuleId::NetworkIsolation,
                    Severity::Warning,
                    Some(&service.name),
                    msg,
                )
            }
        })
        .collect()
}
