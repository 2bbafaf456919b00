//! PORT-BINDING: published ports bind an explicit host interface.
//!
//! A bare `host:container` mapping (or an explicit `0.0.0.0`) exposes the
//! port on every interface, punching through host firewalls on some
//! platforms. Container-only ports publish nothing and are fine.

use crate::validator::model::Service;
use crate::validator::rules::{RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Published ports must bind an explicit host interface, never 0.0.0.0.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::PortBinding,
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

    let unbound: Vec<&str> = service
        .ports
        .iter()
        .map(String::as_str)
        .filter(|port| is_unbound(port))
        .collect();

    if unbound.is_empty() {
        let msg = if service.ports.is_empty() {
            "no ports published to the host"
        } else {
            "published ports bind explicit host interfaces"
        };
        return vec![Finding::pass(RuleId::PortBinding, Some(&service.name), msg)];
    }

    let excepted = def().allows_exception
        && ctx
            .exceptions
            .has_documented_exception(&service.name, RuleId::PortBinding);

    unbound
        .into_iter()
        .map(|port| {
            let msg = format!(
                "service `{}` publishes port `{}` without an explicit host interface; bind 127.0.0.1 or a LAN address",
                service.name, port
            );
            if excepted {
                Finding::accepted_exception(RuleId::PortBinding, &service.name, &msg)
            } else {
                Finding::fail(RuleId::PortBinding, Severity::Warning, Some(&service.name), msg)
            }
        })
        .collect()
}

/// Whether a short-syntax port mapping publishes on all interfaces.
fn is_unbound(port: &str) -> bool {
    let port = port.trim();
    // Strip a protocol suffix like /udp.
    let port = port.split('/').next().unwrap_or(port);

    // IPv6 host addresses are bracketed; treat any bracketed form as an
    // explicit binding except the unspecified address.
    if let Some(rest) = port.strip_prefix('[') {
        return rest.starts_with("::]");
    }

    let parts: Vec<&str> = port.split(':').collect();
    match parts.len() {
        // Container-only: nothing published on the host.
        1 => false,
        // host:container with no interface.
        2 => true,
        // ip:host:container.
        3 => parts[0] == "0.0.0.0",
        _ => false,
    }
}
