//! Rule registry and evaluation engine.
//!
//! The baseline is a closed set: every rule is a plain function in a
//! compile-time table ([`RuleSet::baseline`]), not a runtime plugin
//! surface. The registry is an explicitly constructed value passed by
//! reference so tests can substitute a reduced set without global state.
//!
//! Rules are stateless and side-effect free. A rule that cannot be
//! evaluated for a service (malformed field data) fails closed with a
//! warning finding; it never aborts the evaluation of other rules or
//! services.

use rayon::prelude::*;

use crate::validator::exceptions::ExceptionIndex;
use crate::validator::model::{ComposeDocument, Service};
use crate::validator::types::{Finding, RuleId, Severity};

pub mod cap_drop;
pub mod healthcheck;
pub mod image_tag;
pub mod log_rotation;
pub mod network_isolation;
pub mod no_new_privileges;
pub mod port_binding;
pub mod read_only;
pub mod resource_limits;
pub mod restart_policy;
pub mod secrets;

/// Evaluation context shared by all rules for one document.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub doc: &'a ComposeDocument,
    pub exceptions: &'a ExceptionIndex,
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Evaluated once for the whole document (`service` is `None`).
    Document,
    /// Evaluated once per service.
    Service,
    /// Evaluated both ways (e.g. secret handling checks top-level
    /// definitions and per-service environment entries).
    Both,
}

/// A pure check: `(document, service?) -> findings`.
pub type CheckFn = fn(&RuleContext, Option<&Service>) -> Vec<Finding>;

/// One entry in the rule table.
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub id: RuleId,
    pub description: &'static str,
    pub severity: Severity,
    pub scope: Scope,
    pub allows_exception: bool,
    pub check: CheckFn,
}

/// An ordered, read-only set of rules.
///
/// Evaluation order never affects the finding set, only the raw collection
/// order, which the aggregator re-sorts deterministically.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RuleDef>,
}

impl RuleSet {
    /// The full security baseline.
    pub fn baseline() -> Self {
        Self {
            rules: vec![
                cap_drop::def(),
                no_new_privileges::def(),
                read_only::def(),
                resource_limits::def(),
                log_rotation::def(),
                healthcheck::def(),
                network_isolation::def(),
                secrets::def(),
                image_tag::def(),
                restart_policy::def(),
                port_binding::def(),
            ],
        }
    }

    /// A custom (typically reduced) set, for tests and embedding callers.
    pub fn with_rules(rules: Vec<RuleDef>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RuleDef] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Run every rule in the set against the document.
///
/// Document-scoped rules run once; service-scoped rules run once per
/// service, fanned out across threads (the per-service workload is
/// embarrassingly parallel). The returned order is not meaningful; the
/// aggregator imposes the deterministic report order.
pub fn evaluate(rules: &RuleSet, doc: &ComposeDocument) -> Vec<Finding> {
    let exceptions = ExceptionIndex::from_document(doc);
    let ctx = RuleContext {
        doc,
        exceptions: &exceptions,
    };

    let mut findings: Vec<Finding> = rules
        .rules()
        .iter()
        .filter(|r| matches!(r.scope, Scope::Document | Scope::Both))
        .flat_map(|r| (r.check)(&ctx, None))
        .collect();

    let services: Vec<&Service> = doc.services.values().collect();
    let service_findings: Vec<Finding> = services
        .par_iter()
        .flat_map_iter(|service| {
            rules
                .rules()
                .iter()
                .filter(|r| matches!(r.scope, Scope::Service | Scope::Both))
                .flat_map(|r| (r.check)(&ctx, Some(service)))
                .collect::<Vec<_>>()
        })
        .collect();
    findings.extend(service_findings);

    log::debug!(
        "evaluated {} rules over {} services: {} findings",
        rules.len(),
        doc.services.len(),
        findings.len()
    );
    findings
}

/// Standard pass/fail/exception outcome for a service-scoped check.
///
/// On failure, rules that admit documented exceptions consult the
/// exception index; an accepted exception downgrades the finding to an
/// info-severity note instead of the rule's failure severity.
pub(crate) fn outcome(
    ctx: &RuleContext,
    def: &RuleDef,
    service: &Service,
    compliant: bool,
    pass_msg: &str,
    fail_msg: String,
) -> Finding {
    if compliant {
        Finding::pass(def.id, Some(&service.name), pass_msg)
    } else if def.allows_exception
        && ctx
            .exceptions
            .has_documented_exception(&service.name, def.id)
    {
        Finding::accepted_exception(def.id, &service.name, &fail_msg)
    } else {
        Finding::fail(def.id, def.severity, Some(&service.name), fail_msg)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::loader::load;
    use crate::validator::model::build;

    fn doc_for(yaml: &str) -> ComposeDocument {
        let tree = load(yaml).unwrap();
        build(&tree, yaml, None).unwrap()
    }

    #[test]
    fn test_baseline_rule_ids_unique_and_complete() {
        let rules = RuleSet::baseline();
        let mut ids: Vec<&str> = rules.rules().iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rules.len(), "rule ids must be unique");
        assert_eq!(rules.len(), RuleId::all().len());
    }

    #[test]
    fn test_rule_order_does_not_change_finding_set() {
        let yaml = r#"
services:
  web:
    image: nginx:latest
    environment:
      DB_PASSWORD: hunter2
  db:
    image: postgres:16.1
"#;
        let doc = doc_for(yaml);

        let forward = RuleSet::baseline();
        let mut reversed_rules = forward.rules().to_vec();
        reversed_rules.reverse();
        let reversed = RuleSet::with_rules(reversed_rules);

        let sort = |mut findings: Vec<Finding>| {
            findings.sort_by(|a, b| {
                (a.rule_id, &a.service_name, &a.message).cmp(&(b.rule_id, &b.service_name, &b.message))
            });
            findings
        };

        assert_eq!(
            sort(evaluate(&forward, &doc)),
            sort(evaluate(&reversed, &doc))
        );
    }

    #[test]
    fn test_reduced_rule_set() {
        let yaml = "services:\n  web:\n    image: nginx:latest\n";
        let doc = doc_for(yaml);
        let reduced = RuleSet::with_rules(vec![cap_drop::def()]);
        let findings = evaluate(&reduced, &doc);
        assert!(findings.iter().all(|f| f.rule_id == RuleId::CapDropAll));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let yaml = r#"
services:
  a:
    image: one:1.0.0
  b:
    image: two:2.0.0
  c:
    image: three:3.0.0
"#;
        let doc = doc_for(yaml);
        let rules = RuleSet::baseline();
        let mut runs: Vec<Vec<Finding>> = (0..4).map(|_| evaluate(&rules, &doc)).collect();
        for run in &mut runs {
            run.sort_by(|a, b| {
                (a.rule_id, &a.service_name, &a.message).cmp(&(b.rule_id, &b.service_name, &b.message))
            });
        }
        assert!(runs.windows(2).all(|w| w[0] == w[1]));
    }
}
