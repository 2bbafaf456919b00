//! CAP-DROP-ALL: every service drops all capabilities by default.
//!
//! Containers should start from zero capabilities (`cap_drop: [ALL]`) and
//! re-add only what they need via `cap_add`.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services must declare `cap_drop: [ALL]` and re-add only needed capabilities.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::CapDropAll,
        description: DESCRIPTION,
        severity: Severity::Critical,
        scope: Scope::Service,
        allows_exception: true,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    let Some(service) = service else {
        return Vec::new();
    };

    let compliant = service.capabilities_dropped.contains("ALL");
    let fail_msg = format!(
        "service `{}` does not declare `cap_drop: [ALL]`; drop all capabilities and re-add only what is needed",
        service.name
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "cap_drop includes ALL",
        fail_msg,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::rules::test_support::failures;

    #[test]
    fn test_cap_drop_all_passes() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    cap_drop:
      - ALL
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_lowercase_all_accepted() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    cap_drop:
      - all
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_missing_cap_drop_is_critical() {
        let yaml = "services:\n  web:\n    image: nginx:1.25\n";
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Critical);
        assert_eq!(failed[0].service_name.as_deref(), Some("web"));
    }

    #[test]
    fn test_partial_drop_not_enough() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    cap_drop:
      - NET_RAW
"#;
        assert_eq!(failures(def(), yaml).len(), 1);
    }

    #[test]
    fn test_documented_exception_downgrades_to_info() {
        let yaml = r#"services:
  # why: pihole needs NET_ADMIN and NET_RAW for DHCP
  # compensating control: isolated dns network with no egress
  pihole:
    image: pihole/pihole:2024.07.0
"#;
        let findings = crate::validator::rules::test_support::check_yaml(def(), yaml);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].passed);
        assert!(findings[0].message.contains("documented exception"));
    }
}
