//! NO-NEW-PRIVS: block privilege escalation via setuid/setgid binaries.
//!
//! No exception escape hatch: there is no compensating control for a
//! missing `no-new-privileges` flag.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services must set `security_opt: [no-new-privileges:true]`.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::NoNewPrivs,
        description: DESCRIPTION,
        severity: Severity::Critical,
        scope: Scope::Service,
        allows_exception: false,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    let Some(service) = service else {
        return Vec::new();
    };

    let compliant = service.security_opt.iter().any(|opt| {
        let normalized = opt.replace('=', ":");
        normalized == "no-new-privileges:true" || normalized == "no-new-privileges"
    });
    let fail_msg = format!(
        "service `{}` does not set `no-new-privileges:true` in security_opt",
        service.name
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "no-new-privileges is set",
        fail_msg,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::rules::test_support::failures;

    #[test]
    fn test_colon_form_passes() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    security_opt:
      - no-new-privileges:true
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_equals_form_passes() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    security_opt:
      - no-new-privileges=true
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_missing_security_opt_fails() {
        let yaml = "services:\n  web:\n    image: nginx:1.25\n";
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Critical);
    }

    #[test]
    fn test_unrelated_security_opt_fails() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    security_opt:
      - seccomp=unconfined
"#;
        assert_eq!(failures(def(), yaml).len(), 1);
    }

    #[test]
    fn test_no_exception_escape_hatch() {
        let yaml = r#"services:
  # why: vendor image refuses to start otherwise
  # compensating control: appliance on an isolated vlan
  appliance:
    image: vendor/appliance:3.1.0
"#;
        // The documented exception must not downgrade this rule.
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Critical);
    }
}
