//! HEALTHCHECK: services report their own liveness.
//!
//! The exception escape hatch covers services with no health endpoint to
//! probe (e.g. batch workers).

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services should define a healthcheck with a non-empty test command.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::Healthcheck,
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

    let (compliant, fail_msg) = match &service.healthcheck {
        None => (
            false,
            format!("service `{}` has no healthcheck", service.name),
        ),
        Some(check) => (
            check.has_effective_test(),
            format!(
                "service `{}` healthcheck has no effective test command",
                service.name
            ),
        ),
    };

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "healthcheck with a test command is present",
        fail_msg,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::rules::test_support::{check_yaml, failures};

    #[test]
    fn test_exec_form_passes() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    healthcheck:
      test: ["CMD", "curl", "-f", "http://localhost/health"]
      interval: 30s
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_shell_form_passes() {
        let yaml = r#"
services:
  db:
    image: postgres:16.1
    healthcheck:
      test: pg_isready -U postgres
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_missing_healthcheck_fails() {
        let yaml = "services:\n  web:\n    image: nginx:1.25\n";
        assert_eq!(failures(def(), yaml).len(), 1);
    }

    #[test]
    fn test_none_test_fails() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    healthcheck:
      test: ["NONE"]
"#;
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("no effective test"));
    }

    #[test]
    fn test_disabled_healthcheck_fails() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    healthcheck:
      disable: true
"#;
        assert_eq!(failures(def(), yaml).len(), 1);
    }

    #[test]
    fn test_no_endpoint_exception() {
        let yaml = r#"services:
  # why: batch worker exposes no health endpoint
  # compensating control: job queue monitors task completion externally
  worker:
    image: worker:3.0.1
"#;
        let findings = check_yaml(def(), yaml);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].passed);
    }
}
