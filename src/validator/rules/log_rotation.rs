//! LOG-ROTATION: bounded log growth on every service.
//!
//! Unrotated json-file logs are the classic slow disk-filler. Requires a
//! logging block whose options set both `max-size` and `max-file`.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Services must configure log rotation (`max-size` and `max-file`).";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::LogRotation,
        description: DESCRIPTION,
        severity: Severity::Warning,
        scope: Scope::Service,
        allows_exception: false,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    let Some(service) = service else {
        return Vec::new();
    };

    let (compliant, fail_msg) = match &service.logging {
        None => (
            false,
            format!(
                "service `{}` has no logging configuration; set max-size and max-file options",
                service.name
            ),
        ),
        Some(logging) => {
            // Drivers that do not write local files need no rotation.
            let local_driver = logging
                .driver
                .as_deref()
                .map_or(true, |d| matches!(d, "json-file" | "local"));
            let rotated = logging.options.contains_key("max-size")
                && logging.options.contains_key("max-file");
            let mut missing = Vec::new();
            if !logging.options.contains_key("max-size") {
                missing.push("max-size");
            }
            if !logging.options.contains_key("max-file") {
                missing.push("max-file");
            }
            (
                !local_driver || rotated,
                format!(
                    "service `{}` logging is missing rotation options: {}",
                    service.name,
                    missing.join(", ")
                ),
            )
        }
    };

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "log rotation is configured",
        fail_msg,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::rules::test_support::failures;

    #[test]
    fn test_rotation_configured_passes() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    logging:
      driver: json-file
      options:
        max-size: 10m
        max-file: "3"
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_no_logging_block_fails() {
        let yaml = "services:\n  web:\n    image: nginx:1.25\n";
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_max_file_named() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    logging:
      options:
        max-size: 10m
"#;
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("max-file"));
        assert!(!failed[0].message.contains("max-size,"));
    }

    #[test]
    fn test_remote_driver_needs_no_rotation() {
        let yaml = r#"
services:
  web:
    image: nginx:1.25
    logging:
      driver: syslog
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_anchor_shared_logging_counts() {
        let yaml = r#"
x-logging: &default-logging
  driver: json-file
  options:
    max-size: 10m
    max-file: "3"

services:
  web:
    image: nginx:1.25
    logging: *default-logging
"#;
        assert!(failures(def(), yaml).is_empty());
    }
}
