//! SECRET-NOT-INLINE: credentials come from `secrets:`, never literals.
//!
//! Document scope: every top-level secret must be sourced from a file, an
//! external store, or a host environment variable.
//! Service scope: environment entries whose key looks like a credential
//! must not carry a literal value, and `secrets:` references must resolve
//! to declared secrets.
//!
//! No exception escape hatch: there is no compensating control for a
//! credential committed into a compose file.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validator::model::Service;
use crate::validator::rules::{RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Credentials must be sourced via `secrets:`, never inline literals.";

static CREDENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|passwd|secret|token|api[_-]?key|private[_-]?key|credential)")
        .expect("valid regex")
});

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::SecretNotInline,
        description: DESCRIPTION,
        severity: Severity::Critical,
        scope: Scope::Both,
        allows_exception: false,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    match service {
        None => check_document(ctx),
        Some(service) => check_service(ctx, service),
    }
}

fn check_document(ctx: &RuleContext) -> Vec<Finding> {
    if ctx.doc.secrets.is_empty() {
        return Vec::new();
    }

    let mut findings: Vec<Finding> = ctx
        .doc
        .secrets
        .values()
        .filter(|secret| !secret.has_valid_source())
        .map(|secret| {
            Finding::fail(
                RuleId::SecretNotInline,
                Severity::Critical,
                None,
                format!(
                    "secret `{}` has no file, external, or environment source; never define secret values inline",
                    secret.name
                ),
            )
        })
        .collect();

    if findings.is_empty() {
        findings.push(Finding::pass(
            RuleId::SecretNotInline,
            None,
            "all declared secrets are sourced from files or external stores",
        ));
    }
    findings
}

fn check_service(ctx: &RuleContext, service: &Service) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (key, value) in &service.environment {
        if is_inline_credential(key, value) {
            findings.push(Finding::fail(
                RuleId::SecretNotInline,
                Severity::Critical,
                Some(&service.name),
                format!(
                    "service `{}` passes a credential as a literal in environment variable `{}`; use `secrets:` with a _FILE indirection instead",
                    service.name, key
                ),
            ));
        }
    }

    for secret in &service.secrets_used {
        if !ctx.doc.secrets.contains_key(secret) {
            findings.push(Finding::fail(
                RuleId::SecretNotInline,
                Severity::Warning,
                Some(&service.name),
                format!(
                    "service `{}` references secret `{}` which is not declared under top-level `secrets`",
                    service.name, secret
                ),
            ));
        }
    }

    if findings.is_empty() {
        findings.push(Finding::pass(
            RuleId::SecretNotInline,
            Some(&service.name),
            "no inline credentials in environment",
        ));
    }
    findings
}

/// A credential-looking key holding a literal value.
///
/// `*_FILE` keys point at secret mounts, and `$`-interpolations defer to
/// the deployment environment; neither is an inline literal.
fn is_inline_credential(key: &str, value: &str) -> bool {
    if !CREDENTIAL_KEY.is_match(key) {
        return false;
    }
    if key.to_uppercase().ends_with("_FILE") {
        return false;
    }
    let value = value.trim();
    !value.is_empty() && !value.starts_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::rules::test_support::failures;

    #[test]
    fn test_file_sourced_secret_passes() {
        let yaml = r#"
services:
  db:
    image: postgres:16.1
    environment:
      POSTGRES_PASSWORD_FILE: /run/secrets/db_password
    secrets:
      - db_password
secrets:
  db_password:
    file: ./secrets/db_password.txt
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_inline_password_is_critical() {
        let yaml = r#"
services:
  db:
    image: postgres:16.1
    environment:
      POSTGRES_PASSWORD: hunter2
"#;
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Critical);
        assert!(failed[0].message.contains("POSTGRES_PASSWORD"));
    }

    #[test]
    fn test_list_form_environment_checked() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
    environment:
      - API_TOKEN=abcd1234
"#;
        assert_eq!(failures(def(), yaml).len(), 1);
    }

    #[test]
    fn test_interpolated_value_tolerated() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
    environment:
      API_TOKEN: ${API_TOKEN}
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_file_indirection_key_tolerated() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
    environment:
      DB_PASSWORD_FILE: /run/secrets/db_password
"#;
        assert!(failures(def(), yaml).is_empty());
    }

    #[test]
    fn test_unsourced_secret_definition_flagged() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
secrets:
  api_key:
    data: sk-live-abcdef
"#;
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].service_name.is_none());
        assert_eq!(failed[0].severity, Severity::Critical);
    }

    #[test]
    fn test_dangling_secret_reference_is_warning() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
    secrets:
      - ghost
"#;
        let failed = failures(def(), yaml);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Warning);
        assert!(failed[0].message.contains("ghost"));
    }

    #[test]
    fn test_non_credential_env_ignored() {
        let yaml = r#"
services:
  app:
    image: example/app:1.0.0
    environment:
      DB_HOST: db
      LOG_LEVEL: info
"#;
        assert!(failures(def(), yaml).is_empty());
    }
}
