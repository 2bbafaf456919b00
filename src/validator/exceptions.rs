//! Documented-exception extraction from compose comments.
//!
//! A service may deviate from an exception-friendly baseline rule when its
//! comments document both a "why" and a compensating control, e.g.:
//!
//! ```yaml
//! # why: pihole needs NET_ADMIN for DHCP
//! # compensating control: isolated dns network, no internet egress
//! services:
//!   pihole:
//!     ...
//! ```
//!
//! Detection is pattern-based, not semantic: the presence of both marker
//! phrases in the comment block immediately above the service, or in
//! comment lines inside the service block, is sufficient. If the block
//! names specific rule ids the exception is scoped to those ids only.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validator::model::ComposeDocument;
use crate::validator::types::RuleId;

static WHY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(why|reason)\s*[:=]").expect("valid regex"));

static COMPENSATION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(compensating[ -]control|compensated\s+by|mitigat(?:ion|ed\s+by))")
        .expect("valid regex")
});

// Single-word ids like HEALTHCHECK are valid tokens too; ordinary
// uppercase words are weeded out by `RuleId::parse`.
static RULE_ID_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9]*(?:-[A-Z][A-Z0-9]*)*\b").expect("valid regex"));

/// Per-service exception markers extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct ExceptionIndex {
    per_service: BTreeMap<String, ExceptionBlock>,
}

#[derive(Debug, Clone, Default)]
struct ExceptionBlock {
    has_why: bool,
    has_compensation: bool,
    /// Rule ids named in the comment block; empty means unscoped.
    scoped_to: BTreeSet<RuleId>,
}

impl ExceptionBlock {
    fn is_documented(&self) -> bool {
        self.has_why && self.has_compensation
    }
}

impl ExceptionIndex {
    /// Scan the document source once and index exception comments per service.
    pub fn from_document(doc: &ComposeDocument) -> Self {
        let lines: Vec<&str> = doc.source.lines().collect();
        let mut per_service = BTreeMap::new();

        for (name, service) in &doc.services {
            let (start, end) = service.source_line_range;
            if start == 0 {
                continue;
            }

            let mut block = ExceptionBlock::default();
            for comment in comment_block_above(&lines, start)
                .into_iter()
                .chain(comments_within(&lines, start, end))
            {
                block.has_why |= WHY_MARKER.is_match(&comment);
                block.has_compensation |= COMPENSATION_MARKER.is_match(&comment);
                for token in RULE_ID_TOKEN.find_iter(&comment) {
                    if let Some(id) = RuleId::parse(token.as_str()) {
                        block.scoped_to.insert(id);
                    }
                }
            }

            if block.is_documented() {
                log::debug!("service `{}` has a documented exception block", name);
                per_service.insert(name.clone(), block);
            }
        }

        Self { per_service }
    }

    /// Whether the service documents an exception applicable to `rule`.
    pub fn has_documented_exception(&self, service: &str, rule: RuleId) -> bool {
        match self.per_service.get(service) {
            Some(block) => block.scoped_to.is_empty() || block.scoped_to.contains(&rule),
            None => false,
        }
    }
}

/// Contiguous full-line comments immediately preceding `start` (1-indexed).
fn comment_block_above(lines: &[&str], start: u32) -> Vec<String> {
    let mut block = Vec::new();
    let mut idx = start as usize - 1; // index of the service line itself

    while idx > 0 {
        idx -= 1;
        let trimmed = lines[idx].trim();
        if let Some(comment) = trimmed.strip_prefix('#') {
            block.push(comment.trim().to_string());
        } else {
            break;
        }
    }

    block.reverse();
    block
}

/// Comment text (full-line or trailing) inside the service's line range.
fn comments_within(lines: &[&str], start: u32, end: u32) -> Vec<String> {
    let mut comments = Vec::new();
    for idx in start as usize..=(end as usize).min(lines.len()) {
        let line = lines[idx - 1];
        if let Some(pos) = line.find('#') {
            comments.push(line[pos + 1..].trim().to_string());
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::loader::load;
    use crate::validator::model::build;

    fn index_for(yaml: &str) -> ExceptionIndex {
        let tree = load(yaml).unwrap();
        let doc = build(&tree, yaml, None).unwrap();
        ExceptionIndex::from_document(&doc)
    }

    #[test]
    fn test_exception_block_above_service() {
        let yaml = r#"services:
  # why: legacy app writes to its install dir
  # compensating control: dedicated volume, nightly integrity scan
  legacy:
    image: legacy-app:2.4.1
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("legacy", RuleId::ReadOnlyFs));
        assert!(index.has_documented_exception("legacy", RuleId::ResourceLimits));
    }

    #[test]
    fn test_exception_inside_service_block() {
        let yaml = r#"services:
  web:
    image: nginx:1.25
    # why: upstream image has no pid accounting
    # compensated by: cgroup memory ceiling on the host
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("web", RuleId::ResourceLimits));
    }

    #[test]
    fn test_both_markers_required() {
        let yaml = r#"services:
  # why: we just felt like it
  web:
    image: nginx:1.25
"#;
        let index = index_for(yaml);
        assert!(!index.has_documented_exception("web", RuleId::CapDropAll));
    }

    #[test]
    fn test_scoped_to_named_rule() {
        let yaml = r#"services:
  # RESOURCE-LIMITS exception. why: batch job, host enforces cgroup limits
  # compensating control: systemd slice caps memory and pids
  batch:
    image: batch-runner:0.9.2
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("batch", RuleId::ResourceLimits));
        assert!(!index.has_documented_exception("batch", RuleId::CapDropAll));
    }

    #[test]
    fn test_scoped_to_single_word_rule_id() {
        let yaml = r#"services:
  # HEALTHCHECK exception. why: batch worker exposes no health endpoint
  # compensating control: job queue monitors task completion externally
  worker:
    image: worker:3.0.1
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("worker", RuleId::Healthcheck));
        assert!(!index.has_documented_exception("worker", RuleId::ReadOnlyFs));
    }

    #[test]
    fn test_uppercase_words_do_not_scope() {
        let yaml = r#"services:
  # why: pihole needs DHCP broadcast on the LAN
  # compensating control: isolated dns network, no internet egress
  pihole:
    image: pihole/pihole:2024.07.0
"#;
        // DHCP and LAN are not rule ids; the block stays unscoped.
        let index = index_for(yaml);
        assert!(index.has_documented_exception("pihole", RuleId::CapDropAll));
        assert!(index.has_documented_exception("pihole", RuleId::NetworkIsolation));
    }

    #[test]
    fn test_block_above_next_service_belongs_to_it_alone() {
        let yaml = r#"services:
  victim:
    image: victim:1.0.0
  # why: reverse proxy terminates tls for the lan
  # compensating control: host firewall restricts 443 to the lan subnet
  proxy:
    image: caddy:2.8.4
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("proxy", RuleId::PortBinding));
        assert!(!index.has_documented_exception("victim", RuleId::CapDropAll));
        assert!(!index.has_documented_exception("victim", RuleId::ReadOnlyFs));
    }

    #[test]
    fn test_comment_block_does_not_leak_to_next_service() {
        let yaml = r#"services:
  # why: needs scratch space
  # compensating control: tmpfs mount only
  worker:
    image: worker:1.0.0
  web:
    image: nginx:1.25
"#;
        let index = index_for(yaml);
        assert!(index.has_documented_exception("worker", RuleId::ReadOnlyFs));
        assert!(!index.has_documented_exception("web", RuleId::ReadOnlyFs));
    }
}
