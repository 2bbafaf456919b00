//! Document loader: raw text to a fully resolved YAML tree.
//!
//! Compose authors lean on anchors and merge keys (`<<`) for DRY service
//! definitions, so both are resolved here, eagerly, before anything
//! downstream looks at the tree. yaml-rust2 expands `*alias` references at
//! load time; merge keys are spliced in by [`resolve_merge_keys`] with
//! explicit keys winning over merged ones.
//!
//! Also provides line-position helpers used to attach source locations to
//! services for exception-comment lookups.

use yaml_rust2::yaml::Hash;
use yaml_rust2::{Yaml, YamlLoader};

use crate::error::ValidationError;

/// Parse compose text into a single, fully resolved YAML document.
///
/// Fails with [`ValidationError::Parse`] carrying the scanner's line and
/// column on malformed input; never returns a partial tree.
pub fn load(text: &str) -> Result<Yaml, ValidationError> {
    let docs = YamlLoader::load_from_str(text).map_err(|e| {
        let marker = e.marker();
        ValidationError::Parse {
            line: marker.line() as u32,
            column: marker.col() as u32 + 1,
            detail: e.info().to_string(),
        }
    })?;

    let doc = docs.into_iter().next().unwrap_or(Yaml::Null);
    log::trace!("loaded YAML document, resolving merge keys");
    Ok(resolve_merge_keys(doc))
}

/// Recursively splice `<<` merge keys into their host mappings.
///
/// Per the merge-key spec, keys from sources earlier in a merge sequence
/// take precedence over later ones, and explicit keys in the host mapping
/// override all merged keys.
pub fn resolve_merge_keys(yaml: Yaml) -> Yaml {
    match yaml {
        Yaml::Hash(hash) => {
            let mut merged = Hash::new();
            let mut explicit = Hash::new();

            for (key, value) in hash {
                let value = resolve_merge_keys(value);
                if matches!(&key, Yaml::String(k) if k == "<<") {
                    match value {
                        Yaml::Hash(source) => {
                            for (k, v) in source {
                                merged.entry(k).or_insert(v);
                            }
                        }
                        Yaml::Array(sources) => {
                            for source in sources {
                                if let Yaml::Hash(source) = resolve_merge_keys(source) {
                                    for (k, v) in source {
                                        merged.entry(k).or_insert(v);
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                } else {
                    explicit.insert(key, value);
                }
            }

            // Explicit keys win; preserve their order after the merged base.
            for (k, v) in explicit {
                merged.insert(k, v);
            }
            Yaml::Hash(merged)
        }
        Yaml::Array(items) => Yaml::Array(items.into_iter().map(resolve_merge_keys).collect()),
        other => other,
    }
}

/// Find the 1-indexed line number for a nested key path in the raw source.
///
/// Walks the source line by line, matching each path element at increasing
/// indentation. Best-effort: YAML rendered on one line will not be found.
pub fn find_line_for_key(source: &str, path: &[&str]) -> Option<u32> {
    if path.is_empty() {
        return Some(1);
    }

    let mut current_indent = 0;
    let mut path_idx = 0;

    for (line_num, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        let target_key = path[path_idx];
        let key_pattern = format!("{}:", target_key);

        if (trimmed.starts_with(&key_pattern) || trimmed == target_key)
            && (path_idx == 0 || indent > current_indent)
        {
            path_idx += 1;
            current_indent = indent;

            if path_idx == path.len() {
                return Some((line_num + 1) as u32);
            }
        }
    }

    None
}

/// Find the line number where a service definition starts.
pub fn find_line_for_service(source: &str, service_name: &str) -> Option<u32> {
    find_line_for_key(source, &["services", service_name])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_simple() {
        let yaml = "services:\n  web:\n    image: nginx:1.25\n";
        let doc = load(yaml).unwrap();
        assert!(doc.as_hash().is_some());
    }

    #[test]
    fn test_load_malformed_reports_position() {
        let yaml = "services:\n  web:\n    image: [unterminated\n";
        let err = load(yaml).unwrap_err();
        match err {
            ValidationError::Parse { line, column, .. } => {
                assert!(line >= 3, "error should point into the document, got line {line}");
                assert!(column >= 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_key_resolution() {
        let yaml = r#"
x-defaults: &defaults
  read_only: true
  mem_limit: 256m

services:
  web:
    <<: *defaults
    image: nginx:1.25
    mem_limit: 512m
"#;
        let doc = load(yaml).unwrap();
        let web = &doc["services"]["web"];
        assert_eq!(web["read_only"].as_bool(), Some(true));
        assert_eq!(web["image"].as_str(), Some("nginx:1.25"));
        // Explicit key wins over the merged default.
        assert_eq!(web["mem_limit"].as_str(), Some("512m"));
    }

    #[test]
    fn test_merge_key_multiple_sources() {
        let yaml = r#"
x-a: &a
  cpus: "0.5"
x-b: &b
  pids_limit: 100

services:
  web:
    <<: [*a, *b]
    image: nginx:1.25
"#;
        let doc = load(yaml).unwrap();
        let web = &doc["services"]["web"];
        assert_eq!(web["cpus"].as_str(), Some("0.5"));
        assert_eq!(web["pids_limit"].as_i64(), Some(100));
    }

    #[test]
    fn test_find_line_for_key() {
        let yaml = r#"
services:
  web:
    image: nginx
  db:
    image: postgres
"#;
        assert_eq!(find_line_for_key(yaml, &["services"]), Some(2));
        assert_eq!(find_line_for_key(yaml, &["services", "web"]), Some(3));
        assert_eq!(find_line_for_key(yaml, &["services", "db"]), Some(5));
        assert_eq!(find_line_for_service(yaml, "nope"), None);
    }
}
