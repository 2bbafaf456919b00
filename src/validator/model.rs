//! Compose model builder: resolved YAML tree to a strongly typed document.
//!
//! Normalization applied while walking the tree:
//! - capability lists become uppercase token sets
//! - `mem_limit` is parsed to bytes (`k`/`m`/`g` suffixes, case-insensitive)
//! - `pids_limit` is parsed as an integer
//! - `read_only` defaults to `false`
//! - logging option keys are lowercased
//! - resource limits are also picked up from `deploy.resources.limits`
//!
//! Unparseable limit values keep their raw string so the rule engine can
//! fail closed instead of aborting. Unknown keys are preserved untouched so
//! new compose-spec fields never break the model.

use std::collections::{BTreeMap, BTreeSet};

use yaml_rust2::Yaml;

use crate::error::ModelError;
use crate::validator::loader;

/// An immutable, normalized view of one compose document.
#[derive(Debug, Clone, Default)]
pub struct ComposeDocument {
    /// Services keyed by name (name uniqueness comes from the YAML mapping).
    pub services: BTreeMap<String, Service>,
    /// Top-level network definitions.
    pub networks: BTreeMap<String, NetworkDef>,
    /// Top-level secret definitions.
    pub secrets: BTreeMap<String, SecretDef>,
    /// Raw source text, kept for comment-context lookups.
    pub source: String,
    /// Optional caller-supplied label (e.g. originating filename).
    pub context: Option<String>,
}

/// A single service definition.
#[derive(Debug, Clone, Default)]
pub struct Service {
    pub name: String,
    pub image: Option<String>,
    /// `cap_drop` entries, uppercased.
    pub capabilities_dropped: BTreeSet<String>,
    /// `cap_add` entries, uppercased.
    pub capabilities_added: BTreeSet<String>,
    pub security_opt: BTreeSet<String>,
    pub read_only: bool,
    /// Raw `mem_limit` value as written, if present.
    pub mem_limit_raw: Option<String>,
    /// `mem_limit` normalized to bytes; `None` with a raw value present
    /// means the value was unparseable.
    pub mem_limit_bytes: Option<u64>,
    pub cpus: Option<String>,
    pub pids_limit_raw: Option<String>,
    pub pids_limit: Option<i64>,
    pub logging: Option<Logging>,
    pub healthcheck: Option<Healthcheck>,
    /// Networks this service joins. Empty means the implicit default network.
    pub networks: BTreeSet<String>,
    pub network_mode: Option<String>,
    /// Names referenced under `secrets:`.
    pub secrets_used: BTreeSet<String>,
    pub environment: BTreeMap<String, String>,
    pub restart: Option<String>,
    /// Raw port mappings, short syntax (`ip:host:container` forms).
    pub ports: Vec<String>,
    /// All keys present on the service node, in source order. Unknown keys
    /// are preserved here but never validated.
    pub keys: Vec<String>,
    /// 1-indexed inclusive line range of the service definition, used to
    /// locate adjacent exception comments.
    pub source_line_range: (u32, u32),
}

/// Logging driver configuration.
#[derive(Debug, Clone, Default)]
pub struct Logging {
    pub driver: Option<String>,
    /// Option keys lowercased (`max-size`, `max-file`).
    pub options: BTreeMap<String, String>,
}

/// Healthcheck configuration.
#[derive(Debug, Clone, Default)]
pub struct Healthcheck {
    /// Test command: shell form yields one element, exec form one per item.
    pub test: Vec<String>,
    pub disable: bool,
}

impl Healthcheck {
    /// Whether the test command actually checks anything.
    pub fn has_effective_test(&self) -> bool {
        if self.disable {
            return false;
        }
        let meaningful: Vec<&str> = self
            .test
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("NONE"))
            .filter(|s| !matches!(*s, "CMD" | "CMD-SHELL"))
            .collect();
        !meaningful.is_empty()
    }
}

/// A top-level network definition.
#[derive(Debug, Clone, Default)]
pub struct NetworkDef {
    pub name: String,
    pub external: bool,
    pub driver: Option<String>,
}

/// A top-level secret definition.
#[derive(Debug, Clone, Default)]
pub struct SecretDef {
    pub name: String,
    pub file: Option<String>,
    pub external: bool,
    /// Host environment variable the secret is read from (Compose v2.23+).
    pub environment: Option<String>,
}

impl SecretDef {
    /// A secret must come from a file, an external store, or a host
    /// environment variable; anything else is an inline value.
    pub fn has_valid_source(&self) -> bool {
        self.file.is_some() || self.external || self.environment.is_some()
    }
}

/// Build a [`ComposeDocument`] from a fully resolved YAML tree.
pub fn build(
    tree: &Yaml,
    source: &str,
    context: Option<String>,
) -> Result<ComposeDocument, ModelError> {
    let root = tree.as_hash().ok_or(ModelError::RootNotMapping)?;

    let services_yaml = root
        .get(&Yaml::String("services".into()))
        .ok_or(ModelError::MissingServices)?;
    let services_hash = services_yaml
        .as_hash()
        .ok_or(ModelError::ServicesNotMapping)?;

    let mut doc = ComposeDocument {
        source: source.to_string(),
        context,
        ..Default::default()
    };

    for (name_yaml, service_yaml) in services_hash {
        if let Yaml::String(name) = name_yaml {
            let service = build_service(name, service_yaml)?;
            doc.services.insert(name.clone(), service);
        }
    }

    if let Some(networks) = root.get(&Yaml::String("networks".into())).and_then(Yaml::as_hash) {
        for (name_yaml, def_yaml) in networks {
            if let Yaml::String(name) = name_yaml {
                doc.networks.insert(name.clone(), build_network(name, def_yaml));
            }
        }
    }

    if let Some(secrets) = root.get(&Yaml::String("secrets".into())).and_then(Yaml::as_hash) {
        for (name_yaml, def_yaml) in secrets {
            if let Yaml::String(name) = name_yaml {
                doc.secrets.insert(name.clone(), build_secret(name, def_yaml));
            }
        }
    }

    assign_line_ranges(&mut doc, source);
    log::debug!(
        "modeled compose document: {} services, {} networks, {} secrets",
        doc.services.len(),
        doc.networks.len(),
        doc.secrets.len()
    );

    Ok(doc)
}

fn build_service(name: &str, yaml: &Yaml) -> Result<Service, ModelError> {
    let hash = match yaml {
        Yaml::Hash(h) => h,
        Yaml::Null => {
            return Ok(Service {
                name: name.to_string(),
                ..Default::default()
            });
        }
        _ => return Err(ModelError::ServiceNotMapping(name.to_string())),
    };

    let mut service = Service {
        name: name.to_string(),
        ..Default::default()
    };

    for (key, _) in hash {
        if let Yaml::String(k) = key {
            service.keys.push(k.clone());
        }
    }

    let get = |key: &str| hash.get(&Yaml::String(key.into()));

    if let Some(image) = get("image").and_then(Yaml::as_str) {
        service.image = Some(image.to_string());
    }

    service.capabilities_dropped = string_set(get("cap_drop"))
        .into_iter()
        .map(|c| c.to_uppercase())
        .collect();
    service.capabilities_added = string_set(get("cap_add"))
        .into_iter()
        .map(|c| c.to_uppercase())
        .collect();
    service.security_opt = string_set(get("security_opt"));

    service.read_only = match get("read_only") {
        Some(Yaml::Boolean(b)) => *b,
        Some(Yaml::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };

    parse_resource_limits(&mut service, get("mem_limit"), get("cpus"), get("pids_limit"));
    if let Some(limits) = get("deploy")
        .and_then(|d| d["resources"]["limits"].as_hash())
    {
        let lookup = |key: &str| limits.get(&Yaml::String(key.into()));
        if service.mem_limit_raw.is_none() {
            parse_resource_limits(&mut service, lookup("memory"), None, None);
        }
        if service.cpus.is_none() {
            parse_resource_limits(&mut service, None, lookup("cpus"), None);
        }
        if service.pids_limit_raw.is_none() {
            parse_resource_limits(&mut service, None, None, lookup("pids"));
        }
    }

    if let Some(logging) = get("logging").and_then(Yaml::as_hash) {
        let mut log_cfg = Logging {
            driver: logging
                .get(&Yaml::String("driver".into()))
                .and_then(Yaml::as_str)
                .map(String::from),
            ..Default::default()
        };
        if let Some(options) = logging.get(&Yaml::String("options".into())).and_then(Yaml::as_hash) {
            for (k, v) in options {
                if let Yaml::String(k) = k {
                    log_cfg
                        .options
                        .insert(k.to_lowercase(), scalar_to_string(v).unwrap_or_default());
                }
            }
        }
        service.logging = Some(log_cfg);
    }

    if let Some(healthcheck) = get("healthcheck").and_then(Yaml::as_hash) {
        let mut check = Healthcheck::default();
        match healthcheck.get(&Yaml::String("test".into())) {
            Some(Yaml::String(s)) => check.test.push(s.clone()),
            Some(Yaml::Array(items)) => {
                check.test = items.iter().filter_map(scalar_to_string).collect();
            }
            _ => {}
        }
        check.disable = matches!(
            healthcheck.get(&Yaml::String("disable".into())),
            Some(Yaml::Boolean(true))
        );
        service.healthcheck = Some(check);
    }

    match get("networks") {
        Some(Yaml::Array(items)) => {
            service.networks = items.iter().filter_map(Yaml::as_str).map(String::from).collect();
        }
        Some(Yaml::Hash(h)) => {
            for (k, _) in h {
                if let Yaml::String(k) = k {
                    service.networks.insert(k.clone());
                }
            }
        }
        _ => {}
    }
    if let Some(mode) = get("network_mode").and_then(Yaml::as_str) {
        service.network_mode = Some(mode.to_string());
    }

    if let Some(Yaml::Array(items)) = get("secrets") {
        for item in items {
            match item {
                Yaml::String(s) => {
                    service.secrets_used.insert(s.clone());
                }
                Yaml::Hash(h) => {
                    if let Some(source) = h.get(&Yaml::String("source".into())).and_then(Yaml::as_str) {
                        service.secrets_used.insert(source.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    match get("environment") {
        Some(Yaml::Hash(h)) => {
            for (k, v) in h {
                if let Yaml::String(k) = k {
                    service
                        .environment
                        .insert(k.clone(), scalar_to_string(v).unwrap_or_default());
                }
            }
        }
        Some(Yaml::Array(items)) => {
            for item in items.iter().filter_map(Yaml::as_str) {
                match item.split_once('=') {
                    Some((k, v)) => service.environment.insert(k.to_string(), v.to_string()),
                    None => service.environment.insert(item.to_string(), String::new()),
                };
            }
        }
        _ => {}
    }

    if let Some(restart) = get("restart").and_then(Yaml::as_str) {
        service.restart = Some(restart.to_string());
    }

    if let Some(Yaml::Array(items)) = get("ports") {
        for item in items {
            match item {
                Yaml::String(s) => service.ports.push(s.clone()),
                Yaml::Integer(i) => service.ports.push(i.to_string()),
                Yaml::Hash(h) => {
                    // Long syntax: flatten back to ip:published:target.
                    let field = |key: &str| {
                        h.get(&Yaml::String(key.into())).and_then(scalar_to_string)
                    };
                    let target = field("target").unwrap_or_default();
                    let mut raw = match field("published") {
                        Some(published) => format!("{}:{}", published, target),
                        None => target,
                    };
                    if let Some(ip) = field("host_ip") {
                        raw = format!("{}:{}", ip, raw);
                    }
                    if !raw.is_empty() {
                        service.ports.push(raw);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(service)
}

fn parse_resource_limits(
    service: &mut Service,
    mem: Option<&Yaml>,
    cpus: Option<&Yaml>,
    pids: Option<&Yaml>,
) {
    match mem {
        Some(Yaml::Integer(i)) => {
            service.mem_limit_raw = Some(i.to_string());
            service.mem_limit_bytes = u64::try_from(*i).ok();
        }
        Some(Yaml::String(s)) => {
            service.mem_limit_raw = Some(s.clone());
            service.mem_limit_bytes = parse_memory_bytes(s);
        }
        _ => {}
    }

    if let Some(value) = cpus.and_then(scalar_to_string) {
        service.cpus = Some(value);
    }

    match pids {
        Some(Yaml::Integer(i)) => {
            service.pids_limit_raw = Some(i.to_string());
            service.pids_limit = Some(*i);
        }
        Some(Yaml::String(s)) => {
            service.pids_limit_raw = Some(s.clone());
            service.pids_limit = s.trim().parse().ok();
        }
        _ => {}
    }
}

/// Parse a memory size string (`512m`, `1g`, `262144k`, `1024`) to bytes.
///
/// Unit suffixes are case-insensitive, with an optional trailing `b`.
pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    let lower = value.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(rest) = strip_unit(&lower, 'k') {
        (rest, 1024u64)
    } else if let Some(rest) = strip_unit(&lower, 'm') {
        (rest, 1024 * 1024)
    } else if let Some(rest) = strip_unit(&lower, 'g') {
        (rest, 1024 * 1024 * 1024)
    } else if let Some(rest) = lower.strip_suffix('b') {
        (rest.to_string(), 1)
    } else {
        (lower.clone(), 1)
    };

    let number: f64 = number.trim().parse().ok()?;
    if number < 0.0 {
        return None;
    }
    Some((number * multiplier as f64) as u64)
}

fn strip_unit(value: &str, unit: char) -> Option<String> {
    let without_b = value.strip_suffix('b').unwrap_or(value);
    without_b.strip_suffix(unit).map(String::from)
}

fn build_network(name: &str, yaml: &Yaml) -> NetworkDef {
    let mut def = NetworkDef {
        name: name.to_string(),
        ..Default::default()
    };

    if let Some(hash) = yaml.as_hash() {
        match hash.get(&Yaml::String("external".into())) {
            Some(Yaml::Boolean(b)) => def.external = *b,
            // Legacy form: external: { name: ... }
            Some(Yaml::Hash(_)) => def.external = true,
            _ => {}
        }
        if let Some(driver) = hash.get(&Yaml::String("driver".into())).and_then(Yaml::as_str) {
            def.driver = Some(driver.to_string());
        }
    }

    def
}

fn build_secret(name: &str, yaml: &Yaml) -> SecretDef {
    let mut def = SecretDef {
        name: name.to_string(),
        ..Default::default()
    };

    if let Some(hash) = yaml.as_hash() {
        if let Some(file) = hash.get(&Yaml::String("file".into())).and_then(Yaml::as_str) {
            def.file = Some(file.to_string());
        }
        match hash.get(&Yaml::String("external".into())) {
            Some(Yaml::Boolean(b)) => def.external = *b,
            Some(Yaml::Hash(_)) => def.external = true,
            _ => {}
        }
        if let Some(env) = hash.get(&Yaml::String("environment".into())).and_then(Yaml::as_str) {
            def.environment = Some(env.to_string());
        }
    }

    def
}

/// Attach 1-indexed line ranges to each service by scanning the raw source.
///
/// A service ends where the next service starts, or at the end of the file.
/// A comment block sitting directly above the next service documents that
/// service, not this one, so the range is trimmed back past it.
fn assign_line_ranges(doc: &mut ComposeDocument, source: &str) {
    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len().max(1) as u32;

    let mut starts: Vec<(String, u32)> = doc
        .services
        .keys()
        .filter_map(|name| loader::find_line_for_service(source, name).map(|l| (name.clone(), l)))
        .collect();
    starts.sort_by_key(|(_, line)| *line);

    for idx in 0..starts.len() {
        let (name, start) = starts[idx].clone();
        let end = match starts.get(idx + 1) {
            Some((_, next)) => trim_trailing_comments(&lines, start, next.saturating_sub(1)),
            None => total_lines,
        };
        if let Some(service) = doc.services.get_mut(&name) {
            service.source_line_range = (start, end);
        }
    }
}

/// Walk `end` back over the contiguous full-line comment block that abuts
/// the following service, keeping at least the service's own line.
fn trim_trailing_comments(lines: &[&str], start: u32, mut end: u32) -> u32 {
    while end > start {
        match lines.get(end as usize - 1) {
            Some(line) if line.trim_start().starts_with('#') => end -= 1,
            _ => break,
        }
    }
    end
}

fn string_set(yaml: Option<&Yaml>) -> BTreeSet<String> {
    match yaml {
        Some(Yaml::Array(items)) => items
            .iter()
            .filter_map(Yaml::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Yaml::String(s)) => std::iter::once(s.trim().to_string()).collect(),
        _ => BTreeSet::new(),
    }
}

fn scalar_to_string(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some(String::new()),
        _ => None,
    }
}
