//! The probe catalog: parsed probe records and their compiled match rules.
//! Built once at engine construction and thereafter immutable; every scan
//! holds only shared references into it.

pub mod normalize;
pub mod parse;

use crate::error::CatalogParseError;
use crate::types::Protocol;
use pcre2::bytes::Regex;
use std::collections::{HashMap, HashSet};

/// A deduplicated set of port numbers parsed from an expression like
/// `80,443,8000-8100`. No probe in practice lists more than a few dozen
/// ports, but a hash set keeps a wide range like `0-65535` cheap too.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PortList(HashSet<u16>);

impl PortList {
    pub fn parse(expr: &str) -> Result<PortList, CatalogParseError> {
        let mut ports = HashSet::new();
        for part in expr.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(CatalogParseError::BadPortList(expr.to_string()));
            }
            if let Some((start, end)) = part.split_once('-') {
                let start: u16 = start
                    .parse()
                    .map_err(|_| CatalogParseError::BadPortList(expr.to_string()))?;
                let end: u16 = end
                    .parse()
                    .map_err(|_| CatalogParseError::BadPortList(expr.to_string()))?;
                if start > end {
                    return Err(CatalogParseError::BadPortList(expr.to_string()));
                }
                for p in start..=end {
                    ports.insert(p);
                }
            } else {
                let p: u16 = part
                    .parse()
                    .map_err(|_| CatalogParseError::BadPortList(expr.to_string()))?;
                ports.insert(p);
            }
        }
        Ok(PortList(ports))
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Flags following the closing pattern delimiter: `i` (ASCII
/// case-insensitive) and/or `s` (`.` matches newline). nmap's own catalog
/// occasionally combines both (`si`), so this is a small flag pair rather
/// than an either/or choice.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchOptions {
    pub case_insensitive: bool,
    pub single_line: bool,
}

/// Literal or `$N`-templated extraction fields.
#[derive(Clone, Debug, Default)]
pub struct VersionMeta {
    pub product: String,
    pub version: String,
    pub info: String,
    pub hostname: String,
    pub os: String,
    pub device: String,
    pub cpe: String,
}

impl VersionMeta {
    fn is_empty(&self) -> bool {
        self.product.is_empty()
            && self.version.is_empty()
            && self.info.is_empty()
            && self.hostname.is_empty()
            && self.os.is_empty()
            && self.device.is_empty()
            && self.cpe.is_empty()
    }
}

/// One fingerprint row inside a probe.
pub struct MatchRule {
    pub soft: bool,
    pub service: String,
    pub pattern: String,
    pub options: MatchOptions,
    pub compiled: Regex,
    pub version_meta: VersionMeta,
    pub source_line: usize,
}

impl std::fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRule")
            .field("soft", &self.soft)
            .field("service", &self.service)
            .field("pattern", &self.pattern)
            .field("options", &self.options)
            .field("source_line", &self.source_line)
            .finish()
    }
}

/// One active interrogation template.
#[derive(Debug)]
pub struct Probe {
    pub name: String,
    pub protocol: Protocol,
    pub send_raw: Vec<u8>,
    pub ports: PortList,
    pub ssl_ports: PortList,
    pub rarity: u8,
    pub total_wait_ms: u64,
    pub tcp_wrapped_ms: u64,
    pub match_rules: Vec<MatchRule>,
    pub fallback_names: Vec<String>,
    /// Resolved indices into the same-protocol probe `Vec` this catalog
    /// stores this probe in. Populated by `ServiceCatalog::parse`'s second
    /// pass; unresolved names are silently dropped.
    pub fallback_probes: Vec<usize>,
    pub services: Vec<String>,
}

impl Probe {
    pub fn is_tcp_wrap_possible(&self) -> bool {
        self.tcp_wrapped_ms > 0
    }

    pub fn is_null_probe(&self) -> bool {
        self.name == "NULL"
    }

    pub(crate) fn new(protocol: Protocol, name: String, send_raw: Vec<u8>) -> Self {
        Probe {
            name,
            protocol,
            send_raw,
            ports: PortList::default(),
            ssl_ports: PortList::default(),
            rarity: 1,
            total_wait_ms: 0,
            tcp_wrapped_ms: 0,
            match_rules: Vec::new(),
            fallback_names: Vec::new(),
            fallback_probes: Vec::new(),
            services: Vec::new(),
        }
    }
}

/// Top-level immutable container built once from the probe text (embedded
/// blob or external path override).
#[derive(Debug)]
pub struct ServiceCatalog {
    pub tcp_probes: Vec<Probe>,
    pub udp_probes: Vec<Probe>,
}

impl ServiceCatalog {
    /// Parse the nmap-service-probes grammar and resolve the fallback
    /// graph. `version_intensity == 9` admits every probe regardless of
    /// declared rarity.
    pub fn parse(text: &str, version_intensity: u8) -> Result<ServiceCatalog, CatalogParseError> {
        let accumulated = parse::parse_probes(text, version_intensity)?;
        let mut tcp_probes = Vec::new();
        let mut udp_probes = Vec::new();
        for probe in accumulated {
            match probe.protocol {
                Protocol::Tcp => tcp_probes.push(probe),
                Protocol::Udp => udp_probes.push(probe),
            }
        }
        resolve_fallbacks(&mut tcp_probes);
        resolve_fallbacks(&mut udp_probes);
        Ok(ServiceCatalog {
            tcp_probes,
            udp_probes,
        })
    }

    pub fn probes(&self, protocol: Protocol) -> &[Probe] {
        match protocol {
            Protocol::Tcp => &self.tcp_probes,
            Protocol::Udp => &self.udp_probes,
        }
    }
}

/// Second parsing pass: resolve each probe's `fallback` names against the
/// name→index map for its own protocol. Cycles are tolerated since this
/// only ever builds a flat adjacency list, never walked recursively by
/// the orchestrator.
fn resolve_fallbacks(probes: &mut [Probe]) {
    let by_name: HashMap<String, usize> = probes
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.clone(), i))
        .collect();
    let resolved: Vec<Vec<usize>> = probes
        .iter()
        .map(|p| {
            p.fallback_names
                .iter()
                .filter_map(|name| by_name.get(name).copied())
                .collect()
        })
        .collect();
    for (probe, indices) in probes.iter_mut().zip(resolved) {
        probe.fallback_probes = indices;
    }
}
