//! Line-oriented driver for the nmap-service-probes grammar.
//! Grounded on `seeyarh-radar`'s `serviceprobes/parse/mod.rs` state
//! machine (accumulate directives into a "current probe", flush on the
//! next `Probe` or EOF) and on `original_source/probe.go`'s `LoadProbes`
//! for the rarity-gated admission rule.

pub mod match_directive;
pub mod probe_directive;
pub mod unescape;

use crate::catalog::normalize::fix_protocol;
use crate::catalog::{MatchRule, PortList, Probe};
use crate::error::CatalogParseError;
use match_directive::parse_match_line;
use pcre2::bytes::RegexBuilder;
use probe_directive::parse_probe_line;

const DIRECTIVES: &[&str] = &[
    "Exclude",
    "Probe",
    "match",
    "softmatch",
    "ports",
    "sslports",
    "totalwaitms",
    "tcpwrappedms",
    "rarity",
    "fallback",
];

fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

fn is_directive_line(line: &str) -> bool {
    DIRECTIVES.contains(&first_token(line))
}

/// Parse the full probe-text blob into a flat list of admitted probes
/// (TCP and UDP interleaved in declaration order; `ServiceCatalog::parse`
/// splits them by protocol). Probes with `rarity > version_intensity` are
/// dropped unless `version_intensity == 9`, which admits everything.
pub fn parse_probes(text: &str, version_intensity: u8) -> Result<Vec<Probe>, CatalogParseError> {
    let mut admitted = Vec::new();
    let mut current: Option<Probe> = None;
    let mut line_no = 0usize;

    for raw_line in text.lines() {
        line_no += 1;
        let line = raw_line.trim_end_matches('\r').trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !is_directive_line(line) {
            continue;
        }

        let directive = first_token(line);
        let args = line[directive.len()..].trim_start();

        if directive == "Exclude" {
            continue;
        }

        if directive == "Probe" {
            if let Some(probe) = current.take() {
                admit(&mut admitted, probe, version_intensity);
            }
            let parsed = parse_probe_line(line)?;
            current = Some(Probe::new(parsed.protocol, parsed.name, parsed.send_raw));
            continue;
        }

        let probe = current
            .as_mut()
            .ok_or_else(|| CatalogParseError::BadProbeLine(line.to_string()))?;

        match directive {
            "match" | "softmatch" => {
                let parsed = parse_match_line(line)?;
                let pattern = parsed.pattern.replace(r"\0", r"\x00");
                let mut builder = RegexBuilder::new();
                builder.caseless(parsed.options.case_insensitive);
                builder.dotall(parsed.options.single_line);
                let compiled = builder
                    .build(&pattern)
                    .map_err(|_| CatalogParseError::BadMatchLine(line.to_string()))?;
                let service = fix_protocol(&parsed.service);
                if !probe.services.contains(&service) {
                    probe.services.push(service.clone());
                }
                probe.match_rules.push(MatchRule {
                    soft: parsed.soft,
                    service,
                    pattern: parsed.pattern,
                    options: parsed.options,
                    compiled,
                    version_meta: parsed.version_meta,
                    source_line: line_no,
                });
            }
            "ports" => {
                probe.ports = PortList::parse(args)?;
            }
            "sslports" => {
                probe.ssl_ports = PortList::parse(args)?;
            }
            "totalwaitms" => {
                probe.total_wait_ms = args
                    .parse()
                    .map_err(|_| CatalogParseError::BadProbeLine(line.to_string()))?;
            }
            "tcpwrappedms" => {
                probe.tcp_wrapped_ms = args
                    .parse()
                    .map_err(|_| CatalogParseError::BadProbeLine(line.to_string()))?;
            }
            "rarity" => {
                probe.rarity = args
                    .parse()
                    .map_err(|_| CatalogParseError::BadProbeLine(line.to_string()))?;
            }
            "fallback" => {
                probe.fallback_names = args
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => unreachable!("directive table checked above"),
        }
    }

    if let Some(probe) = current {
        admit(&mut admitted, probe, version_intensity);
    }

    Ok(admitted)
}

fn admit(admitted: &mut Vec<Probe>, probe: Probe, version_intensity: u8) {
    if probe.match_rules.is_empty() {
        return;
    }
    if version_intensity == 9 || probe.rarity <= version_intensity {
        admitted.push(probe);
    }
}
