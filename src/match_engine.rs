//! Evaluate a probe's match rules against a banner and expand `$N`
//! templates. Grounded on `original_source/match.go`'s `probe.match` and
//! `seeyarh-radar`'s `serviceprobes::get_match`; templates here expand as
//! mixed literal/`$N` text rather than only the pure-`$N` case.

use crate::catalog::{MatchRule, Probe, VersionMeta};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::types::MatchResult;

/// Evaluate `probe`'s rules in declared order against `banner`. First rule
/// whose compiled pattern finds at least one match wins — soft and hard
/// rules share one ordered list, there is no separate hard/soft pass.
pub fn check_match(probe: &Probe, banner: &[u8]) -> Option<MatchResult> {
    for rule in &probe.match_rules {
        if let Some(result) = try_rule(rule, banner) {
            return Some(result);
        }
    }
    None
}

fn try_rule(rule: &MatchRule, banner: &[u8]) -> Option<MatchResult> {
    let captures = match rule.compiled.captures(banner) {
        Ok(Some(c)) => c,
        // A regex evaluation error just means this rule doesn't apply;
        // try the next one.
        Ok(None) | Err(_) => return None,
    };

    let group = |n: usize| -> &str {
        captures
            .get(n)
            .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
            .unwrap_or("")
    };

    Some(MatchResult {
        service: rule.service.clone(),
        version: expand_template(&rule.version_meta.version, &group),
        product: expand_template(&rule.version_meta.product, &group),
        info: expand_template(&rule.version_meta.info, &group),
        hostname: expand_template(&rule.version_meta.hostname, &group),
        os: expand_template(&rule.version_meta.os, &group),
        device: expand_template(&rule.version_meta.device, &group),
        cpe: expand_template(&rule.version_meta.cpe, &group),
        response: STANDARD.encode(banner),
    })
}

/// Expand a template of literal text interspersed with `$N` (single-digit)
/// back-references. An out-of-range or non-participating group expands to
/// the empty string rather than erroring — nmap's own templates never
/// reference a group the pattern doesn't have, but a hostile or malformed
/// catalog shouldn't be able to panic the matcher.
fn expand_template(template: &str, group: &impl Fn(usize) -> &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let n = (bytes[i + 1] - b'0') as usize;
            out.push_str(group(n));
            i += 2;
        } else {
            // Template text is ASCII in every nmap catalog entry; pushing
            // the raw byte as a char is safe here.
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

/// Used only by tests and the `match_banner` public entry to build a
/// minimal `VersionMeta` by hand.
#[allow(dead_code)]
pub(crate) fn empty_meta() -> VersionMeta {
    VersionMeta::default()
}
