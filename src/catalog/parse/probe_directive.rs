//! `Probe <TCP|UDP> <name> q<delim>...<delim> [no-payload]`.
//! Grounded on `seeyarh-radar`'s `serviceprobes/parse/probe_directive.rs`,
//! generalized to an arbitrary delimiter and byte-exact unescaping per
//! `catalog::parse::unescape`.

use super::unescape::unescape_payload;
use crate::error::CatalogParseError;
use crate::types::Protocol;
use std::str::FromStr;

pub struct ParsedProbe {
    pub protocol: Protocol,
    pub name: String,
    pub send_raw: Vec<u8>,
}

fn valid_probe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
}

pub fn parse_probe_line(line: &str) -> Result<ParsedProbe, CatalogParseError> {
    let bad = || CatalogParseError::BadProbeLine(line.to_string());

    let parts: Vec<&str> = line.splitn(4, char::is_whitespace).collect();
    if parts.len() < 4 || parts[0] != "Probe" {
        return Err(bad());
    }
    let protocol = Protocol::from_str(parts[1]).map_err(|_| bad())?;
    let name = parts[2].to_string();
    if !valid_probe_name(&name) {
        return Err(bad());
    }

    let rest = parts[3].trim_start();
    let rest = rest.strip_prefix('q').ok_or_else(bad)?;
    let delimiter = rest.chars().next().ok_or_else(bad)?;
    let after_delim = &rest[delimiter.len_utf8()..];
    let end = after_delim.find(delimiter).ok_or_else(bad)?;
    let payload_src = &after_delim[..end];
    let send_raw = unescape_payload(payload_src);

    Ok(ParsedProbe {
        protocol,
        name,
        send_raw,
    })
}
