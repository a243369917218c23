//! `match`/`softmatch <service> m<delim><pattern><delim>[flags] [meta...]`.
//! Grounded on `seeyarh-radar`'s
//! `serviceprobes/parse/match_directive.rs` for the pattern-delimiter
//! scanning and on `original_source/match.go` (`parseMatch`,
//! `extractValues`) for the meta-field tokenizer, which here is rewritten
//! to scan for each field's own closing delimiter rather than splitting on
//! whitespace — product/version strings routinely contain spaces
//! (`p/Microsoft IIS httpd/`), and a naive whitespace split would chop
//! them apart.

use crate::catalog::{MatchOptions, VersionMeta};
use crate::error::CatalogParseError;

pub struct ParsedMatch {
    pub soft: bool,
    pub service: String,
    pub pattern: String,
    pub options: MatchOptions,
    pub version_meta: VersionMeta,
}

pub fn parse_match_line(line: &str) -> Result<ParsedMatch, CatalogParseError> {
    let bad = || CatalogParseError::BadMatchLine(line.to_string());

    let mut parts = line.splitn(3, char::is_whitespace);
    let directive = parts.next().ok_or_else(bad)?;
    let soft = match directive {
        "match" => false,
        "softmatch" => true,
        _ => return Err(bad()),
    };
    let service = parts.next().ok_or_else(bad)?.to_string();
    let rest = parts.next().ok_or_else(bad)?;
    let rest = rest.trim_start();

    let rest = rest.strip_prefix('m').ok_or_else(bad)?;
    let delimiter = rest.chars().next().ok_or_else(bad)?;
    let after_delim = &rest[delimiter.len_utf8()..];
    let pattern_end = after_delim.find(delimiter).ok_or_else(bad)?;
    let pattern = after_delim[..pattern_end].to_string();
    let tail = &after_delim[pattern_end + delimiter.len_utf8()..];

    // Zero or more flag characters directly abutting the closing
    // delimiter (no intervening whitespace) — nmap's catalog uses `i`,
    // `s`, or both together (`si`).
    let mut options = MatchOptions::default();
    let mut flag_end = 0;
    for c in tail.chars() {
        match c {
            'i' => {
                options.case_insensitive = true;
                flag_end += 1;
            }
            's' => {
                options.single_line = true;
                flag_end += 1;
            }
            _ => break,
        }
    }
    let meta_tail = &tail[flag_end..];

    let version_meta = parse_meta_tail(meta_tail.trim());

    Ok(ParsedMatch {
        soft,
        service,
        pattern,
        options,
        version_meta,
    })
}

/// Tokenize `p/VALUE/ v/VALUE/ i/VALUE/ h/VALUE/ o/VALUE/ d/VALUE/
/// cpe:/a:VALUE/...` fields, each field closed by its own next delimiter
/// rather than by whitespace.
fn parse_meta_tail(tail: &str) -> VersionMeta {
    let mut meta = VersionMeta::default();
    let bytes = tail.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let (field, prefix_len): (Option<&mut String>, usize) = if tail[i..].starts_with("cpe:/a:") {
            (Some(&mut meta.cpe), "cpe:/a:".len())
        } else if i + 2 <= bytes.len() && bytes[i + 1] == b'/' {
            match bytes[i] {
                b'p' => (Some(&mut meta.product), 2),
                b'v' => (Some(&mut meta.version), 2),
                b'i' => (Some(&mut meta.info), 2),
                b'h' => (Some(&mut meta.hostname), 2),
                b'o' => (Some(&mut meta.os), 2),
                b'd' => (Some(&mut meta.device), 2),
                _ => (None, 0),
            }
        } else {
            (None, 0)
        };

        match field {
            Some(slot) => {
                let value_start = i + prefix_len;
                match tail[value_start..].find('/') {
                    Some(rel_end) => {
                        let end = value_start + rel_end;
                        *slot = tail[value_start..end].to_string();
                        i = end + 1;
                    }
                    None => {
                        // Unterminated field: take the rest verbatim.
                        *slot = tail[value_start..].to_string();
                        break;
                    }
                }
            }
            None => {
                // Unrecognized token; skip to the next whitespace run.
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_match_line() {
        let line = r"match ftp m/^220.*Welcome to .*Pure-?FTPd (\d\S+\s*)/ p/Pure-FTPd/ v/$1/ cpe:/a:pureftpd:pure-ftpd:$1/";
        let m = parse_match_line(line).unwrap();
        assert!(!m.soft);
        assert_eq!(m.service, "ftp");
        assert_eq!(m.pattern, r"^220.*Welcome to .*Pure-?FTPd (\d\S+\s*)");
        assert!(!m.options.case_insensitive && !m.options.single_line);
        assert_eq!(m.version_meta.product, "Pure-FTPd");
        assert_eq!(m.version_meta.version, "$1");
        assert_eq!(m.version_meta.cpe, "pureftpd:pure-ftpd:$1");
    }

    #[test]
    fn parses_match_line_with_flags_and_spaced_product_name() {
        let line = r#"match http m|^HTTP/1\.[01] \d\d\d (?:[^\r\n]*\r\n(?!\r\n))*?Server: Askey Software ([\d.]+)\r\n.*<title>Scientific.A..anta WebStar Cable Modem</title>.*|si p/Scientific Atlanta WebStar cable modem http config/ i/Askey Software $1/ d/broadband router/"#;
        let m = parse_match_line(line).unwrap();
        assert_eq!(m.service, "http");
        assert!(m.options.case_insensitive && m.options.single_line);
        assert_eq!(
            m.version_meta.product,
            "Scientific Atlanta WebStar cable modem http config"
        );
        assert_eq!(m.version_meta.info, "Askey Software $1");
        assert_eq!(m.version_meta.device, "broadband router");
    }

    #[test]
    fn parses_softmatch_with_no_meta() {
        let line = r#"softmatch sharp-remote m|^(?!x)x|"#;
        let m = parse_match_line(line).unwrap();
        assert!(m.soft);
        assert_eq!(m.service, "sharp-remote");
        assert_eq!(m.pattern, r"^(?!x)x");
        assert!(m.version_meta.product.is_empty());
    }

    #[test]
    fn single_line_flag_is_recognized() {
        let line = "match foo m/bar/s v/$1/";
        let m = parse_match_line(line).unwrap();
        assert!(m.options.single_line && !m.options.case_insensitive);
        assert_eq!(m.version_meta.version, "$1");
    }

    #[test]
    fn rejects_non_match_directive() {
        assert!(parse_match_line("ports 80,443").is_err());
    }
}
