//! Small standalone helpers: binary-safe hex formatting and endpoint
//! address parsing. Grounded on `original_source/utils.go`
//! (`FormatBytesToHex`, `ParseAddress`).

use crate::error::AddressParseError;

/// Render bytes for debug/trace logging: printable ASCII (and CR/LF) pass
/// through, everything else becomes `\xHH`.
pub fn format_bytes_to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        if b == b'\r' || b == b'\n' {
            out.push(b as char);
        } else if (32..127).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

/// Parse `host:port` or `[ipv6]:port` into `(host, port)`. Unlike
/// `ParseTarget` in the original source, this never silently defaults a
/// missing/invalid port — callers that want that leniency should catch
/// `AddressParseError` themselves.
pub fn parse_address(address: &str) -> Result<(String, u16), AddressParseError> {
    let address = address.trim();
    if let Some(rest) = address.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| AddressParseError::InvalidHost(address.to_string()))?;
        let host = &rest[..end];
        let after = &rest[end + 1..];
        let port_str = after
            .strip_prefix(':')
            .ok_or(AddressParseError::MissingPort)?;
        let port: u16 = port_str
            .parse()
            .map_err(|_| AddressParseError::InvalidPort(port_str.to_string()))?;
        return Ok((host.to_string(), port));
    }

    let idx = address
        .rfind(':')
        .ok_or(AddressParseError::MissingPort)?;
    let host = &address[..idx];
    let port_str = &address[idx + 1..];
    if host.is_empty() {
        return Err(AddressParseError::InvalidHost(address.to_string()));
    }
    let port: u16 = port_str
        .parse()
        .map_err(|_| AddressParseError::InvalidPort(port_str.to_string()))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_printable_ascii_verbatim() {
        assert_eq!(format_bytes_to_hex(b"HTTP/1.1\r\n"), "HTTP/1.1\r\n");
    }

    #[test]
    fn escapes_non_printable_bytes() {
        assert_eq!(format_bytes_to_hex(&[0x00, 0x01, b'A']), "\\x00\\x01A");
    }

    #[test]
    fn parses_ipv4_host_port() {
        let (host, port) = parse_address("192.168.1.1:80").unwrap();
        assert_eq!(host, "192.168.1.1");
        assert_eq!(port, 80);
    }

    #[test]
    fn parses_ipv6_bracketed_host_port() {
        let (host, port) = parse_address("[::1]:8080").unwrap();
        assert_eq!(host, "::1");
        assert_eq!(port, 8080);
    }

    #[test]
    fn rejects_missing_port() {
        assert!(matches!(
            parse_address("example.com"),
            Err(AddressParseError::MissingPort)
        ));
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(matches!(
            parse_address("example.com:notaport"),
            Err(AddressParseError::InvalidPort(_))
        ));
    }
}
