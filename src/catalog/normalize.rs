//! Protocol/service name normalization. Grounded on
//! `original_source/match.go`'s `FixProtocol`.

/// Rewrite a raw probe-file service name into the name this engine emits.
/// Idempotent: `fix_protocol(fix_protocol(x)) == fix_protocol(x)` for all
/// `x`.
pub fn fix_protocol(name: &str) -> String {
    let mapped = match name {
        "ssl/http" => "https".to_string(),
        "http-proxy" => "http".to_string(),
        "microsoft-ds" => "smb".to_string(),
        "netbios-ssn" => "netbios".to_string(),
        "oracle-tns" => "oracle".to_string(),
        "msrpc" => "rpc".to_string(),
        "ms-sql-s" => "mssql".to_string(),
        "domain" => "dns".to_string(),
        "svnserve" => "svn".to_string(),
        "ibm-db2" => "db2".to_string(),
        "socks-proxy" => "socks5".to_string(),
        other if other.starts_with("ssl/") => format!("{}-ssl", &other[4..]),
        other => other.to_string(),
    };
    mapped.replace('_', "-")
}

/// Applied only at final-match time, when the connection has been upgraded
/// to TLS.
pub fn fix_service_name(service: &str, tls: bool) -> String {
    if tls && service == "http" {
        "https".to_string()
    } else {
        service.to_string()
    }
}
