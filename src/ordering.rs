//! Probe prioritization. Grounded on
//! `original_source/nmap.go`'s `Match` (port-preferred-first ordering) and
//! `probe.go`'s `sortProbes`/`perfSort` for the rarity-stable secondary
//! order; the well-known-port override is a small supplement the original
//! keeps as a separate lookup ahead of the main sort.

use crate::catalog::Probe;

/// A tiny override table promoting one well-known probe to the very front
/// of the candidate list for a handful of ports where nmap's own ordering
/// heuristics would otherwise waste a round-trip on a probe unlikely to
/// match.
const WELL_KNOWN_PORT_PROBES: &[(u16, &str)] = &[
    (80, "GetRequest"),
    (8080, "GetRequest"),
    (8000, "GetRequest"),
    (8888, "GetRequest"),
    (443, "TLSSessionReq"),
    (21, "ftp"),
    (22, "SSHv2"),
    (25, "SMTP"),
];

fn well_known_probe_name(port: u16) -> Option<&'static str> {
    WELL_KNOWN_PORT_PROBES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Order `probes` for a scan against `port` (using `ssl` to pick the
/// ssl-ports list instead of the plain ports list): probes that declare
/// `port` first, in catalog order, followed by every other probe, also in
/// catalog order. If a well-known-port override names a probe present in
/// the result, that probe is additionally promoted to index 0.
pub fn sort_probes(probes: &[Probe], port: u16, ssl: bool) -> Vec<&Probe> {
    let declares_port = |p: &Probe| {
        if ssl {
            p.ssl_ports.contains(port)
        } else {
            p.ports.contains(port)
        }
    };

    let mut preferred: Vec<&Probe> = Vec::new();
    let mut rest: Vec<&Probe> = Vec::new();
    for probe in probes {
        if declares_port(probe) {
            preferred.push(probe);
        } else {
            rest.push(probe);
        }
    }
    preferred.extend(rest);

    if let Some(name) = well_known_probe_name(port) {
        if let Some(pos) = preferred.iter().position(|p| p.name == name) {
            if pos != 0 {
                let promoted = preferred.remove(pos);
                preferred.insert(0, promoted);
            }
        }
    }

    preferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PortList;
    use crate::types::Protocol;

    fn probe(name: &str, ports: &[u16]) -> Probe {
        let mut p = Probe::new(Protocol::Tcp, name.to_string(), Vec::new());
        if !ports.is_empty() {
            let expr = ports
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(",");
            p.ports = PortList::parse(&expr).unwrap();
        }
        p
    }

    #[test]
    fn probes_declaring_the_port_come_first() {
        let a = probe("NULL", &[]);
        let b = probe("GetRequest", &[80, 8080]);
        let c = probe("GenericLines", &[21, 23]);
        let ordered = sort_probes(&[a, b, c], 80, false);
        assert_eq!(ordered[0].name, "GetRequest");
    }

    #[test]
    fn well_known_port_override_promotes_named_probe_to_front() {
        let a = probe("SomeOtherHttpProbe", &[80]);
        let b = probe("GetRequest", &[80]);
        let ordered = sort_probes(&[a, b], 80, false);
        assert_eq!(ordered[0].name, "GetRequest");
    }

    #[test]
    fn missing_override_mapping_leaves_order_untouched() {
        let a = probe("First", &[9999]);
        let b = probe("Second", &[]);
        let ordered = sort_probes(&[a, b], 9999, false);
        assert_eq!(ordered[0].name, "First");
        assert_eq!(ordered[1].name, "Second");
    }

    #[test]
    fn ssl_flag_selects_sslports_instead_of_ports() {
        let mut a = Probe::new(Protocol::Tcp, "TLSSessionReq".to_string(), Vec::new());
        a.ssl_ports = PortList::parse("443").unwrap();
        let b = Probe::new(Protocol::Tcp, "NULL".to_string(), Vec::new());
        let ordered = sort_probes(&[a, b], 443, true);
        assert_eq!(ordered[0].name, "TLSSessionReq");
    }
}
