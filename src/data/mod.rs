//! Embedded default probe catalog, used whenever
//! `EngineOptions::service_probes_path` is empty.

pub const DEFAULT_SERVICE_PROBES: &str = include_str!("nmap-service-probes");
