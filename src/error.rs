//! Error types. The engine never panics on bad network input or bad probe
//! text at scan time; every outcome either lands in `Response.status` or is
//! returned here from construction-time / address-parsing entry points.

use std::fmt;
use std::io;

/// Returned by address parsing (`ip:port`, `[ipv6]:port`).
#[derive(Debug)]
pub enum AddressParseError {
    MissingPort,
    InvalidPort(String),
    InvalidHost(String),
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::MissingPort => write!(f, "address is missing a port"),
            AddressParseError::InvalidPort(p) => write!(f, "invalid port: {p}"),
            AddressParseError::InvalidHost(h) => write!(f, "invalid host: {h}"),
        }
    }
}

impl std::error::Error for AddressParseError {}

/// Returned from `ServiceCatalog::parse` / `Engine::new`. Fatal: a catalog
/// that fails to parse leaves the engine unusable.
#[derive(Debug)]
pub enum CatalogParseError {
    BadProbeLine(String),
    BadMatchLine(String),
    BadPortList(String),
    Io(io::Error),
}

impl fmt::Display for CatalogParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogParseError::BadProbeLine(l) => write!(f, "bad Probe line: {l}"),
            CatalogParseError::BadMatchLine(l) => write!(f, "bad match/softmatch line: {l}"),
            CatalogParseError::BadPortList(l) => write!(f, "bad port list expression: {l}"),
            CatalogParseError::Io(e) => write!(f, "failed to read probe catalog: {e}"),
        }
    }
}

impl std::error::Error for CatalogParseError {}

impl From<io::Error> for CatalogParseError {
    fn from(err: io::Error) -> CatalogParseError {
        CatalogParseError::Io(err)
    }
}

/// Per-probe I/O outcome (§4.5/§4.6 of the design). Never surfaced to
/// callers directly; the orchestrator folds these into `Response.status`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProbeOutcome {
    Open,
    Close,
    TlsError,
    WriteTimeout,
    ReadTimeout,
}
