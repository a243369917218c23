//! Wire-level and result types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport a probe is sent over.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

impl FromStr for Protocol {
    type Err = ();

    fn from_str(input: &str) -> Result<Protocol, Self::Err> {
        match input {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// Outward scan outcome for a single endpoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Close,
    Unknown,
    Matched,
    Tcpwrapped,
}

/// Emitted on a successful rule match. Cheap to clone: every field is an
/// owned copy of the matched/extracted strings rather than a borrow into
/// the probe catalog, so a `Response` can outlive the scan that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchResult {
    pub service: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpe: String,
    /// Base64-encoded banner bytes that produced this match.
    pub response: String,
}

/// Final report for one `(protocol, host, port)` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub address: String,
    pub tls: bool,
    pub status: Status,
    pub service: Option<MatchResult>,
    pub protocol: Protocol,
}

impl Response {
    pub(crate) fn unknown(address: String, protocol: Protocol) -> Self {
        Response {
            address,
            tls: false,
            status: Status::Unknown,
            service: None,
            protocol,
        }
    }
}
