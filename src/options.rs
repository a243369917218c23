//! Construction-time and per-scan configuration knobs. Ported from
//! `original_source/options.go`.

/// Engine construction options.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Path to an external nmap-service-probes file. Empty ⇒ use the
    /// embedded default catalog.
    pub service_probes_path: String,
    /// 1..9. Probes with `rarity > version_intensity` are dropped at
    /// construction time, except `9` which admits everything.
    pub version_intensity: u8,
    pub version_trace: bool,
    pub debug_response: bool,
    pub debug_request: bool,
    /// `socks5://[user:pass@]host:port`. Empty ⇒ dial directly.
    pub proxy: String,
    /// Per-connect timeout, in seconds.
    pub timeout_seconds: u64,
    /// Hard per-endpoint cap, in seconds. `None` ⇒ 10x `timeout_seconds`.
    pub scan_timeout_seconds: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            service_probes_path: String::new(),
            version_intensity: 7,
            version_trace: false,
            debug_response: false,
            debug_request: false,
            proxy: String::new(),
            timeout_seconds: 5,
            scan_timeout_seconds: None,
        }
    }
}

impl EngineOptions {
    pub fn scan_timeout(&self) -> std::time::Duration {
        let secs = self
            .scan_timeout_seconds
            .unwrap_or(self.timeout_seconds * 10);
        std::time::Duration::from_secs(secs)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}
