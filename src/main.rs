//! Thin CLI around the `probefinch` fingerprinting engine. Reads one
//! target per line from stdin (or a single target given on the command
//! line) and prints one JSON `Response` per line. Deliberately minimal —
//! no worker-pool fan-out, no progress bars, no rule-file updater.

use std::io::{self, BufRead, Write};

use clap::Parser;

use probefinch::{EngineOptions, Engine, Protocol};

/// Active network service and version fingerprinting engine.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Single target to scan, as `host:port`. When omitted, targets are
    /// read one per line from stdin.
    target: Option<String>,

    /// Path to an external nmap-service-probes file. Defaults to the
    /// engine's embedded catalog.
    #[arg(long, default_value = "")]
    probes_file: String,

    /// Preferred transport. Forced to UDP for port 53 regardless of this
    /// setting.
    #[arg(long, value_enum, default_value = "tcp")]
    protocol: CliProtocol,

    /// 1..9; probes rarer than this are skipped at construction time.
    #[arg(long, default_value_t = 7)]
    version_intensity: u8,

    /// Per-probe connect/write/read timeout, in seconds.
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// `socks5://[user:pass@]host:port`. Omit to dial directly.
    #[arg(long, default_value = "")]
    proxy: String,

    #[arg(long)]
    version_trace: bool,

    #[arg(long)]
    debug_request: bool,

    #[arg(long)]
    debug_response: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliProtocol {
    Tcp,
    Udp,
}

impl From<CliProtocol> for Protocol {
    fn from(value: CliProtocol) -> Protocol {
        match value {
            CliProtocol::Tcp => Protocol::Tcp,
            CliProtocol::Udp => Protocol::Udp,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let options = EngineOptions {
        service_probes_path: args.probes_file.clone(),
        version_intensity: args.version_intensity,
        version_trace: args.version_trace,
        debug_response: args.debug_response,
        debug_request: args.debug_request,
        proxy: args.proxy.clone(),
        timeout_seconds: args.timeout,
        scan_timeout_seconds: None,
    };

    let engine = match Engine::from_options(options) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("failed to load probe catalog: {e}");
            std::process::exit(1);
        }
    };

    let protocol: Protocol = args.protocol.into();

    match args.target {
        Some(target) => scan_one(&engine, protocol, &target).await,
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("failed to read stdin: {e}");
                        continue;
                    }
                };
                let target = line.trim();
                if target.is_empty() {
                    continue;
                }
                scan_one(&engine, protocol, target).await;
            }
        }
    }
}

async fn scan_one(engine: &Engine, protocol: Protocol, target: &str) {
    match engine.scan_address(protocol, target).await {
        Ok(response) => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            if let Ok(json) = serde_json::to_string(&response) {
                let _ = writeln!(lock, "{json}");
            }
        }
        Err(e) => tracing::warn!("skipping {target}: {e}"),
    }
}
