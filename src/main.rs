//! Device Exporter
//!
//! Serves storage-device identity metrics over HTTP for Prometheus scraping.
//! Each scrape runs the enabled collectors (lsblk, udev, ZFS, and optionally
//! device-mapper) sequentially and streams their exposition lines.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use device_exporter::{Collector, CollectorConfig, Error, Result};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Prometheus exporter for block-device, udev, ZFS, and device-mapper
/// identity metadata
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Metrics server bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9133")]
    listen_addr: String,

    /// Timeout for each external command invocation, in milliseconds
    #[arg(long, env = "COMMAND_TIMEOUT_MS", default_value = "2500")]
    command_timeout_ms: u64,

    /// Also collect device-mapper tables via dmsetup
    #[arg(long, env = "ENABLE_DEVICEMAPPER")]
    enable_devicemapper: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting device exporter");
    info!("  Listen address: {}", args.listen_addr);
    info!("  Command timeout: {}ms", args.command_timeout_ms);
    info!("  Device-mapper collection: {}", args.enable_devicemapper);

    let config = CollectorConfig {
        command_timeout: Duration::from_millis(args.command_timeout_ms),
        devicemapper_enabled: args.enable_devicemapper,
    };
    let collector = Arc::new(Collector::new(config));

    run_metrics_server(&args.listen_addr, collector).await
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().expect("static directive"));

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, collector: Arc<Collector>) -> Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use prometheus::{Encoder, TextEncoder};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn handle(
        req: Request<hyper::body::Incoming>,
        collector: Arc<Collector>,
    ) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
        let response = match req.uri().path() {
            "/metrics" => {
                let mut body = collector.collect().await;

                // Exporter self-metrics ride along after the info lines.
                let encoder = TextEncoder::new();
                let mut buffer = Vec::new();
                if let Err(error) = encoder.encode(&prometheus::gather(), &mut buffer) {
                    error!(%error, "failed to encode self-metrics");
                }
                body.push_str(&String::from_utf8_lossy(&buffer));

                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", encoder.format_type())
                    .body(Full::new(Bytes::from(body)))
                    .unwrap()
            }
            "/healthz" | "/livez" | "/readyz" => Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("ok")))
                .unwrap(),
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::from("not found")))
                .unwrap(),
        };
        Ok(response)
    }

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("invalid listen address: {}", e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind metrics server: {}", e)))?;

    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("metrics server accept error: {}", e)))?;

        tracing::debug!(%peer, "handling connection");

        let io = TokioIo::new(stream);
        let collector = collector.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, collector.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("metrics server connection error: {}", e);
            }
        });
    }
}
