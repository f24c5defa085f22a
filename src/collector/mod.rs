//! Metadata Collectors
//!
//! One collector per data source (lsblk, udev, ZFS, device-mapper), plus the
//! orchestrator that runs them sequentially for each scrape. Collectors are
//! split into a thin command-invoking front and pure decode/render functions;
//! only the front performs I/O.

pub mod devicemapper;
pub mod lsblk;
pub mod udev;
pub mod zfs;

#[cfg(test)]
mod proptest;

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// =============================================================================
// Self-Metrics
// =============================================================================

static SCRAPES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "device_exporter_scrapes_total",
        "Total number of scrapes served"
    )
    .expect("scrape counter registration")
});

static COLLECTOR_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "device_exporter_collector_errors_total",
        "Total number of failed collection passes, per collector",
        &["collector"]
    )
    .expect("error counter registration")
});

// =============================================================================
// Configuration
// =============================================================================

/// Runtime configuration shared by all collectors
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Timeout applied to each external command invocation
    pub command_timeout: Duration,

    /// Whether the device-mapper collector runs
    pub devicemapper_enabled: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(2500),
            devicemapper_enabled: false,
        }
    }
}

// =============================================================================
// Command Invocation
// =============================================================================

/// Run an external command and capture stdout as UTF-8 (lossy).
///
/// The command is killed when the timeout elapses or the future is dropped.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String> {
    debug!(program, ?args, "running command");

    let output = tokio::time::timeout(
        timeout,
        Command::new(program).args(args).kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| Error::CommandTimeout {
        program: program.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    })??;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// =============================================================================
// Collector Orchestrator
// =============================================================================

/// Runs every enabled collection path for one scrape and concatenates their
/// exposition lines.
///
/// Collection paths run strictly sequentially. A failing path contributes
/// zero lines and is logged and counted; it never aborts the scrape.
#[derive(Debug, Clone)]
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Collect all info metrics for one scrape
    pub async fn collect(&self) -> String {
        SCRAPES_TOTAL.inc();

        let mut out = String::new();
        self.append(&mut out, "lsblk", lsblk::collect(&self.config).await);
        self.append(&mut out, "udev", udev::collect(&self.config).await);
        self.append(&mut out, "zfs", zfs::collect(&self.config).await);
        if self.config.devicemapper_enabled {
            self.append(
                &mut out,
                "devicemapper",
                devicemapper::collect(&self.config).await,
            );
        }
        out
    }

    fn append(&self, out: &mut String, collector: &str, result: Result<String>) {
        match result {
            Ok(lines) => out.push_str(&lines),
            Err(error) => {
                COLLECTOR_ERRORS_TOTAL.with_label_values(&[collector]).inc();
                warn!(collector, %error, "collection pass failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_run_command_captures_stdout() {
        let out = tokio_test::block_on(run_command("echo", &["hello"], Duration::from_secs(5)))
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_run_command_failure_carries_status() {
        let err = tokio_test::block_on(run_command("false", &[], Duration::from_secs(5)))
            .unwrap_err();
        assert_matches!(err, Error::CommandFailed { code: Some(1), .. });
    }

    #[test]
    fn test_run_command_missing_binary_is_io_error() {
        let err = tokio_test::block_on(run_command(
            "definitely-not-a-real-binary",
            &[],
            Duration::from_secs(5),
        ))
        .unwrap_err();
        assert_matches!(err, Error::Io(_));
    }

    #[test]
    fn test_run_command_timeout() {
        let err = tokio_test::block_on(run_command("sleep", &["5"], Duration::from_millis(50)))
            .unwrap_err();
        assert_matches!(err, Error::CommandTimeout { timeout_ms: 50, .. });
    }

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.command_timeout, Duration::from_millis(2500));
        assert!(!config.devicemapper_enabled);
    }
}
