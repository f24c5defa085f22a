//! Device Exporter
//!
//! A Prometheus exporter for storage-device topology and identity metadata.
//! Collects from four independent sources and renders every device as a flat
//! presence ("info") metric with value 1:
//!
//! ```text
//! lsblk ───────┐
//! udev ────────┤
//! zfs ─────────┼──▶ Collector ──▶ LabelSet ──▶ exposition lines
//! devicemapper ┘
//! ```
//!
//! # Modules
//!
//! - [`collector`] - Per-source collectors and the scrape orchestrator
//! - [`error`] - Error types
//! - [`expose`] - Metric line formatting
//! - [`labels`] - Ordered label sets
//! - [`mapping`] - Static udev property allow-lists

pub mod collector;
pub mod error;
pub mod expose;
pub mod labels;
pub mod mapping;

// Re-export commonly used types
pub use collector::{Collector, CollectorConfig};
pub use error::{Error, Result};
pub use expose::NAMESPACE;
pub use labels::LabelSet;
pub use mapping::PropertyMap;
