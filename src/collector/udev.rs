//! udev property-database collection
//!
//! Decodes `udevadm info --export-db` output, filters to the `block`
//! subsystem, and renders one `device_udev_info` line per device (labels
//! allow-listed and renamed through a [`PropertyMap`]) plus one
//! `device_udev_link_info` line per symlink.

use tracing::debug;

use crate::collector::{run_command, CollectorConfig};
use crate::error::Result;
use crate::expose::push_info_line;
use crate::labels::LabelSet;
use crate::mapping::PropertyMap;

pub(crate) const SUBSYSTEM: &str = "udev";

// =============================================================================
// Udev Device
// =============================================================================

/// One device record from the udev database export
#[derive(Debug, Clone, Default)]
pub struct UdevDevice {
    /// Kernel device path (the export's `P:` line, e.g. `/devices/...`)
    pub syspath: String,
    /// Last segment of the syspath (e.g. `sda`)
    pub sysname: String,
    /// Kernel subsystem tag (`SUBSYSTEM` property)
    pub subsystem: String,
    /// Raw property bag in export order; keys may be mixed-case
    pub properties: Vec<(String, String)>,
    /// Absolute `/dev` symlinks (`DEVLINKS` property)
    pub devlinks: Vec<String>,
}

impl UdevDevice {
    /// Look up a raw property by its exact (case-sensitive) name
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True for block-layer devices, the only kind this exporter reports
    pub fn is_block(&self) -> bool {
        self.subsystem == "block"
    }
}

// =============================================================================
// Property Mapper
// =============================================================================

/// Map a raw property bag onto its metric label set.
///
/// Every label the table can emit is pre-seeded with an empty value, so
/// devices of the same class always expose the same label shape. Bag keys
/// are lowercased before the allow-list match; keys outside the table are
/// dropped.
pub fn map_properties(properties: &[(String, String)], table: &PropertyMap) -> LabelSet {
    let mut labels = LabelSet::new();
    for label in table.labels() {
        labels.set(label, "");
    }

    for (raw, value) in properties {
        let raw = raw.to_ascii_lowercase();
        let Some(canonical) = table.lookup(&raw) else {
            continue;
        };
        let label = if canonical.is_empty() { raw.as_str() } else { canonical };
        labels.set(label, value.as_str());
    }

    labels
}

// =============================================================================
// Database Decode
// =============================================================================

/// Decode `udevadm info --export-db` output.
///
/// Records are blank-line separated. Per record: `P:` carries the kernel
/// device path, `E:` lines carry `KEY=VALUE` properties in export order.
/// Records without a `P:` line are dropped.
pub fn decode_database(output: &str) -> Vec<UdevDevice> {
    output.split("\n\n").filter_map(decode_record).collect()
}

fn decode_record(record: &str) -> Option<UdevDevice> {
    let mut syspath: Option<String> = None;
    let mut properties: Vec<(String, String)> = Vec::new();

    for line in record.lines() {
        let Some((prefix, rest)) = line.split_once(": ") else {
            continue;
        };
        match prefix {
            "P" => syspath = Some(rest.trim().to_string()),
            "E" => {
                if let Some((key, value)) = rest.split_once('=') {
                    properties.push((key.to_string(), value.to_string()));
                }
            }
            _ => {}
        }
    }

    let syspath = syspath?;
    let sysname = syspath.rsplit('/').next().unwrap_or("").to_string();
    let subsystem = properties
        .iter()
        .find(|(k, _)| k == "SUBSYSTEM")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    let devlinks = properties
        .iter()
        .find(|(k, _)| k == "DEVLINKS")
        .map(|(_, v)| v.split_ascii_whitespace().map(String::from).collect())
        .unwrap_or_default();

    Some(UdevDevice {
        syspath,
        sysname,
        subsystem,
        properties,
        devlinks,
    })
}

// =============================================================================
// Render
// =============================================================================

/// Render info and link lines for every block device in the database
pub fn render_devices(devices: &[UdevDevice]) -> String {
    let mut out = String::new();
    for device in devices.iter().filter(|d| d.is_block()) {
        let table = PropertyMap::for_bus(device.property("ID_BUS"));
        push_info_line(
            &mut out,
            SUBSYSTEM,
            "info",
            &map_properties(&device.properties, table),
        );

        for link in &device.devlinks {
            let mut labels = LabelSet::new();
            labels.set("path", device.syspath.as_str());
            labels.set("device", device.sysname.as_str());
            labels.set("link", link.as_str());
            labels.set("link_name", link.rsplit('/').next().unwrap_or(""));
            push_info_line(&mut out, SUBSYSTEM, "link_info", &labels);
        }
    }
    out
}

/// Scan the udev database and render block-device lines
pub(crate) async fn collect(config: &CollectorConfig) -> Result<String> {
    let stdout = run_command("udevadm", &["info", "--export-db"], config.command_timeout).await?;
    let devices = decode_database(&stdout);
    debug!(count = devices.len(), "decoded udev database records");
    Ok(render_devices(&devices))
}
