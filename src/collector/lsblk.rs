//! Block-device enumeration via `lsblk`
//!
//! Decodes the JSON list output of `lsblk -OJ --list` and renders one
//! `device_lsblk_info` line per block device.

use serde::Deserialize;
use tracing::debug;

use crate::collector::{run_command, CollectorConfig};
use crate::error::Result;
use crate::expose::push_info_line;
use crate::labels::LabelSet;

pub(crate) const SUBSYSTEM: &str = "lsblk";

// =============================================================================
// Block Device Record
// =============================================================================

/// One row of `lsblk --list` output.
///
/// `lsblk` reports missing fields as JSON null; normalization turns those
/// into empty label values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockDevice {
    #[serde(default, rename = "kname")]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "maj:min")]
    pub maj_min: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub wwn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockDeviceList {
    #[serde(default)]
    blockdevices: Vec<BlockDevice>,
}

impl BlockDevice {
    /// Normalize this record into its metric label set.
    ///
    /// Label order is fixed: device, path, name, major, minor, type,
    /// fs_type, label, uuid, serial, wwn. The `maj:min` field splits on the
    /// first colon; a missing half becomes an empty label.
    pub fn labels(&self) -> LabelSet {
        let path = self.path.as_deref().unwrap_or("");
        let display_name = path.rsplit('/').next().unwrap_or("");
        let maj_min = self.maj_min.as_deref().unwrap_or("");
        let (major, minor) = maj_min.split_once(':').unwrap_or((maj_min, ""));

        let mut labels = LabelSet::new();
        labels.set("device", self.name.as_deref().unwrap_or(""));
        labels.set("path", path);
        labels.set("name", display_name);
        labels.set("major", major);
        labels.set("minor", minor);
        labels.set("type", self.device_type.as_deref().unwrap_or(""));
        labels.set("fs_type", self.fstype.as_deref().unwrap_or(""));
        labels.set("label", self.label.as_deref().unwrap_or(""));
        labels.set("uuid", self.uuid.as_deref().unwrap_or(""));
        labels.set("serial", self.serial.as_deref().unwrap_or(""));
        labels.set("wwn", self.wwn.as_deref().unwrap_or(""));
        labels
    }
}

// =============================================================================
// Decode & Render
// =============================================================================

/// Decode `lsblk -OJ --list` output
pub fn decode_devices(json: &str) -> Result<Vec<BlockDevice>> {
    let list: BlockDeviceList = serde_json::from_str(json)?;
    Ok(list.blockdevices)
}

/// Render one info line per block device
pub fn render_devices(devices: &[BlockDevice]) -> String {
    let mut out = String::new();
    for device in devices {
        push_info_line(&mut out, SUBSYSTEM, "info", &device.labels());
    }
    out
}

/// Enumerate block devices and render their info lines
pub(crate) async fn collect(config: &CollectorConfig) -> Result<String> {
    let stdout = run_command("lsblk", &["-OJ", "--list"], config.command_timeout).await?;
    let devices = decode_devices(&stdout)?;
    debug!(count = devices.len(), "enumerated block devices");
    Ok(render_devices(&devices))
}
