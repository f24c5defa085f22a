//! device-mapper table collection
//!
//! Decodes the delimiter-separated output of `dmsetup info` and renders one
//! `device_devicemapper_info` line per mapped device. Disabled by default;
//! enabled with `--enable-devicemapper`.

use tracing::{debug, warn};

use crate::collector::{run_command, CollectorConfig};
use crate::error::Result;
use crate::expose::push_info_line;
use crate::labels::LabelSet;

pub(crate) const SUBSYSTEM: &str = "devicemapper";

const DMSETUP_ARGS: &[&str] = &[
    "info",
    "-co",
    "name,major,minor,attr,uuid",
    "--noheadings",
    "--sep",
    "*",
];

// =============================================================================
// Device-Mapper Record
// =============================================================================

/// One mapped device as reported by `dmsetup info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmDevice {
    pub name: String,
    pub major: String,
    pub minor: String,
    pub attr: String,
    pub uuid: String,
}

impl DmDevice {
    fn labels(&self) -> LabelSet {
        let mut labels = LabelSet::new();
        labels.set("name", self.name.as_str());
        labels.set("major", self.major.as_str());
        labels.set("minor", self.minor.as_str());
        labels.set("attr", self.attr.as_str());
        labels.set("uuid", self.uuid.as_str());
        labels
    }
}

// =============================================================================
// Decode & Render
// =============================================================================

/// Decode `dmsetup info` star-separated rows.
///
/// The tool reports an empty table as the literal line `No devices found`.
/// Rows with fewer than five fields are dropped as malformed.
pub fn decode_devices(output: &str) -> Vec<DmDevice> {
    let output = output.trim_matches(['\n', '\r', ' ']);
    if output.is_empty() || output == "No devices found" {
        return Vec::new();
    }

    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('*').collect();
            if fields.len() < 5 {
                warn!(line, "dropping malformed dmsetup row");
                return None;
            }
            Some(DmDevice {
                name: fields[0].to_string(),
                major: fields[1].to_string(),
                minor: fields[2].to_string(),
                attr: fields[3].to_string(),
                uuid: fields[4].to_string(),
            })
        })
        .collect()
}

/// Render one info line per mapped device
pub fn render_devices(devices: &[DmDevice]) -> String {
    let mut out = String::new();
    for device in devices {
        push_info_line(&mut out, SUBSYSTEM, "info", &device.labels());
    }
    out
}

/// Enumerate device-mapper devices and render their info lines
pub(crate) async fn collect(config: &CollectorConfig) -> Result<String> {
    let stdout = run_command("dmsetup", DMSETUP_ARGS, config.command_timeout).await?;
    let devices = decode_devices(&stdout);
    debug!(count = devices.len(), "enumerated device-mapper devices");
    Ok(render_devices(&devices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rows() {
        let out = "vg0-root*254*0*L--w*LVM-abc123\nvg0-swap*254*1*L--w*LVM-def456\n";
        let devices = decode_devices(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(
            devices[0],
            DmDevice {
                name: "vg0-root".to_string(),
                major: "254".to_string(),
                minor: "0".to_string(),
                attr: "L--w".to_string(),
                uuid: "LVM-abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_no_devices_sentinel() {
        assert!(decode_devices("No devices found\n").is_empty());
        assert!(decode_devices("").is_empty());
    }

    #[test]
    fn test_decode_drops_short_rows() {
        let devices = decode_devices("vg0-root*254*0*L--w*LVM-abc\nbogus*row\n");
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_decode_keeps_empty_uuid_field() {
        let devices = decode_devices("anon*254*2*L--w*\n");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].uuid, "");
    }

    #[test]
    fn test_render_line() {
        let devices = decode_devices("vg0-root*254*0*L--w*LVM-abc123\n");
        assert_eq!(
            render_devices(&devices),
            "device_devicemapper_info{name=\"vg0-root\",major=\"254\",minor=\"0\",\
             attr=\"L--w\",uuid=\"LVM-abc123\"} 1\n"
        );
    }
}
