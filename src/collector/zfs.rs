//! ZFS pool topology collection
//!
//! Decodes `zpool status -j` JSON into per-pool vdev trees, flattens each
//! tree to its leaf devices, and renders one `device_zfs_info` line per leaf.

use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::{run_command, CollectorConfig};
use crate::error::{Error, Result};
use crate::expose::push_info_line;
use crate::labels::LabelSet;

pub(crate) const SUBSYSTEM: &str = "zfs";

// =============================================================================
// Vdev Tree
// =============================================================================

/// One node of a pool's virtual-device tree.
///
/// A guid of zero marks a non-device placeholder (e.g. an empty raidz slot)
/// and is never reported.
#[derive(Debug, Clone, Default)]
pub struct VdevNode {
    /// Node name; for leaf disks this is the device path
    pub name: String,
    /// Type tag (`disk`, `mirror`, `raidz`, `root`, ...)
    pub kind: String,
    /// Vdev guid; zero means "no identifier assigned"
    pub guid: u64,
    /// Primary child devices
    pub devices: Vec<VdevNode>,
    /// L2 cache devices
    pub cache: Vec<VdevNode>,
    /// Spare devices
    pub spares: Vec<VdevNode>,
    /// Optional log subtree
    pub log: Option<Box<VdevNode>>,
}

impl VdevNode {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, guid: u64) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            guid,
            ..Self::default()
        }
    }
}

/// One imported pool with its device tree
#[derive(Debug, Clone)]
pub struct Pool {
    pub name: String,
    pub root: VdevNode,
}

// =============================================================================
// Tree Flattener
// =============================================================================

/// Identity of one reportable leaf device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDevice {
    pub kind: String,
    pub pool: String,
    pub path: String,
    pub device: String,
    pub guid: u64,
}

impl LeafDevice {
    fn labels(&self) -> LabelSet {
        let mut labels = LabelSet::new();
        labels.set("type", self.kind.as_str());
        labels.set("pool", self.pool.as_str());
        labels.set("path", self.path.as_str());
        labels.set("device", self.device.as_str());
        labels.set("guid", self.guid.to_string());
        labels
    }
}

/// Flatten a pool's vdev tree into its leaf devices.
///
/// Traversal is depth-first pre-order; within each node children are visited
/// as primary devices, then cache, then spares, then log. A node is a leaf
/// when it has no primary-device children and a non-zero guid; zero-guid
/// placeholders are skipped. Each leaf reports its own name field, not a
/// composed ancestry path.
pub fn leaf_devices(pool: &str, root: &VdevNode) -> Vec<LeafDevice> {
    fn walk(pool: &str, node: &VdevNode, leaves: &mut Vec<LeafDevice>) {
        if node.devices.is_empty() && node.guid != 0 {
            leaves.push(LeafDevice {
                kind: node.kind.clone(),
                pool: pool.to_string(),
                path: node.name.clone(),
                device: node.name.rsplit('/').next().unwrap_or("").to_string(),
                guid: node.guid,
            });
        }
        for child in &node.devices {
            walk(pool, child, leaves);
        }
        for child in &node.cache {
            walk(pool, child, leaves);
        }
        for child in &node.spares {
            walk(pool, child, leaves);
        }
        if let Some(log) = &node.log {
            walk(pool, log, leaves);
        }
    }

    let mut leaves = Vec::new();
    walk(pool, root, &mut leaves);
    leaves
}

// =============================================================================
// zpool status Decode
// =============================================================================

/// Decode `zpool status -j` output into pools.
///
/// A pool entry that fails to decode is skipped with a warning; the
/// remaining pools still report.
pub fn decode_pools(json: &str) -> Result<Vec<Pool>> {
    let value: Value = serde_json::from_str(json)?;
    let Some(pools) = value.get("pools").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let mut decoded = Vec::with_capacity(pools.len());
    for (name, pool) in pools {
        match decode_pool(name, pool) {
            Ok(pool) => decoded.push(pool),
            Err(error) => warn!(pool = %name, %error, "skipping undecodable pool"),
        }
    }
    Ok(decoded)
}

fn decode_pool(name: &str, value: &Value) -> Result<Pool> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();

    let vdevs = value
        .get("vdevs")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::UnexpectedOutput {
            program: "zpool".to_string(),
            reason: format!("pool '{}' has no vdev tree", name),
        })?;

    let (root_name, root_value) =
        vdevs.iter().next().ok_or_else(|| Error::UnexpectedOutput {
            program: "zpool".to_string(),
            reason: format!("pool '{}' has an empty vdev tree", name),
        })?;
    let mut root = decode_vdev(root_name, root_value);

    // Auxiliary classes may also appear as pool-level sections.
    for child in decode_vdev_map(value.get("logs")) {
        root.log.get_or_insert_with(|| Box::new(child));
    }
    root.cache.extend(decode_vdev_map(value.get("l2cache")));
    root.spares.extend(decode_vdev_map(value.get("spares")));

    Ok(Pool { name, root })
}

fn decode_vdev_map(value: Option<&Value>) -> Vec<VdevNode> {
    value
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| decode_vdev(k, v)).collect())
        .unwrap_or_default()
}

fn decode_vdev(key: &str, value: &Value) -> VdevNode {
    let mut node = VdevNode::new(
        value.get("name").and_then(Value::as_str).unwrap_or(key),
        value
            .get("vdev_type")
            .and_then(Value::as_str)
            .unwrap_or_default(),
        decode_guid(value.get("guid")),
    );

    if let Some(children) = value.get("vdevs").and_then(Value::as_object) {
        for (child_key, child_value) in children {
            let child = decode_vdev(child_key, child_value);
            match child_value.get("class").and_then(Value::as_str) {
                Some("log") => {
                    node.log.get_or_insert_with(|| Box::new(child));
                }
                Some("l2cache") => node.cache.push(child),
                Some("spare") => node.spares.push(child),
                _ => node.devices.push(child),
            }
        }
    }

    node
}

// Guids arrive as integers with `--json-int` and decimal strings without.
fn decode_guid(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// Render
// =============================================================================

/// Render one info line per leaf device across all pools
pub fn render_pools(pools: &[Pool]) -> String {
    let mut out = String::new();
    for pool in pools {
        for leaf in leaf_devices(&pool.name, &pool.root) {
            push_info_line(&mut out, SUBSYSTEM, "info", &leaf.labels());
        }
    }
    out
}

/// Read pool status and render leaf-device lines
pub(crate) async fn collect(config: &CollectorConfig) -> Result<String> {
    let stdout = run_command(
        "zpool",
        &["status", "-j", "--json-int", "-P"],
        config.command_timeout,
    )
    .await?;
    let pools = decode_pools(&stdout)?;
    debug!(count = pools.len(), "decoded zfs pools");
    Ok(render_pools(&pools))
}
