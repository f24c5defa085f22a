//! Property-Based Tests for the Core Invariants
//!
//! Uses proptest to systematically verify the label-set, flattener, mapper,
//! and formatter guarantees across a wide range of inputs.
//!
//! # Test Properties
//!
//! 1. **Last Write Wins**: repeated `set` keeps first position, last value
//! 2. **Traversal Completeness**: every non-placeholder leaf reported once
//! 3. **Allow-List Closure**: mapped label keys never leave the table
//! 4. **Determinism**: same inputs always render byte-identical lines

#![cfg(test)]

use proptest::prelude::*;

use super::udev::map_properties;
use super::zfs::{leaf_devices, VdevNode};
use crate::expose::format_info_line;
use crate::labels::LabelSet;
use crate::mapping::{UDEV_PROPERTIES_EXTENDED, UDEV_PROPERTIES_SIMPLE};

// =============================================================================
// Property Strategies
// =============================================================================

/// Strategy for label-set operation sequences over a small key alphabet,
/// so that overwrites actually happen.
fn ops_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-e]", "[a-z0-9]{0,6}"), 0..24)
}

/// Strategy for vdev trees mixing placeholder (guid 0) and real nodes across
/// all four child collections.
fn vdev_strategy() -> impl Strategy<Value = VdevNode> {
    let leaf = ("[a-z]{1,8}", 0u64..4).prop_map(|(name, guid)| {
        VdevNode::new(format!("/dev/{}", name), "disk", guid)
    });

    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            "[a-z]{1,8}",
            0u64..4,
            prop::collection::vec(inner.clone(), 0..4),
            prop::collection::vec(inner.clone(), 0..2),
            prop::collection::vec(inner.clone(), 0..2),
            prop::option::of(inner),
        )
            .prop_map(|(name, guid, devices, cache, spares, log)| VdevNode {
                name,
                kind: "mirror".to_string(),
                guid,
                devices,
                cache,
                spares,
                log: log.map(Box::new),
            })
    })
}

/// Strategy for raw udev property bags: a mix of allow-listed keys (in
/// arbitrary casing) and foreign keys.
fn bag_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    let key = prop_oneof![
        Just("DEVNAME".to_string()),
        Just("devname".to_string()),
        Just("DevPath".to_string()),
        Just("MAJOR".to_string()),
        Just("ID_WWN".to_string()),
        "[A-Z_]{1,12}",
    ];
    prop::collection::vec((key, "[ -~]{0,12}"), 0..16)
}

// =============================================================================
// Reference Implementations
// =============================================================================

/// Independent leaf collection used to cross-check the flattener: gathers
/// `(name, guid)` of every node with no primary children and non-zero guid,
/// in no particular order.
fn reference_leaves(node: &VdevNode, out: &mut Vec<(String, u64)>) {
    if node.devices.is_empty() && node.guid != 0 {
        out.push((node.name.clone(), node.guid));
    }
    let children = node
        .devices
        .iter()
        .chain(node.cache.iter())
        .chain(node.spares.iter())
        .chain(node.log.as_deref());
    for child in children {
        reference_leaves(child, out);
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: for every key, the final value is the last `set` value and
    /// the position is the first insertion; no key ever appears twice.
    #[test]
    fn prop_label_set_last_write_wins(ops in ops_strategy()) {
        let mut set = LabelSet::new();
        for (k, v) in &ops {
            set.set(k.as_str(), v.as_str());
        }

        // Position equals first insertion; uniqueness follows since the
        // expected order is built deduplicated.
        let keys: Vec<&str> = set.keys().collect();
        let mut expected_order: Vec<&str> = Vec::new();
        for (k, _) in &ops {
            if !expected_order.contains(&k.as_str()) {
                expected_order.push(k.as_str());
            }
        }
        prop_assert_eq!(keys, expected_order);

        // Value equals the last write for that key.
        for key in set.keys() {
            let last = ops.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
            prop_assert_eq!(set.get(key), last);
        }
    }

    /// Property: the flattener reports exactly the nodes with no primary
    /// children and non-zero guid, each once, regardless of tree shape.
    #[test]
    fn prop_flattener_completeness(root in vdev_strategy()) {
        let mut expected = Vec::new();
        reference_leaves(&root, &mut expected);
        expected.sort();

        let mut emitted: Vec<(String, u64)> = leaf_devices("pool", &root)
            .into_iter()
            .map(|leaf| (leaf.path, leaf.guid))
            .collect();

        prop_assert!(emitted.iter().all(|(_, guid)| *guid != 0));

        emitted.sort();
        prop_assert_eq!(emitted, expected);
    }

    /// Property: mapped label sets expose exactly the table's label set, in
    /// table order — no foreign property leaks through, no label is missing.
    #[test]
    fn prop_mapper_allow_list_closure(bag in bag_strategy()) {
        for table in [&UDEV_PROPERTIES_SIMPLE, &UDEV_PROPERTIES_EXTENDED] {
            let labels = map_properties(&bag, table);
            let got: Vec<&str> = labels.keys().collect();
            let expected: Vec<&str> = table.labels().collect();
            prop_assert_eq!(got, expected);
        }
    }

    /// Property: rendering is a pure function of its inputs.
    #[test]
    fn prop_formatter_deterministic(pairs in prop::collection::vec(("[a-z_]{1,8}", "[ -~]{0,16}"), 0..8)) {
        let set: LabelSet = pairs.into_iter().collect();
        let first = format_info_line("device", "udev", "info", &set);
        let second = format_info_line("device", "udev", "info", &set);
        prop_assert_eq!(first, second);
    }
}
