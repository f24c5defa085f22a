//! Metric Line Formatter
//!
//! Renders presence ("info") metrics in the Prometheus text exposition
//! format. Every metric this exporter produces is a gauge with the literal
//! value 1; identity lives entirely in the label set.

use std::borrow::Cow;

use crate::labels::LabelSet;

/// Metric namespace shared by every emitted line
pub const NAMESPACE: &str = "device";

// =============================================================================
// Label Value Escaping
// =============================================================================

/// Escape a label value for the text exposition format.
///
/// Backslash, double quote, and newline are the three characters the format
/// reserves inside quoted label values. Raw device metadata (model strings,
/// filesystem labels) can contain any of them.
pub fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"', '\n']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

// =============================================================================
// Info Line Rendering
// =============================================================================

/// Render one info metric as a text-format line (without trailing newline).
///
/// Output shape: `namespace_subsystem_name{k1="v1",k2="v2"} 1`, label pairs
/// in the set's iteration order. An empty label set renders without braces.
pub fn format_info_line(namespace: &str, subsystem: &str, name: &str, labels: &LabelSet) -> String {
    let mut line = format!("{}_{}_{}", namespace, subsystem, name);

    if !labels.is_empty() {
        line.push('{');
        for (i, (key, value)) in labels.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(key);
            line.push_str("=\"");
            line.push_str(&escape_label_value(value));
            line.push('"');
        }
        line.push('}');
    }

    line.push_str(" 1");
    line
}

/// Append one info metric line (newline-terminated) under the exporter
/// namespace
pub fn push_info_line(out: &mut String, subsystem: &str, name: &str, labels: &LabelSet) {
    out.push_str(&format_info_line(NAMESPACE, subsystem, name, labels));
    out.push('\n');
}
