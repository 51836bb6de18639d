//! Line classification for `ssacli ... show detail` reports.
//!
//! Each line of the report is matched against a fixed table of label patterns.
//! The labels are disjoint, so at most one pattern applies; the table is still
//! tried in order and the first hit wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::record::FieldKind;

/// Status text that maps to a healthy drive.
const STATUS_OK: &str = "OK";

/// Label patterns, tried top to bottom. Capture group 1 holds the raw value.
static PATTERNS: LazyLock<Vec<(FieldKind, Regex)>> = LazyLock::new(|| {
    [
        (FieldKind::DriveBoundary, r"^\s*physicaldrive\s+(\S+)\s*$"),
        (FieldKind::Bay, r"Bay:\s*(.*)$"),
        (FieldKind::Box, r"Box:\s*(.*)$"),
        (FieldKind::DriveType, r"Interface Type:\s*(.*)$"),
        (FieldKind::Status, r"^\s*Status:\s*(.*)$"),
        (FieldKind::CurrentTemperature, r"Current Temperature[^:]*:\s*(.*)$"),
        (FieldKind::MaximumTemperature, r"Maximum Temperature[^:]*:\s*(.*)$"),
        (FieldKind::PowerOnHours, r"Power On Hours:\s*(.*)$"),
        (FieldKind::UsageRemaining, r"Usage remaining:\s*(.*?)\s*%"),
        (FieldKind::EstimatedLifeRemaining, r"to date:\s*(\S+)"),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        let re = Regex::new(pattern).expect("field patterns are valid literals");
        (kind, re)
    })
    .collect()
});

/// Result of classifying one report line.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    pub kind: FieldKind,
    /// Trimmed captured value. Always `None` for [`FieldKind::DriveBoundary`].
    pub raw_value: Option<String>,
}

impl ClassifiedLine {
    /// Numeric value of a measurement line.
    ///
    /// `Status` maps to `1.0` for `OK` and `0.0` for anything else. Numeric
    /// kinds return `None` when the captured text is not a number, and
    /// structural kinds (bay, box, type, boundary) always return `None`.
    pub fn measurement(&self) -> Option<f64> {
        let raw = self.raw_value.as_deref()?;
        match self.kind {
            FieldKind::Status => Some(if raw == STATUS_OK { 1.0 } else { 0.0 }),
            FieldKind::UsageRemaining
            | FieldKind::EstimatedLifeRemaining
            | FieldKind::CurrentTemperature
            | FieldKind::MaximumTemperature
            | FieldKind::PowerOnHours => raw.parse::<f64>().ok(),
            FieldKind::Bay | FieldKind::Box | FieldKind::DriveType | FieldKind::DriveBoundary => {
                None
            }
        }
    }
}

/// Classify a single line, returning `None` for lines that carry no field.
pub fn classify(line: &str) -> Option<ClassifiedLine> {
    PATTERNS.iter().find_map(|(kind, re)| {
        let caps = re.captures(line)?;
        let raw_value = match kind {
            FieldKind::DriveBoundary => None,
            _ => caps.get(1).map(|m| m.as_str().trim().to_string()),
        };
        Some(ClassifiedLine {
            kind: *kind,
            raw_value,
        })
    })
}
