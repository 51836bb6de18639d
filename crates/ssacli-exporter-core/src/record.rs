//! Field kinds and the per-drive record assembled by the parser.

/// Sentinel used in the identity label when the interface type is unknown.
pub const UNKNOWN_DRIVE_TYPE: &str = "none";

/// Which piece of drive information a report line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `Usage remaining: 99.87%` (SSDs only).
    UsageRemaining,
    /// `Estimated Life Remaining based on workload to date: 5573 days`.
    EstimatedLifeRemaining,
    /// `Status: OK`.
    Status,
    /// `Current Temperature (C): 25`.
    CurrentTemperature,
    /// `Maximum Temperature (C): 55`.
    MaximumTemperature,
    /// `Power On Hours: 11024`.
    PowerOnHours,
    /// `Bay: 1`.
    Bay,
    /// `Box: 2`.
    Box,
    /// `Interface Type: SAS`.
    DriveType,
    /// `physicaldrive 1I:1:1`, the start of a new drive block.
    DriveBoundary,
}

impl FieldKind {
    /// Every kind that ends up as a gauge, in exposition order.
    pub const MEASUREMENTS: [FieldKind; 6] = [
        FieldKind::UsageRemaining,
        FieldKind::Status,
        FieldKind::CurrentTemperature,
        FieldKind::MaximumTemperature,
        FieldKind::PowerOnHours,
        FieldKind::EstimatedLifeRemaining,
    ];

    /// Whether lines of this kind produce a numeric measurement.
    pub fn is_measurement(self) -> bool {
        self.metric_name().is_some()
    }

    /// Prometheus metric name for measurement kinds.
    pub fn metric_name(self) -> Option<&'static str> {
        match self {
            Self::UsageRemaining => Some("disk_usage_remaining"),
            Self::Status => Some("disk_status"),
            Self::CurrentTemperature => Some("disk_current_temperature"),
            Self::MaximumTemperature => Some("disk_maximum_temperature"),
            Self::PowerOnHours => Some("disk_power_on_hours"),
            Self::EstimatedLifeRemaining => Some("disk_estimated_life_remaining"),
            Self::Bay | Self::Box | Self::DriveType | Self::DriveBoundary => None,
        }
    }

    /// Prometheus help text for measurement kinds.
    pub fn help(self) -> Option<&'static str> {
        match self {
            Self::UsageRemaining => Some("Disk Usage Remaining"),
            Self::Status => Some("Disk Status (OK = 1)"),
            Self::CurrentTemperature => Some("Disk Current Temperature"),
            Self::MaximumTemperature => Some("Disk Maximum Temperature"),
            Self::PowerOnHours => Some("Disk Power on Hours"),
            Self::EstimatedLifeRemaining => Some("SSD Disk Estimated Life Remaining"),
            Self::Bay | Self::Box | Self::DriveType | Self::DriveBoundary => None,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsageRemaining => write!(f, "usage_remaining"),
            Self::EstimatedLifeRemaining => write!(f, "estimated_life_remaining"),
            Self::Status => write!(f, "status"),
            Self::CurrentTemperature => write!(f, "current_temperature"),
            Self::MaximumTemperature => write!(f, "maximum_temperature"),
            Self::PowerOnHours => write!(f, "power_on_hours"),
            Self::Bay => write!(f, "bay"),
            Self::Box => write!(f, "box"),
            Self::DriveType => write!(f, "drive_type"),
            Self::DriveBoundary => write!(f, "drive_boundary"),
        }
    }
}

/// One physical drive as seen in a single report.
///
/// Measurements are kept in the order they were read so that a repeated
/// label resolves to its last occurrence when replayed into the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveRecord {
    /// The `Bay:` value (slot within the enclosure).
    pub bay: Option<String>,
    /// The `Box:` value (drive enclosure).
    pub box_id: Option<String>,
    /// The `Interface Type:` value, e.g. `SAS` or `Solid State SATA`.
    pub drive_type: Option<String>,
    /// Parsed measurements in report order.
    pub measurements: Vec<(FieldKind, f64)>,
}

impl DriveRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record can only be published once both bay and box are known.
    pub fn is_publishable(&self) -> bool {
        non_empty(&self.bay).is_some() && non_empty(&self.box_id).is_some()
    }

    /// Label value identifying this drive, `None` if the record is incomplete.
    pub fn identity(&self) -> Option<String> {
        let bay = non_empty(&self.bay)?;
        let box_id = non_empty(&self.box_id)?;
        let drive_type = non_empty(&self.drive_type).unwrap_or(UNKNOWN_DRIVE_TYPE);
        Some(format!("box {box_id} bay {bay} type {drive_type}"))
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}
