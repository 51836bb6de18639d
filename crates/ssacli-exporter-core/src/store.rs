//! Prometheus-backed drive metric store.
//!
//! One [`MetricStore`] lives for the whole process. It owns a private
//! [`Registry`] holding one gauge family per measurement kind, labelled by
//! drive identity. Each `GaugeVec` guards its label map with a reader-writer
//! lock, so scrapes can run while a probe cycle is writing.
//!
//! Values are overwritten, never expired: a drive that disappears from the
//! report keeps exporting its last known values.

use std::collections::BTreeSet;

use log::debug;
use prometheus::{Encoder, GaugeVec, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::record::{DriveRecord, FieldKind};

/// Label carrying the drive identity on every drive gauge.
pub const DRIVE_LABEL: &str = "physicaldrive";

/// Receiver of completed drive records.
pub trait MetricSink {
    /// Publish `record`, returning `false` if it was dropped as incomplete.
    fn publish(&self, record: &DriveRecord) -> bool;
}

/// Drive gauges plus exporter self-metrics.
pub struct MetricStore {
    registry: Registry,
    usage_remaining: GaugeVec,
    status: GaugeVec,
    current_temperature: GaugeVec,
    maximum_temperature: GaugeVec,
    power_on_hours: GaugeVec,
    estimated_life_remaining: GaugeVec,
    records_dropped: IntCounter,
    probe_failures: IntCounter,
    probe_success: IntGauge,
}

impl MetricStore {
    /// Create the store and register every metric family.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let drive_gauge = |kind: FieldKind| -> prometheus::Result<GaugeVec> {
            let name = kind.metric_name().unwrap_or_default();
            let help = kind.help().unwrap_or_default();
            let gauge = GaugeVec::new(Opts::new(name, help), &[DRIVE_LABEL])?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };
        let usage_remaining = drive_gauge(FieldKind::UsageRemaining)?;
        let status = drive_gauge(FieldKind::Status)?;
        let current_temperature = drive_gauge(FieldKind::CurrentTemperature)?;
        let maximum_temperature = drive_gauge(FieldKind::MaximumTemperature)?;
        let power_on_hours = drive_gauge(FieldKind::PowerOnHours)?;
        let estimated_life_remaining = drive_gauge(FieldKind::EstimatedLifeRemaining)?;

        let records_dropped = IntCounter::new(
            "ssacli_records_dropped_total",
            "Drive records discarded because bay or box was missing",
        )?;
        registry.register(Box::new(records_dropped.clone()))?;

        let probe_failures = IntCounter::new(
            "ssacli_probe_failures_total",
            "Probe cycles skipped because the diagnostic command failed",
        )?;
        registry.register(Box::new(probe_failures.clone()))?;

        let probe_success = IntGauge::new(
            "ssacli_probe_success",
            "Whether the last probe cycle succeeded (1) or failed (0)",
        )?;
        registry.register(Box::new(probe_success.clone()))?;

        Ok(Self {
            registry,
            usage_remaining,
            status,
            current_temperature,
            maximum_temperature,
            power_on_hours,
            estimated_life_remaining,
            records_dropped,
            probe_failures,
            probe_success,
        })
    }

    fn gauge_for(&self, kind: FieldKind) -> Option<&GaugeVec> {
        match kind {
            FieldKind::UsageRemaining => Some(&self.usage_remaining),
            FieldKind::Status => Some(&self.status),
            FieldKind::CurrentTemperature => Some(&self.current_temperature),
            FieldKind::MaximumTemperature => Some(&self.maximum_temperature),
            FieldKind::PowerOnHours => Some(&self.power_on_hours),
            FieldKind::EstimatedLifeRemaining => Some(&self.estimated_life_remaining),
            FieldKind::Bay | FieldKind::Box | FieldKind::DriveType | FieldKind::DriveBoundary => {
                None
            }
        }
    }

    /// Mark the last probe cycle as successful.
    pub fn record_probe_success(&self) {
        self.probe_success.set(1);
    }

    /// Count a failed probe cycle.
    pub fn record_probe_failure(&self) {
        self.probe_failures.inc();
        self.probe_success.set(0);
    }

    /// Number of probe cycles that failed so far.
    pub fn probe_failures(&self) -> u64 {
        self.probe_failures.get()
    }

    /// Number of incomplete records dropped so far.
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.get()
    }

    /// Latest value exported for `kind` and drive `identity`, if any.
    ///
    /// Reads through a gather so that looking up an unknown drive does not
    /// create an empty series.
    pub fn value(&self, kind: FieldKind, identity: &str) -> Option<f64> {
        let name = kind.metric_name()?;
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|l| l.get_name() == DRIVE_LABEL && l.get_value() == identity)
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Every drive identity currently exported, sorted.
    pub fn drive_identities(&self) -> Vec<String> {
        let mut identities = BTreeSet::new();
        for family in self.registry.gather() {
            for metric in family.get_metric() {
                for label in metric.get_label() {
                    if label.get_name() == DRIVE_LABEL {
                        identities.insert(label.get_value().to_string());
                    }
                }
            }
        }
        identities.into_iter().collect()
    }

    /// Render every family in the Prometheus text exposition format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type matching [`MetricStore::encode`].
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl MetricSink for MetricStore {
    fn publish(&self, record: &DriveRecord) -> bool {
        let Some(identity) = record.identity() else {
            debug!(
                "dropping incomplete drive record (bay={:?}, box={:?})",
                record.bay, record.box_id
            );
            self.records_dropped.inc();
            return false;
        };

        for &(kind, value) in &record.measurements {
            if let Some(gauge) = self.gauge_for(kind) {
                gauge.with_label_values(&[identity.as_str()]).set(value);
            }
        }
        true
    }
}
