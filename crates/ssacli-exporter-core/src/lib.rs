//! # ssacli-exporter-core
//!
//! Turns the free-form output of `ssacli ctrl first physicaldrive all show detail`
//! into per-drive Prometheus gauges.
//!
//! ## Quick Start
//!
//! ```
//! use ssacli_exporter_core::{FieldKind, MetricStore, parse_report};
//!
//! let report = "\
//! physicaldrive 1I:1:1
//!          Bay: 1
//!          Box: 2
//!          Status: OK
//!          Interface Type: SAS
//!          Current Temperature (C): 25
//! ";
//!
//! let store = MetricStore::new().unwrap();
//! let summary = parse_report(report, &store);
//! assert_eq!(summary.published, 1);
//! assert_eq!(
//!     store.value(FieldKind::CurrentTemperature, "box 2 bay 1 type SAS"),
//!     Some(25.0)
//! );
//! ```
//!
//! ## Architecture
//!
//! Command output → [`classify`] (one line at a time) → [`DriveRecordBuilder`]
//! (groups fields per drive) → [`MetricSink`] ([`MetricStore`] in production).
//!
//! The [`ProbeLoop`] repeats that pipeline on a fixed interval, running the
//! diagnostic command through a [`CommandRunner`].

pub mod classify;
pub mod config;
pub mod error;
pub mod parser;
pub mod probe;
pub mod record;
pub mod store;

pub use classify::{ClassifiedLine, classify};
pub use config::{DEFAULT_COMMAND, DEFAULT_PORT, DEFAULT_PROBING_RATE, ProbeConfig, parse_duration};
pub use error::{DurationError, ProbeError};
pub use parser::{DriveRecordBuilder, ParseSummary, parse_report};
pub use probe::{CommandRunner, ProbeHandle, ProbeLoop, ShellCommandRunner};
pub use record::{DriveRecord, FieldKind};
pub use store::{MetricSink, MetricStore};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
