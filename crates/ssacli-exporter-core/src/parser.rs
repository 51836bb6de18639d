//! Drive record state machine.
//!
//! The builder is either idle (no drive seen yet) or accumulating exactly one
//! [`DriveRecord`]. A boundary line flushes the pending record to the sink and
//! opens a fresh one, so every field belongs to the drive block it appears in.
//! Whatever is pending when the input ends is flushed by [`DriveRecordBuilder::finish`].

use log::debug;

use crate::classify::{ClassifiedLine, classify};
use crate::record::{DriveRecord, FieldKind};
use crate::store::MetricSink;

/// Outcome of one parse pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Records handed to the sink and accepted.
    pub published: usize,
    /// Records flushed without a bay or box.
    pub dropped: usize,
}

impl ParseSummary {
    /// Total number of flushes performed.
    pub fn flushed(&self) -> usize {
        self.published + self.dropped
    }
}

/// Groups classified lines into per-drive records.
pub struct DriveRecordBuilder<'a, S: MetricSink + ?Sized> {
    sink: &'a S,
    pending: Option<DriveRecord>,
    summary: ParseSummary,
}

impl<'a, S: MetricSink + ?Sized> DriveRecordBuilder<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self {
            sink,
            pending: None,
            summary: ParseSummary::default(),
        }
    }

    /// Classify and feed one raw report line.
    pub fn feed_line(&mut self, line: &str) {
        if let Some(classified) = classify(line) {
            self.feed(classified);
        }
    }

    /// Apply one classified line to the pending record.
    pub fn feed(&mut self, line: ClassifiedLine) {
        match line.kind {
            FieldKind::DriveBoundary => {
                self.flush();
                self.pending = Some(DriveRecord::new());
            }
            FieldKind::Bay => self.current().bay = line.raw_value,
            FieldKind::Box => self.current().box_id = line.raw_value,
            FieldKind::DriveType => self.current().drive_type = line.raw_value,
            kind => match line.measurement() {
                Some(value) => self.current().measurements.push((kind, value)),
                None => debug!(
                    "ignoring unparsable {kind} value {:?}",
                    line.raw_value.as_deref().unwrap_or_default()
                ),
            },
        }
    }

    /// Flush the pending record, if any, and return the pass summary.
    pub fn finish(mut self) -> ParseSummary {
        self.flush();
        self.summary
    }

    /// Whether a record is currently being accumulated.
    pub fn is_accumulating(&self) -> bool {
        self.pending.is_some()
    }

    fn current(&mut self) -> &mut DriveRecord {
        self.pending.get_or_insert_with(DriveRecord::new)
    }

    fn flush(&mut self) {
        let Some(record) = self.pending.take() else {
            return;
        };
        if self.sink.publish(&record) {
            self.summary.published += 1;
        } else {
            self.summary.dropped += 1;
        }
    }
}

/// Run a whole report through classification, grouping and the sink.
pub fn parse_report<S: MetricSink + ?Sized>(report: &str, sink: &S) -> ParseSummary {
    let mut builder = DriveRecordBuilder::new(sink);
    for line in report.lines() {
        builder.feed_line(line);
    }
    builder.finish()
}
