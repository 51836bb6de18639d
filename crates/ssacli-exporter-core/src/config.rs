//! Exporter defaults and duration parsing.

use std::time::Duration;

use crate::error::DurationError;

/// Default HTTP port for the scrape endpoint.
pub const DEFAULT_PORT: u16 = 9109;

/// Default interval between probe cycles, as accepted by [`parse_duration`].
pub const DEFAULT_PROBING_RATE: &str = "1m";

/// Diagnostic command run on every probe cycle.
pub const DEFAULT_COMMAND: &str = "ssacli ctrl first physicaldrive all show detail";

/// Shell used to interpret [`DEFAULT_COMMAND`].
pub const DEFAULT_SHELL: &str = "bash";

/// What to run and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Full command line, handed to `shell -c`.
    pub command: String,
    pub shell: String,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            interval: Duration::from_secs(60),
        }
    }
}

/// Parse a duration such as `"1m"`, `"90s"`, `"1m30s"`, `"1.5h"` or `"250ms"`.
///
/// Accepts a sequence of decimal numbers, each followed by a unit
/// (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`). A zero total is rejected since it
/// would turn the probe loop into a busy loop.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Err(DurationError::Zero);
    }
    let invalid = || DurationError::InvalidNumber(s.to_string());

    let mut rest = s;
    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(num_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ if number.is_empty() => return Err(invalid()),
            _ => return Err(DurationError::UnknownUnit(s.to_string())),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(unit_nanos).ok_or_else(invalid)?;
        let mut scale = unit_nanos;
        for digit in fraction.bytes() {
            scale /= 10;
            nanos = nanos
                .checked_add(u128::from(digit - b'0') * scale)
                .ok_or_else(invalid)?;
        }

        total_nanos = total_nanos.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    if total_nanos == 0 {
        return Err(DurationError::Zero);
    }
    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid())?;
    // Remainder of a division by 1e9 always fits in u32.
    let subsec = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}
