//! Error types for probing and configuration.

use std::process::ExitStatus;

use thiserror::Error;

/// A probe cycle could not obtain a report from the diagnostic command.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` produced non UTF-8 output: {source}")]
    InvalidOutput {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// A duration string such as `1m30s` could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid number in duration `{0}`")]
    InvalidNumber(String),

    #[error("missing or unknown unit in duration `{0}` (use ns, us, ms, s, m or h)")]
    UnknownUnit(String),

    #[error("probing interval must be greater than zero")]
    Zero,
}
