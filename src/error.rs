//! Error types for panel operations.
//!
//! Every operator action ends in one of these. None of them are retried:
//! connection and validation errors are shown to the operator as a dialog,
//! write and read errors become lines in the panel log.

use std::io;
use thiserror::Error;

/// Input rejected before anything is sent to the board.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Angle must be a number 0..180 (got {input:?})")]
    InvalidAngle { input: String },

    #[error("All pins must be numbers (servo {servo}: {input:?})")]
    InvalidPin { servo: usize, input: String },

    #[error("Pins must not be duplicated: {0:?}")]
    DuplicatePins(Vec<i64>),

    #[error("Pins not valid for MEGA: {0:?}\nUse 2–13 or 22–53.")]
    PinOutOfRange(Vec<i64>),

    #[error("No servo selected.")]
    EmptySelection,

    #[error("Select a port first")]
    NoPortSelected,
}

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to open {device}: {source}")]
    Connection {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("Send error: {0}")]
    Write(#[source] io::Error),

    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// How loudly the GUI should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl PanelError {
    /// Dialog title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            PanelError::Connection { .. } => "Connect Error",
            PanelError::Write(_) | PanelError::Read(_) => "Serial",
            PanelError::Validation(v) => match v {
                ValidationError::InvalidAngle { .. } => "Angle",
                ValidationError::InvalidPin { .. }
                | ValidationError::DuplicatePins(_)
                | ValidationError::PinOutOfRange(_) => "Pins",
                ValidationError::EmptySelection => "Group",
                ValidationError::NoPortSelected => "Port",
            },
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PanelError::Validation(ValidationError::EmptySelection) => Severity::Info,
            PanelError::Validation(ValidationError::NoPortSelected) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Text used when the error is reported as a log line rather than a dialog.
    pub fn log_line(&self) -> String {
        format!("! {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_log_line() {
        let err = PanelError::Write(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert_eq!(err.log_line(), "! Send error: pipe closed");
    }

    #[test]
    fn test_selection_is_informational() {
        let err = PanelError::from(ValidationError::EmptySelection);
        assert_eq!(err.severity(), Severity::Info);
        assert_eq!(err.title(), "Group");
    }
}
