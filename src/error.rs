// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error taxonomy shared by every layer of the client

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::recording::RecordingState;

/// Result type alias for device operations
pub type Result<T> = std::result::Result<T, EarableError>;

#[derive(Error, Debug)]
pub enum EarableError {
    /// No active link when an operation needs one
    #[error("No BLE device connected: {0}")]
    Connection(String),

    #[error("Malformed sensor scheme: {0}")]
    MalformedScheme(String),

    #[error("Truncated frame for sensor {sensor_id}: need {expected} bytes, got {actual}")]
    TruncatedFrame {
        sensor_id: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown sensor id: {0}")]
    UnknownSensor(u8),

    #[error("Cannot {operation} while recording is {from}")]
    InvalidStateTransition {
        operation: &'static str,
        from: RecordingState,
    },

    #[error("Invalid recording parameters: {0}")]
    Validation(String),

    #[error("Malformed {what} response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },

    /// The underlying GATT operation failed
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse category of an [`EarableError`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    MalformedScheme,
    TruncatedFrame,
    UnknownSensor,
    InvalidStateTransition,
    Validation,
    MalformedResponse,
    Transport,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connection => "connection",
            ErrorKind::MalformedScheme => "malformed_scheme",
            ErrorKind::TruncatedFrame => "truncated_frame",
            ErrorKind::UnknownSensor => "unknown_sensor",
            ErrorKind::InvalidStateTransition => "invalid_state_transition",
            ErrorKind::Validation => "validation",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Transport => "transport",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

impl EarableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EarableError::Connection(_) => ErrorKind::Connection,
            EarableError::MalformedScheme(_) => ErrorKind::MalformedScheme,
            EarableError::TruncatedFrame { .. } => ErrorKind::TruncatedFrame,
            EarableError::UnknownSensor(_) => ErrorKind::UnknownSensor,
            EarableError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            EarableError::Validation(_) => ErrorKind::Validation,
            EarableError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            EarableError::Transport(_) => ErrorKind::Transport,
            EarableError::Io(_) => ErrorKind::Io,
        }
    }

    /// Protocol decode failures only affect the frame or read that produced them
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedScheme
                | ErrorKind::TruncatedFrame
                | ErrorKind::UnknownSensor
                | ErrorKind::MalformedResponse
        )
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured failure notification delivered to error subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(EarableError::UnknownSensor(9).kind(), ErrorKind::UnknownSensor);
        assert_eq!(
            EarableError::Connection("gone".to_string()).kind(),
            ErrorKind::Connection
        );
    }

    #[test]
    fn test_decode_errors_are_flagged() {
        let truncated = EarableError::TruncatedFrame {
            sensor_id: 0,
            expected: 12,
            actual: 4,
        };
        assert!(truncated.is_decode_error());
        assert!(!EarableError::Validation("x".to_string()).is_decode_error());
    }

    #[test]
    fn test_report_carries_message() {
        let report = EarableError::InvalidStateTransition {
            operation: "pause",
            from: RecordingState::Idle,
        }
        .report();
        assert_eq!(report.kind, ErrorKind::InvalidStateTransition);
        assert_eq!(report.message, "Cannot pause while recording is idle");
    }
}
