//! Unified error type for ble-tunnel.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Nothing here is fatal: every error is logged at the controller's
//! dispatch boundary and the device waits for the next stack event.

use core::fmt;

use crate::ble::{Command, ConnectionState, EventKind};

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An AD record's declared length runs past the end of the payload.
    MalformedAdvertisingData {
        /// Offset of the offending record's length byte.
        offset: usize,
    },

    /// The event is not meaningful in the current state.
    UnexpectedEvent {
        state: ConnectionState,
        event: EventKind,
    },

    /// The radio stack refused a command.
    CommandRejected {
        command: Command,
        cause: StackError,
    },
}

/// Radio stack failures: a refused command, or a procedure that failed
/// after it was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackError {
    /// A GAP procedure is already running.
    Busy,
    /// Scan could not start.
    ScanFailed,
    /// Advertising could not start.
    AdvertiseFailed,
    /// Connection attempt failed.
    ConnectFailed,
}

impl Error {
    pub fn rejected(command: Command, cause: StackError) -> Self {
        Error::CommandRejected { command, cause }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedAdvertisingData { offset } => {
                write!(f, "AD record at offset {} overruns payload", offset)
            }
            Error::UnexpectedEvent { state, event } => {
                write!(f, "unexpected {:?} event in state {:?}", event, state)
            }
            Error::CommandRejected { command, cause } => {
                write!(f, "stack rejected {:?}: {:?}", command, cause)
            }
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Busy => f.write_str("procedure already running"),
            StackError::ScanFailed => f.write_str("scan failed"),
            StackError::AdvertiseFailed => f.write_str("advertising failed"),
            StackError::ConnectFailed => f.write_str("connect failed"),
        }
    }
}
