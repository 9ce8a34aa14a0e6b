//! Bluetooth Low Energy subsystem.
//!
//! The radio stack is treated as a black box that produces
//! [`StackEvent`]s and accepts [`Command`]s:
//!
//! 1. **AD parser** - walks advertising / scan-response payloads and
//!    looks for the tunnel service UUID.
//! 2. **Controller** - the connection lifecycle state machine. Consumes
//!    one event at a time and issues the next command.
//! 3. **Radio** (embedded only) - drives the Nordic SoftDevice S140,
//!    turning its async procedures into events and commands into
//!    procedures.

pub mod adv_builder;
pub mod adv_parser;
pub mod controller;
pub mod uuid;

#[cfg(feature = "embedded")]
pub mod gatt;
#[cfg(feature = "embedded")]
pub mod radio;

use core::fmt;

use heapless::Vec;

use crate::error::StackError;

pub use uuid::ServiceUuid128;

/// Largest advertising payload we accept (extended advertising).
pub const MAX_ADV_PAYLOAD: usize = 255;

/// Largest legacy advertising payload.
pub const LEGACY_ADV_PAYLOAD: usize = 31;

/// Largest characteristic write we forward (ATT MTU 247 - 3 byte header).
pub const MAX_WRITE_LEN: usize = 244;

/// Connection handle assigned by the stack.
pub type ConnectionId = u16;

/// GATT attribute handle of a characteristic value.
pub type CharacteristicHandle = u16;

/// Which side of the tunnel this device plays. Fixed for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceRole {
    /// Peripheral: advertise the tunnel service and wait for a central.
    Advertiser,
    /// Central: scan for the tunnel service and connect to it.
    Scanner,
}

/// Lifecycle state owned by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Idle,
    Advertising,
    Scanning,
    Connecting,
    Connected,
}

/// Bluetooth device address, least-significant byte first (air order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BdAddr {
    fn format(&self, f: defmt::Formatter) {
        let a = &self.0;
        defmt::write!(
            f,
            "{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}",
            a[5],
            a[4],
            a[3],
            a[2],
            a[1],
            a[0]
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressType {
    Public,
    RandomStatic,
    RandomPrivateResolvable,
    RandomPrivateNonResolvable,
}

/// Kind of advertising PDU a scan report came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    ConnectableUndirected,
    ConnectableDirected,
    ScannableUndirected,
    NonConnectable,
    ScanResponse,
}

/// Radio stack firmware version, reported in the boot event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// Events delivered by the radio stack, one at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    /// The stack finished initialising. No command may be issued before this.
    Boot {
        version: StackVersion,
        address: BdAddr,
    },
    /// An advertising report or scan response was received while scanning.
    ScanResponse {
        address: BdAddr,
        address_type: AddressType,
        packet_type: PacketType,
        data: Vec<u8, MAX_ADV_PAYLOAD>,
    },
    ConnectionOpened {
        connection: ConnectionId,
    },
    ConnectionClosed {
        connection: ConnectionId,
        /// HCI disconnect reason code.
        reason: u8,
    },
    /// A peer wrote a characteristic of our GATT server.
    CharacteristicWrite {
        connection: ConnectionId,
        handle: CharacteristicHandle,
        value: Vec<u8, MAX_WRITE_LEN>,
    },
    /// A procedure started by an earlier command (advertise, scan or
    /// connect) ended in failure.
    ProcedureFailed(StackError),
}

/// Discriminant of a [`StackEvent`], for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Boot,
    ScanResponse,
    ConnectionOpened,
    ConnectionClosed,
    CharacteristicWrite,
    ProcedureFailed,
}

impl StackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StackEvent::Boot { .. } => EventKind::Boot,
            StackEvent::ScanResponse { .. } => EventKind::ScanResponse,
            StackEvent::ConnectionOpened { .. } => EventKind::ConnectionOpened,
            StackEvent::ConnectionClosed { .. } => EventKind::ConnectionClosed,
            StackEvent::CharacteristicWrite { .. } => EventKind::CharacteristicWrite,
            StackEvent::ProcedureFailed(_) => EventKind::ProcedureFailed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoverableMode {
    NonDiscoverable,
    LimitedDiscoverable,
    GeneralDiscoverable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectableMode {
    NonConnectable,
    ScannableNonConnectable,
    ConnectableScannable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanMode {
    /// Listen only; no scan requests are sent.
    Passive,
    /// Send scan requests to collect scan-response data.
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoverMode {
    Limited,
    Generic,
    Observation,
}

/// ATT status sent back for a write request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteStatus {
    Success,
}

/// Commands issued to the radio stack.
///
/// Advertising and scan timings are in 0.625 ms units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SetAdvertiseTiming {
        interval_min: u32,
        interval_max: u32,
    },
    StartAdvertising {
        discoverable: DiscoverableMode,
        connectable: ConnectableMode,
    },
    SetScanParameters {
        window: u16,
        interval: u16,
        mode: ScanMode,
    },
    StartDiscovery(DiscoverMode),
    /// Stop whichever GAP procedure (scan, advertise, connect) is running.
    EndProcedure,
    OpenConnection {
        address: BdAddr,
        address_type: AddressType,
    },
    SendWriteResponse {
        connection: ConnectionId,
        handle: CharacteristicHandle,
        status: WriteStatus,
    },
    CloseConnection(ConnectionId),
    /// Reboot into the OTA DFU bootloader. Does not return on hardware.
    ResetIntoUpdateMode,
}
