//! Connection lifecycle state machine.
//!
//! The controller owns the only mutable state in the application (the
//! [`ConnectionState`], the open connection and the pending-update flag)
//! and is driven one [`StackEvent`] at a time. Each event is handled to
//! completion before the next one is requested; the stack's own event
//! delivery is the only retry mechanism.
//!
//! | State       | Event               | Next                       |
//! |-------------|---------------------|----------------------------|
//! | Idle        | Boot                | Advertising / Scanning     |
//! | Scanning    | ScanResponse        | Connecting on match        |
//! | Advertising | ConnectionOpened    | Connected                  |
//! | Connecting  | ConnectionOpened    | Connected                  |
//! | Connected   | CharacteristicWrite | Connected                  |
//! | Connected   | ConnectionClosed    | role idle behaviour, or DFU|
//! | Advertising | ProcedureFailed     | Advertising (restarted)    |
//! | Scanning    | ProcedureFailed     | Scanning (restarted)       |
//! | Connecting  | ProcedureFailed     | Scanning                   |

use crate::ble::adv_parser::{extract_device_name, find_service};
use crate::ble::{
    AddressType, BdAddr, CharacteristicHandle, Command, ConnectableMode, ConnectionId,
    ConnectionState, DeviceRole, DiscoverMode, DiscoverableMode, PacketType, ScanMode,
    ServiceUuid128, StackEvent, WriteStatus,
};
use crate::error::{Error, StackError};

/// Command sink implemented by the radio stack adapter.
pub trait BleStack {
    /// Issue one command. Must not block waiting for the procedure to finish.
    fn issue(&mut self, command: Command) -> Result<(), StackError>;
}

/// Receiver for data written to the tunnel characteristic.
pub trait TunnelSink {
    fn deliver(&mut self, connection: ConnectionId, data: &[u8]);
}

/// Advertising interval range (0.625 ms units).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvertisingTiming {
    pub interval_min: u32,
    pub interval_max: u32,
}

/// Scan window / interval (0.625 ms units) and mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanTiming {
    pub window: u16,
    pub interval: u16,
    pub mode: ScanMode,
}

/// GATT value handles the controller reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacteristicHandles {
    /// Any write here schedules a reboot into the DFU bootloader.
    pub ota_control: CharacteristicHandle,
    /// Writes here carry tunnel payload.
    pub tunnel_data: CharacteristicHandle,
}

/// Behaviour after a connection closes without a pending update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResumePolicy {
    /// Re-advertise or re-scan, per role.
    Resume,
    /// Stay idle until the device is reset.
    StayIdle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub role: DeviceRole,
    pub target: ServiceUuid128,
    pub advertising: AdvertisingTiming,
    pub scan: ScanTiming,
    pub handles: CharacteristicHandles,
    pub resume: ResumePolicy,
}

/// What the event loop should do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Wait for the next event.
    Continue,
    /// `ResetIntoUpdateMode` was issued; no further events will follow.
    UpdateReset,
}

pub struct Controller {
    config: ControllerConfig,
    state: ConnectionState,
    connection: Option<ConnectionId>,
    pending_update: bool,
}

impl Controller {
    pub const fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Idle,
            connection: None,
            pending_update: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn role(&self) -> DeviceRole {
        self.config.role
    }

    /// The open connection, once `ConnectionOpened` has been seen.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// True between the OTA control write and the following disconnect.
    pub fn update_pending(&self) -> bool {
        self.pending_update
    }

    /// Handle one stack event. Never fails: errors are logged and the
    /// controller stays where the error left it.
    pub fn handle<S, T>(&mut self, event: &StackEvent, stack: &mut S, tunnel: &mut T) -> Outcome
    where
        S: BleStack,
        T: TunnelSink,
    {
        match self.dispatch(event, stack, tunnel) {
            Ok(outcome) => outcome,
            Err(e @ Error::UnexpectedEvent { .. }) => {
                debug!("ignored: {}", e);
                Outcome::Continue
            }
            Err(e) => {
                warn!("{}", e);
                Outcome::Continue
            }
        }
    }

    fn dispatch<S, T>(&mut self, event: &StackEvent, stack: &mut S, tunnel: &mut T) -> Result<Outcome, Error>
    where
        S: BleStack,
        T: TunnelSink,
    {
        use ConnectionState::*;

        match (self.state, event) {
            (Idle, StackEvent::Boot { version, address }) => {
                info!(
                    "stack version: {}.{}.{}, local address {}",
                    version.major,
                    version.minor,
                    version.patch,
                    address
                );
                self.boot(stack)
            }
            (
                Scanning,
                StackEvent::ScanResponse {
                    address,
                    address_type,
                    packet_type,
                    data,
                },
            ) => self.scan_response(*address, *address_type, *packet_type, data, stack),
            (Advertising | Connecting, StackEvent::ConnectionOpened { connection }) => {
                info!("connection {} opened", connection);
                self.connection = Some(*connection);
                self.state = Connected;
                Ok(Outcome::Continue)
            }
            (
                Connected,
                StackEvent::CharacteristicWrite {
                    connection,
                    handle,
                    value,
                },
            ) if self.is_current(*connection) => self.write(*connection, *handle, value, stack, tunnel),
            (Connected, StackEvent::ConnectionClosed { connection, reason })
                if self.is_current(*connection) =>
            {
                info!("connection {} closed, reason: 0x{:02x}", connection, reason);
                self.closed(stack)
            }
            (Advertising | Scanning | Connecting, StackEvent::ProcedureFailed(cause)) => {
                warn!("{} in state {}", cause, self.state);
                self.start_role(stack)
            }
            (state, event) => Err(Error::UnexpectedEvent {
                state,
                event: event.kind(),
            }),
        }
    }

    fn is_current(&self, connection: ConnectionId) -> bool {
        self.connection == Some(connection)
    }

    fn boot<S: BleStack>(&mut self, stack: &mut S) -> Result<Outcome, Error> {
        match self.config.role {
            DeviceRole::Advertiser => {
                info!("boot event - starting advertising");
                let timing = self.config.advertising;
                issue(
                    stack,
                    Command::SetAdvertiseTiming {
                        interval_min: timing.interval_min,
                        interval_max: timing.interval_max,
                    },
                )?;
            }
            DeviceRole::Scanner => {
                info!("boot event - starting scan");
                let scan = self.config.scan;
                issue(
                    stack,
                    Command::SetScanParameters {
                        window: scan.window,
                        interval: scan.interval,
                        mode: scan.mode,
                    },
                )?;
            }
        }
        self.start_role(stack)
    }

    /// Start advertising or discovery. Timing must already be configured.
    fn start_role<S: BleStack>(&mut self, stack: &mut S) -> Result<Outcome, Error> {
        match self.config.role {
            DeviceRole::Advertiser => {
                issue(
                    stack,
                    Command::StartAdvertising {
                        discoverable: DiscoverableMode::GeneralDiscoverable,
                        connectable: ConnectableMode::ConnectableScannable,
                    },
                )?;
                self.state = ConnectionState::Advertising;
            }
            DeviceRole::Scanner => {
                issue(stack, Command::StartDiscovery(DiscoverMode::Generic))?;
                self.state = ConnectionState::Scanning;
            }
        }
        Ok(Outcome::Continue)
    }

    fn scan_response<S: BleStack>(
        &mut self,
        address: BdAddr,
        address_type: AddressType,
        packet_type: PacketType,
        data: &[u8],
        stack: &mut S,
    ) -> Result<Outcome, Error> {
        trace!("scan response, packet type {}", packet_type);

        // Most reports are other devices; nothing worth logging.
        if !find_service(data, &self.config.target) {
            return Ok(Outcome::Continue);
        }

        info!(
            "tunnel service found on {}, connecting to {}",
            extract_device_name(data).as_str(),
            address
        );
        issue(stack, Command::EndProcedure)?;
        if let Err(e) = issue(
            stack,
            Command::OpenConnection {
                address,
                address_type,
            },
        ) {
            // Scanning has already ended; restart it so later reports
            // still reach us.
            issue(stack, Command::StartDiscovery(DiscoverMode::Generic))?;
            return Err(e);
        }
        self.state = ConnectionState::Connecting;
        Ok(Outcome::Continue)
    }

    fn write<S, T>(
        &mut self,
        connection: ConnectionId,
        handle: CharacteristicHandle,
        value: &[u8],
        stack: &mut S,
        tunnel: &mut T,
    ) -> Result<Outcome, Error>
    where
        S: BleStack,
        T: TunnelSink,
    {
        let handles = self.config.handles;
        if handle == handles.tunnel_data {
            debug!("tunnel in/out written, {} bytes", value.len());
            tunnel.deliver(connection, value);
        } else if handle == handles.ota_control {
            info!("OTA control written - rebooting to DFU after disconnect");
            self.pending_update = true;

            // The close still goes out if the response is lost; the peer
            // sees the disconnect either way.
            if let Err(e) = issue(
                stack,
                Command::SendWriteResponse {
                    connection,
                    handle,
                    status: WriteStatus::Success,
                },
            ) {
                warn!("{}", e);
            }
            issue(stack, Command::CloseConnection(connection))?;
        } else {
            debug!("write to unhandled characteristic 0x{:04x}", handle);
        }
        Ok(Outcome::Continue)
    }

    fn closed<S: BleStack>(&mut self, stack: &mut S) -> Result<Outcome, Error> {
        self.connection = None;
        self.state = ConnectionState::Idle;

        if core::mem::take(&mut self.pending_update) {
            info!("entering OTA DFU mode");
            match issue(stack, Command::ResetIntoUpdateMode) {
                Ok(()) => return Ok(Outcome::UpdateReset),
                // Stay reachable so the peer can trigger the update again.
                Err(e) => warn!("{}", e),
            }
        }

        match self.config.resume {
            ResumePolicy::Resume => self.start_role(stack),
            ResumePolicy::StayIdle => Ok(Outcome::Continue),
        }
    }
}

fn issue<S: BleStack>(stack: &mut S, command: Command) -> Result<(), Error> {
    stack
        .issue(command)
        .map_err(|cause| Error::rejected(command, cause))
}

/// Drive `controller` from `events` until the update reset is issued or
/// the source runs dry.
pub fn run<I, S, T>(controller: &mut Controller, events: I, stack: &mut S, tunnel: &mut T) -> Outcome
where
    I: IntoIterator<Item = StackEvent>,
    S: BleStack,
    T: TunnelSink,
{
    for event in events {
        if controller.handle(&event, stack, tunnel) == Outcome::UpdateReset {
            return Outcome::UpdateReset;
        }
    }
    Outcome::Continue
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::StackVersion;
    use heapless::Vec;
    use std::vec::Vec as StdVec;

    const TARGET: ServiceUuid128 = ServiceUuid128::from_u128(0x86934d83_630e_4f8c_a9a2_82ede9f87aa9);
    const OTA: CharacteristicHandle = 0x0012;
    const TUNNEL: CharacteristicHandle = 0x000E;
    const PEER: BdAddr = BdAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    #[derive(Default)]
    struct MockStack {
        issued: StdVec<Command>,
        reject: Option<fn(&Command) -> bool>,
    }

    impl BleStack for MockStack {
        fn issue(&mut self, command: Command) -> Result<(), StackError> {
            if self.reject.is_some_and(|r| r(&command)) {
                return Err(StackError::Busy);
            }
            self.issued.push(command);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockTunnel {
        received: StdVec<(ConnectionId, StdVec<u8>)>,
    }

    impl TunnelSink for MockTunnel {
        fn deliver(&mut self, connection: ConnectionId, data: &[u8]) {
            self.received.push((connection, data.to_vec()));
        }
    }

    fn config(role: DeviceRole) -> ControllerConfig {
        ControllerConfig {
            role,
            target: TARGET,
            advertising: AdvertisingTiming {
                interval_min: 160,
                interval_max: 160,
            },
            scan: ScanTiming {
                window: 320,
                interval: 320,
                mode: ScanMode::Passive,
            },
            handles: CharacteristicHandles {
                ota_control: OTA,
                tunnel_data: TUNNEL,
            },
            resume: ResumePolicy::Resume,
        }
    }

    fn boot() -> StackEvent {
        StackEvent::Boot {
            version: StackVersion {
                major: 7,
                minor: 3,
                patch: 0,
            },
            address: BdAddr([1, 2, 3, 4, 5, 6]),
        }
    }

    fn scan_response(payload: &[u8]) -> StackEvent {
        StackEvent::ScanResponse {
            address: PEER,
            address_type: AddressType::Public,
            packet_type: PacketType::ConnectableUndirected,
            data: Vec::from_slice(payload).unwrap(),
        }
    }

    fn matching_payload() -> StdVec<u8> {
        let mut ad = std::vec![0x02, 0x01, 0x06, 0x11, 0x07];
        ad.extend_from_slice(&TARGET.to_wire());
        ad
    }

    fn write(handle: CharacteristicHandle, value: &[u8]) -> StackEvent {
        StackEvent::CharacteristicWrite {
            connection: 1,
            handle,
            value: Vec::from_slice(value).unwrap(),
        }
    }

    fn closed() -> StackEvent {
        StackEvent::ConnectionClosed {
            connection: 1,
            reason: 0x13,
        }
    }

    struct Harness {
        controller: Controller,
        stack: MockStack,
        tunnel: MockTunnel,
    }

    impl Harness {
        fn new(config: ControllerConfig) -> Self {
            Self {
                controller: Controller::new(config),
                stack: MockStack::default(),
                tunnel: MockTunnel::default(),
            }
        }

        fn send(&mut self, event: StackEvent) -> Outcome {
            self.controller
                .handle(&event, &mut self.stack, &mut self.tunnel)
        }

        fn connected(role: DeviceRole) -> Self {
            let mut h = Self::new(config(role));
            h.send(boot());
            if role == DeviceRole::Scanner {
                h.send(scan_response(&matching_payload()));
            }
            h.send(StackEvent::ConnectionOpened { connection: 1 });
            assert_eq!(h.controller.state(), ConnectionState::Connected);
            h.stack.issued.clear();
            h
        }
    }

    #[test]
    fn advertiser_boot_sets_timing_then_advertises() {
        let mut h = Harness::new(config(DeviceRole::Advertiser));
        assert_eq!(h.send(boot()), Outcome::Continue);
        assert_eq!(h.controller.state(), ConnectionState::Advertising);
        assert_eq!(
            h.stack.issued,
            [
                Command::SetAdvertiseTiming {
                    interval_min: 160,
                    interval_max: 160
                },
                Command::StartAdvertising {
                    discoverable: DiscoverableMode::GeneralDiscoverable,
                    connectable: ConnectableMode::ConnectableScannable,
                },
            ]
        );
    }

    #[test]
    fn scanner_boot_starts_passive_discovery() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
        assert_eq!(
            h.stack.issued,
            [
                Command::SetScanParameters {
                    window: 320,
                    interval: 320,
                    mode: ScanMode::Passive
                },
                Command::StartDiscovery(DiscoverMode::Generic),
            ]
        );
    }

    #[test]
    fn rejected_start_leaves_controller_idle() {
        let mut h = Harness::new(config(DeviceRole::Advertiser));
        h.stack.reject = Some(|c| matches!(c, Command::StartAdvertising { .. }));
        h.send(boot());
        assert_eq!(h.controller.state(), ConnectionState::Idle);
    }

    #[test]
    fn second_boot_is_ignored() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        h.stack.issued.clear();
        h.send(boot());
        assert!(h.stack.issued.is_empty());
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
    }

    #[test]
    fn matching_scan_response_ends_scan_then_connects() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        h.stack.issued.clear();

        h.send(scan_response(&matching_payload()));
        assert_eq!(h.controller.state(), ConnectionState::Connecting);
        assert_eq!(
            h.stack.issued,
            [
                Command::EndProcedure,
                Command::OpenConnection {
                    address: PEER,
                    address_type: AddressType::Public
                },
            ]
        );
    }

    #[test]
    fn non_matching_scan_response_keeps_scanning() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        h.stack.issued.clear();

        h.send(scan_response(&[0x02, 0x01, 0x06, 0x03, 0x03, 0x0F, 0x18]));
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
        assert!(h.stack.issued.is_empty());
    }

    #[test]
    fn rejected_connect_restarts_discovery() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        h.stack.issued.clear();
        h.stack.reject = Some(|c| matches!(c, Command::OpenConnection { .. }));

        h.send(scan_response(&matching_payload()));
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
        assert_eq!(
            h.stack.issued,
            [
                Command::EndProcedure,
                Command::StartDiscovery(DiscoverMode::Generic),
            ]
        );

        // The next matching report gets another chance to connect.
        h.stack.reject = None;
        h.stack.issued.clear();
        h.send(scan_response(&matching_payload()));
        assert_eq!(h.controller.state(), ConnectionState::Connecting);
        assert_eq!(h.stack.issued.len(), 2);
    }

    #[test]
    fn failed_connect_procedure_returns_to_scanning() {
        let mut h = Harness::new(config(DeviceRole::Scanner));
        h.send(boot());
        h.send(scan_response(&matching_payload()));
        h.stack.issued.clear();

        h.send(StackEvent::ProcedureFailed(StackError::ConnectFailed));
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
        assert_eq!(
            h.stack.issued,
            [Command::StartDiscovery(DiscoverMode::Generic)]
        );
    }

    #[test]
    fn failed_advertising_is_restarted() {
        let mut h = Harness::new(config(DeviceRole::Advertiser));
        h.send(boot());
        h.stack.issued.clear();

        h.send(StackEvent::ProcedureFailed(StackError::AdvertiseFailed));
        assert_eq!(h.controller.state(), ConnectionState::Advertising);
        assert_eq!(
            h.stack.issued,
            [Command::StartAdvertising {
                discoverable: DiscoverableMode::GeneralDiscoverable,
                connectable: ConnectableMode::ConnectableScannable,
            }]
        );
    }

    #[test]
    fn procedure_failure_while_connected_is_ignored() {
        let mut h = Harness::connected(DeviceRole::Scanner);
        h.send(StackEvent::ProcedureFailed(StackError::ScanFailed));
        assert_eq!(h.controller.state(), ConnectionState::Connected);
        assert!(h.stack.issued.is_empty());
    }

    #[test]
    fn scan_response_outside_scanning_is_ignored() {
        let mut h = Harness::new(config(DeviceRole::Advertiser));
        h.send(boot());
        h.stack.issued.clear();
        h.send(scan_response(&matching_payload()));
        assert!(h.stack.issued.is_empty());
        assert_eq!(h.controller.state(), ConnectionState::Advertising);
    }

    #[test]
    fn connection_opened_from_advertising() {
        let h = Harness::connected(DeviceRole::Advertiser);
        assert_eq!(h.controller.connection(), Some(1));
    }

    #[test]
    fn connection_opened_while_idle_is_ignored() {
        let mut h = Harness::new(config(DeviceRole::Advertiser));
        h.send(StackEvent::ConnectionOpened { connection: 1 });
        assert_eq!(h.controller.state(), ConnectionState::Idle);
        assert_eq!(h.controller.connection(), None);
    }

    #[test]
    fn tunnel_write_is_delivered() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(write(TUNNEL, b"hello"));
        assert_eq!(h.tunnel.received, [(1, b"hello".to_vec())]);
        assert!(h.stack.issued.is_empty());
        assert_eq!(h.controller.state(), ConnectionState::Connected);
    }

    #[test]
    fn ota_write_acknowledges_then_closes() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(write(OTA, &[0x00]));
        assert!(h.controller.update_pending());
        assert_eq!(
            h.stack.issued,
            [
                Command::SendWriteResponse {
                    connection: 1,
                    handle: OTA,
                    status: WriteStatus::Success
                },
                Command::CloseConnection(1),
            ]
        );
        assert_eq!(h.controller.state(), ConnectionState::Connected);
    }

    #[test]
    fn failed_write_response_still_closes() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.stack.reject = Some(|c| matches!(c, Command::SendWriteResponse { .. }));
        h.send(write(OTA, &[0x00]));
        assert!(h.controller.update_pending());
        assert_eq!(h.stack.issued, [Command::CloseConnection(1)]);
    }

    #[test]
    fn close_after_ota_write_resets_into_dfu() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(write(OTA, &[0x00]));
        h.stack.issued.clear();

        assert_eq!(h.send(closed()), Outcome::UpdateReset);
        assert_eq!(h.stack.issued, [Command::ResetIntoUpdateMode]);
        assert!(!h.controller.update_pending());
    }

    #[test]
    fn plain_close_resumes_advertising() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        assert_eq!(h.send(closed()), Outcome::Continue);
        assert_eq!(h.controller.state(), ConnectionState::Advertising);
        assert_eq!(
            h.stack.issued,
            [Command::StartAdvertising {
                discoverable: DiscoverableMode::GeneralDiscoverable,
                connectable: ConnectableMode::ConnectableScannable,
            }]
        );
    }

    #[test]
    fn plain_close_resumes_scanning() {
        let mut h = Harness::connected(DeviceRole::Scanner);
        h.send(closed());
        assert_eq!(h.controller.state(), ConnectionState::Scanning);
        assert_eq!(
            h.stack.issued,
            [Command::StartDiscovery(DiscoverMode::Generic)]
        );
    }

    #[test]
    fn stay_idle_policy_does_not_resume() {
        let mut cfg = config(DeviceRole::Advertiser);
        cfg.resume = ResumePolicy::StayIdle;
        let mut h = Harness::new(cfg);
        h.send(boot());
        h.send(StackEvent::ConnectionOpened { connection: 1 });
        h.stack.issued.clear();

        h.send(closed());
        assert_eq!(h.controller.state(), ConnectionState::Idle);
        assert!(h.stack.issued.is_empty());
    }

    #[test]
    fn failed_reset_falls_back_to_resume() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(write(OTA, &[0x00]));
        h.stack.reject = Some(|c| matches!(c, Command::ResetIntoUpdateMode));

        assert_eq!(h.send(closed()), Outcome::Continue);
        assert_eq!(h.controller.state(), ConnectionState::Advertising);
    }

    #[test]
    fn close_for_other_connection_is_ignored() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(StackEvent::ConnectionClosed {
            connection: 7,
            reason: 0x08,
        });
        assert_eq!(h.controller.state(), ConnectionState::Connected);
        assert!(h.stack.issued.is_empty());
    }

    #[test]
    fn unknown_handle_is_ignored() {
        let mut h = Harness::connected(DeviceRole::Advertiser);
        h.send(write(0x0040, &[1, 2, 3]));
        assert!(h.stack.issued.is_empty());
        assert!(h.tunnel.received.is_empty());
        assert!(!h.controller.update_pending());
    }

    #[test]
    fn run_stops_at_update_reset() {
        let mut controller = Controller::new(config(DeviceRole::Advertiser));
        let mut stack = MockStack::default();
        let mut tunnel = MockTunnel::default();
        let events = [
            boot(),
            StackEvent::ConnectionOpened { connection: 1 },
            write(OTA, &[0x00]),
            closed(),
            // Never reached: the device has reset.
            boot(),
        ];

        let outcome = run(&mut controller, events, &mut stack, &mut tunnel);
        assert_eq!(outcome, Outcome::UpdateReset);
        assert_eq!(stack.issued.last(), Some(&Command::ResetIntoUpdateMode));
    }
}
