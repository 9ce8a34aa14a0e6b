//! SoftDevice S140 adapter.
//!
//! Bridges the async nrf-softdevice API to the controller's
//! one-event-at-a-time model:
//!
//! - [`SoftdeviceStack`] turns each [`Command`] into a request for the
//!   radio task (or a signal to the procedure it is running) and returns
//!   immediately.
//! - [`run`] is the radio task. It runs one GAP procedure at a time
//!   (advertise, scan, connect, then serve the connection) and publishes
//!   what happens on [`EVENTS`].
//!
//! The controller task is the only consumer of [`EVENTS`].

use core::slice;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::{
    central, gatt_server, peripheral, Address, AddressType as SdAddressType, Connection,
};
use nrf_softdevice::{raw, Softdevice};

use crate::ble::adv_builder::encode_advertisement;
use crate::ble::gatt::{OtaServiceEvent, Server, ServerEvent, TunnelServiceEvent};
use crate::ble::{
    AddressType, BdAddr, CharacteristicHandle, Command, ConnectionId, PacketType, ScanMode,
    StackEvent, StackVersion,
};
use crate::config;
use crate::error::StackError;
use crate::BleStack;

/// HCI reason for a disconnect we asked for.
const REASON_LOCAL_HOST_TERMINATED: u8 = 0x16;

/// nrf-softdevice does not surface the peer's reason; report the usual one.
const REASON_REMOTE_USER_TERMINATED: u8 = 0x13;

/// Stack events, consumed by the controller task.
pub static EVENTS: Channel<CriticalSectionRawMutex, StackEvent, 8> = Channel::new();

/// Procedures queued for the radio task.
static REQUESTS: Channel<CriticalSectionRawMutex, Procedure, 2> = Channel::new();

/// Ends the running advertise / scan / connect procedure.
static STOP: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Closes the served connection with this handle.
static CLOSE: Signal<CriticalSectionRawMutex, ConnectionId> = Signal::new();

#[derive(Clone, Copy)]
struct ScanParams {
    window: u16,
    interval: u16,
    mode: ScanMode,
}

#[derive(Clone, Copy)]
enum Procedure {
    Advertise { interval: u32 },
    Scan(ScanParams),
    Connect { address: BdAddr, address_type: AddressType },
}

/// [`BleStack`] backed by the radio task.
pub struct SoftdeviceStack {
    adv_interval: u32,
    scan: ScanParams,
}

impl SoftdeviceStack {
    pub const fn new() -> Self {
        Self {
            adv_interval: config::ADV_INTERVAL_MIN,
            scan: ScanParams {
                window: config::SCAN_WINDOW,
                interval: config::SCAN_INTERVAL,
                mode: config::SCAN_MODE,
            },
        }
    }
}

impl Default for SoftdeviceStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BleStack for SoftdeviceStack {
    fn issue(&mut self, command: Command) -> Result<(), StackError> {
        trace!("issue {}", command);
        match command {
            // The SoftDevice takes a single interval; use the fast end.
            Command::SetAdvertiseTiming { interval_min, .. } => {
                self.adv_interval = interval_min;
                Ok(())
            }
            Command::StartAdvertising { .. } => request(Procedure::Advertise {
                interval: self.adv_interval,
            }),
            Command::SetScanParameters {
                window,
                interval,
                mode,
            } => {
                self.scan = ScanParams {
                    window,
                    interval,
                    mode,
                };
                Ok(())
            }
            Command::StartDiscovery(_) => request(Procedure::Scan(self.scan)),
            Command::EndProcedure => {
                STOP.signal(());
                Ok(())
            }
            Command::OpenConnection {
                address,
                address_type,
            } => request(Procedure::Connect {
                address,
                address_type,
            }),
            // Characteristics are registered without write authorization, so
            // the SoftDevice has already answered the ATT write request.
            Command::SendWriteResponse { .. } => Ok(()),
            Command::CloseConnection(connection) => {
                CLOSE.signal(connection);
                Ok(())
            }
            Command::ResetIntoUpdateMode => reset_into_dfu(),
        }
    }
}

fn request(procedure: Procedure) -> Result<(), StackError> {
    REQUESTS.try_send(procedure).map_err(|_| StackError::Busy)
}

/// Reboot into the DFU bootloader.
fn reset_into_dfu() -> ! {
    // SAFETY: plain register write through the SoftDevice API.
    unsafe {
        raw::sd_power_gpregret_set(0, config::DFU_GPREGRET_MAGIC as u32);
    }
    cortex_m::peripheral::SCB::sys_reset()
}

/// Publish the boot event. Call once, after the SoftDevice is enabled.
pub async fn boot(sd: &Softdevice) {
    let address = nrf_softdevice::ble::get_address(sd);
    EVENTS
        .send(StackEvent::Boot {
            version: StackVersion {
                major: raw::SD_MAJOR_VERSION as u8,
                minor: raw::SD_MINOR_VERSION as u8,
                patch: raw::SD_BUGFIX_VERSION as u8,
            },
            address: BdAddr(address.bytes()),
        })
        .await;
}

/// Radio task body.
pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    loop {
        let procedure = REQUESTS.receive().await;
        STOP.reset();
        match procedure {
            Procedure::Advertise { interval } => advertise(sd, server, interval).await,
            Procedure::Scan(params) => scan(sd, params).await,
            Procedure::Connect {
                address,
                address_type,
            } => connect(sd, server, address, address_type).await,
        }
    }
}

async fn advertise(sd: &Softdevice, server: &Server, interval: u32) {
    let adv_data = encode_advertisement(&config::TUNNEL_SERVICE_UUID, config::DEVICE_NAME);
    let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
        adv_data: &adv_data,
        scan_data: &[],
    };
    let adv_config = peripheral::Config {
        interval,
        ..Default::default()
    };

    info!("advertising every {} x 0.625 ms", interval);
    match select(peripheral::advertise_connectable(sd, adv, &adv_config), STOP.wait()).await {
        Either::First(Ok(conn)) => serve(conn, server).await,
        Either::First(Err(e)) => {
            warn!("advertising failed: {}", e);
            report_failure(StackError::AdvertiseFailed).await;
        }
        Either::Second(()) => info!("advertising stopped"),
    }
}

async fn scan(sd: &Softdevice, params: ScanParams) {
    let scan_config = central::ScanConfig {
        active: params.mode == ScanMode::Active,
        interval: params.interval as u32,
        window: params.window as u32,
        ..Default::default()
    };

    let scanning = central::scan(sd, &scan_config, |report| {
        // SAFETY: the SoftDevice keeps the report buffer alive for the callback.
        let data = unsafe { slice::from_raw_parts(report.data.p_data, report.data.len as usize) };
        let Ok(data) = Vec::from_slice(data) else {
            return None;
        };

        let event = StackEvent::ScanResponse {
            address: BdAddr(report.peer_addr.addr),
            address_type: address_type(report.peer_addr.addr_type()),
            packet_type: packet_type(&report.type_),
            data,
        };
        // Reports repeat every advertising interval; dropping one is harmless.
        if EVENTS.try_send(event).is_err() {
            trace!("event queue full - dropping scan report");
        }
        None::<()>
    });

    match select(scanning, STOP.wait()).await {
        Either::First(Ok(())) => {}
        Either::First(Err(e)) => {
            warn!("scan failed: {}", e);
            report_failure(StackError::ScanFailed).await;
        }
        Either::Second(()) => info!("scan stopped"),
    }
}

async fn connect(sd: &Softdevice, server: &Server, address: BdAddr, address_type: AddressType) {
    let peer = Address::new(sd_address_type(address_type), address.0);
    let whitelist = [&peer];
    let conn_config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    match select(central::connect(sd, &conn_config), STOP.wait()).await {
        Either::First(Ok(conn)) => serve(conn, server).await,
        Either::First(Err(e)) => {
            warn!("connect to {} failed: {}", address, e);
            report_failure(StackError::ConnectFailed).await;
        }
        Either::Second(()) => info!("connect cancelled"),
    }
}

/// Publish the connection's lifetime as opened / writes / closed events.
async fn serve(conn: Connection, server: &Server) {
    let id = conn
        .handle()
        .unwrap_or(raw::BLE_CONN_HANDLE_INVALID as ConnectionId);
    EVENTS
        .send(StackEvent::ConnectionOpened { connection: id })
        .await;
    CLOSE.reset();

    let gatt = gatt_server::run(&conn, server, |e| match e {
        ServerEvent::Tunnel(TunnelServiceEvent::InOutWrite(value)) => {
            forward_write(id, config::GATT_TUNNEL_IN_OUT_HANDLE, &value)
        }
        ServerEvent::Tunnel(TunnelServiceEvent::InOutCccdWrite { notifications }) => {
            debug!("tunnel notifications: {}", notifications)
        }
        ServerEvent::Ota(OtaServiceEvent::ControlWrite(value)) => {
            forward_write(id, config::GATT_OTA_CONTROL_HANDLE, &[value])
        }
    });

    let reason = match select(gatt, close_requested(id)).await {
        Either::First(_) => REASON_REMOTE_USER_TERMINATED,
        Either::Second(()) => {
            if conn.disconnect().is_err() {
                debug!("connection {} already gone", id);
            }
            REASON_LOCAL_HOST_TERMINATED
        }
    };

    EVENTS
        .send(StackEvent::ConnectionClosed {
            connection: id,
            reason,
        })
        .await;
}

/// Tell the controller a procedure it started is no longer running.
async fn report_failure(cause: StackError) {
    EVENTS.send(StackEvent::ProcedureFailed(cause)).await;
}

async fn close_requested(id: ConnectionId) {
    while CLOSE.wait().await != id {}
}

fn forward_write(connection: ConnectionId, handle: CharacteristicHandle, value: &[u8]) {
    let Ok(value) = Vec::from_slice(value) else {
        warn!("write of {} bytes too long - dropped", value.len());
        return;
    };
    // Can't await inside the GATT callback.
    if EVENTS
        .try_send(StackEvent::CharacteristicWrite {
            connection,
            handle,
            value,
        })
        .is_err()
    {
        warn!("event queue full - dropping write to 0x{:04x}", handle);
    }
}

fn address_type(raw_type: u8) -> AddressType {
    match u32::from(raw_type) {
        raw::BLE_GAP_ADDR_TYPE_PUBLIC => AddressType::Public,
        raw::BLE_GAP_ADDR_TYPE_RANDOM_PRIVATE_RESOLVABLE => AddressType::RandomPrivateResolvable,
        raw::BLE_GAP_ADDR_TYPE_RANDOM_PRIVATE_NON_RESOLVABLE => {
            AddressType::RandomPrivateNonResolvable
        }
        _ => AddressType::RandomStatic,
    }
}

fn sd_address_type(address_type: AddressType) -> SdAddressType {
    match address_type {
        AddressType::Public => SdAddressType::Public,
        AddressType::RandomStatic => SdAddressType::RandomStatic,
        AddressType::RandomPrivateResolvable => SdAddressType::RandomPrivateResolvable,
        AddressType::RandomPrivateNonResolvable => SdAddressType::RandomPrivateNonResolvable,
    }
}

fn packet_type(report_type: &raw::ble_gap_adv_report_type_t) -> PacketType {
    if report_type.scan_response() != 0 {
        PacketType::ScanResponse
    } else if report_type.connectable() != 0 && report_type.directed() != 0 {
        PacketType::ConnectableDirected
    } else if report_type.connectable() != 0 {
        PacketType::ConnectableUndirected
    } else if report_type.scannable() != 0 {
        PacketType::ScannableUndirected
    } else {
        PacketType::NonConnectable
    }
}
