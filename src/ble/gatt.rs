//! GATT database served by both roles.
//!
//! The `#[nrf_softdevice::gatt_service]` / `gatt_server` macros register
//! the attribute table with the SoftDevice and generate the event enums
//! matched in [`crate::ble::radio`]. Registration order fixes the value
//! handles listed in `config`.

use heapless::Vec;

use crate::ble::MAX_WRITE_LEN;

/// Tunnel service. The UUID must match `config::TUNNEL_SERVICE_UUID`,
/// which is what the scanner looks for.
#[nrf_softdevice::gatt_service(uuid = "86934d83-630e-4f8c-a9a2-82ede9f87aa9")]
pub struct TunnelService {
    /// Tunnel in/out.
    #[characteristic(uuid = "ddf53708-588f-441a-9dc0-0a6cdefac8e9", write, notify)]
    pub in_out: Vec<u8, MAX_WRITE_LEN>,
}

/// OTA service.
#[nrf_softdevice::gatt_service(uuid = "1d14d6ee-fd63-4fa1-bfa4-8f47b42119f0")]
pub struct OtaService {
    /// OTA control point. Any write schedules a reboot into the DFU
    /// bootloader once the connection closes.
    #[characteristic(uuid = "f7bf3564-fb6d-4e53-88a4-5e37e0326063", write)]
    pub control: u8,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub tunnel: TunnelService,
    pub ota: OtaService,
}
