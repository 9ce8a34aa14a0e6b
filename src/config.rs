//! Application-wide constants and compile-time configuration.
//!
//! Role, UUIDs, timing parameters and GATT handles live here so they can
//! be tuned in one place. Nothing is configurable at runtime.

use crate::ble::controller::{
    AdvertisingTiming, CharacteristicHandles, ControllerConfig, ResumePolicy, ScanTiming,
};
use crate::ble::{CharacteristicHandle, DeviceRole, ScanMode, ServiceUuid128};

// Role

/// Which side of the tunnel this build plays. Select the scanner with
/// `--features central`.
pub const DEVICE_ROLE: DeviceRole = if cfg!(feature = "central") {
    DeviceRole::Scanner
} else {
    DeviceRole::Advertiser
};

/// What to do after a connection closes without a pending firmware update.
pub const RESUME_POLICY: ResumePolicy = ResumePolicy::Resume;

// GATT database

/// Tunnel service. The scanner connects to whoever advertises it.
pub const TUNNEL_SERVICE_UUID: ServiceUuid128 =
    ServiceUuid128::from_u128(0x86934d83_630e_4f8c_a9a2_82ede9f87aa9);

/// Value handles in registration order: GAP and GATT services take
/// 0x0001..=0x000B, the tunnel service starts at 0x000C (declaration,
/// characteristic, value, CCCD) and the OTA service follows.
pub const GATT_TUNNEL_IN_OUT_HANDLE: CharacteristicHandle = 0x000E;
pub const GATT_OTA_CONTROL_HANDLE: CharacteristicHandle = 0x0012;

/// GAP device name.
pub const DEVICE_NAME: &str = "BLE Tunnel";

// Advertising

/// Advertising interval range (in 0.625 ms units). 160 = 100 ms.
pub const ADV_INTERVAL_MIN: u32 = 160;
pub const ADV_INTERVAL_MAX: u32 = 160;

// Scanning

/// Scan window and interval (in 0.625 ms units). 320 = 200 ms, i.e.
/// the radio listens continuously.
pub const SCAN_WINDOW: u16 = 320;
pub const SCAN_INTERVAL: u16 = 320;

/// Passive scan: advertisers carry the service UUID in the primary PDU.
pub const SCAN_MODE: ScanMode = ScanMode::Passive;

// Connection

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// OTA DFU

/// GPREGRET value the Nordic secure bootloader treats as "stay in DFU"
/// (`BOOTLOADER_DFU_START`).
pub const DFU_GPREGRET_MAGIC: u8 = 0xB1;

/// Controller settings for this build.
pub const CONTROLLER: ControllerConfig = ControllerConfig {
    role: DEVICE_ROLE,
    target: TUNNEL_SERVICE_UUID,
    advertising: AdvertisingTiming {
        interval_min: ADV_INTERVAL_MIN,
        interval_max: ADV_INTERVAL_MAX,
    },
    scan: ScanTiming {
        window: SCAN_WINDOW,
        interval: SCAN_INTERVAL,
        mode: SCAN_MODE,
    },
    handles: CharacteristicHandles {
        ota_control: GATT_OTA_CONTROL_HANDLE,
        tunnel_data: GATT_TUNNEL_IN_OUT_HANDLE,
    },
    resume: RESUME_POLICY,
};
