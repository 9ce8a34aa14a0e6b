//! ble-tunnel firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Task layout:
//!
//! - `softdevice_task` - runs the SoftDevice event pump.
//! - `radio_task` - runs GAP procedures and publishes stack events.
//! - main - the controller loop: wait for the next stack event, handle
//!   it to completion, repeat.

#![no_std]
#![no_main]

use core::mem;

use ble_tunnel::ble::gatt::Server;
use ble_tunnel::ble::radio::{self, SoftdeviceStack};
use ble_tunnel::ble::ConnectionId;
use ble_tunnel::{config, Controller, TunnelSink};
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, embassy_time as _, panic_probe as _};

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn radio_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    radio::run(sd, server).await
}

/// Tunnel payload ends here until a transport is attached.
struct TunnelLog;

impl TunnelSink for TunnelLog {
    fn deliver(&mut self, connection: ConnectionId, data: &[u8]) {
        info!("tunnel rx on {}: {=[u8]:02x}", connection, data);
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as _,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ble-tunnel starting as {}", config::DEVICE_ROLE);

    // The SoftDevice reserves interrupt priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(radio_task(sd, server)));

    radio::boot(sd).await;

    let mut controller = Controller::new(config::CONTROLLER);
    let mut stack = SoftdeviceStack::new();
    let mut tunnel = TunnelLog;
    loop {
        let event = radio::EVENTS.receive().await;
        // An update reset never returns here; the device reboots inside `issue`.
        controller.handle(&event, &mut stack, &mut tunnel);
    }
}
