//! Library interface for ble-tunnel.
//!
//! Everything that does not touch the radio lives here so it can be
//! tested on the host (no embedded hardware required):
//!
//! - `ble::adv_parser` - AD record walker and tunnel-service matcher
//! - `ble::controller` - connection lifecycle state machine
//! - `config` - compile-time role, UUIDs and timings
//!
//! Usage: `cargo test --lib`
//!
//! The SoftDevice adapter (`ble::radio`, `ble::gatt`) and the firmware
//! entry point in main.rs are only built with the `embedded` feature.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ble;
pub mod config;
pub mod error;

pub use ble::controller::{BleStack, Controller, ControllerConfig, Outcome, TunnelSink};
pub use error::{Error, StackError};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
