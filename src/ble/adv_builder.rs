//! Advertising payload for the advertiser role.
//!
//! Flags, the tunnel service in a complete 128-bit UUID list, then as
//! much of the device name as still fits in a legacy PDU.

use heapless::Vec;

use crate::ble::adv_parser::AdType;
use crate::ble::uuid::UUID128_LEN;
use crate::ble::{ServiceUuid128, LEGACY_ADV_PAYLOAD};

/// LE General Discoverable | BR/EDR Not Supported.
pub const FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

/// Encode the legacy advertising payload for `service` and `name`.
///
/// The name is shortened (type 0x08) when the complete name does not
/// fit, and omitted if not even one character fits.
pub fn encode_advertisement(service: &ServiceUuid128, name: &str) -> Vec<u8, LEGACY_ADV_PAYLOAD> {
    let mut ad = Vec::new();

    // 3 + 18 bytes always fit in 31.
    let _ = ad.extend_from_slice(&[0x02, AdType::FLAGS, FLAGS_GENERAL_DISCOVERABLE]);
    let _ = ad.extend_from_slice(&[(UUID128_LEN + 1) as u8, AdType::COMPLETE_128_SERVICE_LIST]);
    let _ = ad.extend_from_slice(&service.to_wire());

    let room = LEGACY_ADV_PAYLOAD - ad.len();
    if room <= 2 || name.is_empty() {
        return ad;
    }

    let name = name.as_bytes();
    let (ad_type, take) = if name.len() + 2 <= room {
        (AdType::COMPLETE_NAME, name.len())
    } else {
        (AdType::SHORT_NAME, room - 2)
    };
    let _ = ad.extend_from_slice(&[(take + 1) as u8, ad_type]);
    let _ = ad.extend_from_slice(&name[..take]);
    ad
}
