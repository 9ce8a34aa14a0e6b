//! Advertising-data (AD) record parsing.
//!
//! A payload is a run of `[len][type][data; len - 1]` structures. `len`
//! counts the type byte plus the data, so each record spans `len + 1`
//! bytes. Nothing here copies the payload; records borrow from it.

use heapless::String;

use crate::ble::ServiceUuid128;
use crate::ble::uuid::UUID128_LEN;
use crate::error::Error;

/// AD type codes from the Bluetooth Assigned Numbers (GAP section).
pub struct AdType;

impl AdType {
    pub const FLAGS: u8 = 0x01;
    pub const INCOMPLETE_16_SERVICE_LIST: u8 = 0x02;
    pub const COMPLETE_16_SERVICE_LIST: u8 = 0x03;
    pub const INCOMPLETE_128_SERVICE_LIST: u8 = 0x06;
    pub const COMPLETE_128_SERVICE_LIST: u8 = 0x07;
    pub const SHORT_NAME: u8 = 0x08;
    pub const COMPLETE_NAME: u8 = 0x09;
    pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xff;
}

/// One AD structure, borrowed from the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdRecord<'a> {
    /// Length byte as received (type + data).
    pub length: u8,
    pub ad_type: u8,
    pub data: &'a [u8],
}

impl AdRecord<'_> {
    /// True for 0x06 / 0x07 records.
    pub fn is_128_service_list(&self) -> bool {
        matches!(
            self.ad_type,
            AdType::INCOMPLETE_128_SERVICE_LIST | AdType::COMPLETE_128_SERVICE_LIST
        )
    }

    /// 16-byte UUID candidates in wire order. A trailing partial group is skipped.
    pub fn uuids_128(&self) -> core::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(UUID128_LEN)
    }
}

/// Iterator over the AD records of a payload.
///
/// Zero-length structures are skipped. A record whose declared length
/// runs past the payload end is reported once as
/// [`Error::MalformedAdvertisingData`] and ends the walk; its bytes are
/// never read.
pub struct AdRecords<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> AdRecords<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, offset: 0 }
    }
}

impl<'a> Iterator for AdRecords<'a> {
    type Item = Result<AdRecord<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let i = self.offset;
            let len = *self.payload.get(i)? as usize;
            if len == 0 {
                self.offset += 1;
                continue;
            }

            let end = i + 1 + len;
            if end > self.payload.len() {
                self.offset = self.payload.len();
                return Some(Err(Error::MalformedAdvertisingData { offset: i }));
            }

            self.offset = end;
            return Some(Ok(AdRecord {
                length: len as u8,
                ad_type: self.payload[i + 1],
                data: &self.payload[i + 2..end],
            }));
        }
    }
}

/// Check whether `payload` lists `target` in a 128-bit service UUID record.
pub fn find_service(payload: &[u8], target: &ServiceUuid128) -> bool {
    for record in AdRecords::new(payload) {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!("AD scan stopped: {}", e);
                return false;
            }
        };

        if record.is_128_service_list() && record.uuids_128().any(|c| target.matches_wire(c)) {
            return true;
        }
    }
    false
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let name_record = AdRecords::new(data)
        .map_while(Result::ok)
        .find(|r| matches!(r.ad_type, AdType::SHORT_NAME | AdType::COMPLETE_NAME));

    let mut name = String::new();
    match name_record {
        Some(record) => {
            for &b in record.data {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════
