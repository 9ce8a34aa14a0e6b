//! 128-bit service / characteristic UUIDs.
//!
//! Stored in canonical order (big-endian, the way a UUID is printed).
//! Inside advertising data and on the ATT wire the same UUID travels
//! byte-reversed, so every comparison against received bytes goes
//! through [`ServiceUuid128::matches_wire`].

use core::fmt;

/// Length of a 128-bit UUID in bytes.
pub const UUID128_LEN: usize = 16;

/// A 128-bit UUID in canonical byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceUuid128([u8; UUID128_LEN]);

impl ServiceUuid128 {
    /// Build from canonical bytes (`86934d83-...` → `[0x86, 0x93, ...]`).
    pub const fn from_bytes(bytes: [u8; UUID128_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a `u128` literal, e.g. `0x86934d83_630e_4f8c_a9a2_82ede9f87aa9`.
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Canonical bytes.
    pub const fn as_bytes(&self) -> &[u8; UUID128_LEN] {
        &self.0
    }

    /// Bytes in advertising-data order.
    pub fn to_wire(&self) -> [u8; UUID128_LEN] {
        let mut wire = self.0;
        wire.reverse();
        wire
    }

    /// Does `candidate` (wire order) name this UUID?
    ///
    /// Candidate byte `15 - k` must equal canonical byte `k` for every `k`.
    /// Anything other than exactly 16 bytes never matches.
    pub fn matches_wire(&self, candidate: &[u8]) -> bool {
        candidate.len() == UUID128_LEN && candidate.iter().rev().eq(self.0.iter())
    }
}

impl fmt::Display for ServiceUuid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ServiceUuid128 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u128:032x}", u128::from_be_bytes(self.0))
    }
}
