//! X.25 CRC-16 (CRC-16/MCRF4XX) used both for the per-message extra-CRC and for packet checksums.
//!
//! The generator and the runtime must agree bit for bit: the generator folds the CRC of a
//! message's layout into one byte ([`fold`]), and the runtime appends that byte to every
//! packet checksum ([`X25::finish`]). A receiver built from a different layout computes a
//! different checksum and drops the packet.

use crate::table::CompatibilityTable;

/// Initial accumulator value.
pub const X25_INIT: u16 = 0xFFFF;

/// Accumulate `bytes` into `crc`.
pub fn accumulate(mut crc: u16, bytes: &[u8]) -> u16 {
    for &b in bytes {
        let mut tmp = b ^ (crc & 0xFF) as u8;
        tmp ^= tmp << 4;
        let tmp = tmp as u16;
        crc = (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4);
    }
    crc
}

/// Fold a 16-bit CRC to the one-byte extra-CRC.
pub fn fold(crc: u16) -> u8 {
    (crc & 0xFF) as u8 ^ (crc >> 8) as u8
}

/// Incremental packet checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X25 {
    value: u16,
}

impl Default for X25 {
    fn default() -> Self {
        X25 { value: X25_INIT }
    }
}

impl X25 {
    pub fn new() -> Self {
        X25::default()
    }

    /// Reset to the initial value.
    pub fn start(&mut self) {
        self.value = X25_INIT;
    }

    pub fn update(&mut self, byte: u8) {
        self.value = accumulate(self.value, &[byte]);
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        self.value = accumulate(self.value, bytes);
    }

    /// Mix in the extra-CRC registered for `msgid` (0 when the id is unknown).
    pub fn finish(&mut self, msgid: u8, table: &CompatibilityTable) {
        self.update(table.crc_extra(msgid));
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn lsb(&self) -> u8 {
        (self.value & 0xFF) as u8
    }

    pub fn msb(&self) -> u8 {
        (self.value >> 8) as u8
    }
}
