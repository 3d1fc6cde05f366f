//! Packet framing: header, payload and the X.25 checksum finished with the message's
//! extra-CRC.
//!
//! Layout: `STX len seq sysid compid msgid payload[len] crc_lo crc_hi`. The checksum covers
//! everything after STX, then the extra-CRC for `msgid`. A stream decoder skips packets that
//! fail the checksum or do not decode, and reports them as removed.

use crate::checksum::X25;
use crate::codec::{Codec, CodecError};
use crate::table::CompatibilityTable;
use crate::value::Value;
use std::collections::HashMap;

/// Start-of-packet marker.
pub const STX: u8 = 0xFE;
/// STX, len, seq, sysid, compid, msgid.
pub const HEADER_LEN: usize = 6;
pub const CHECKSUM_LEN: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("expected start byte 0xfe, found 0x{0:02x}")]
    BadStart(u8),
    #[error("truncated packet: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("checksum mismatch: packet carries 0x{received:04x}, computed 0x{computed:04x}")]
    ChecksumMismatch { received: u16, computed: u16 },
    #[error("unsupported message id {0}")]
    UnknownMessage(u8),
    #[error("payload of {0} bytes does not fit a one-byte length")]
    PayloadTooLong(usize),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Sender identity and sequence number carried in every header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    pub seq: u8,
    pub sysid: u8,
    pub compid: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub msgid: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Checksum over len, header fields and payload, finished with the extra-CRC for `msgid`.
    pub fn checksum(&self, table: &CompatibilityTable) -> Result<X25, FrameError> {
        let len = self.payload_len()?;
        let mut crc = X25::new();
        crc.update(len);
        crc.update(self.header.seq);
        crc.update(self.header.sysid);
        crc.update(self.header.compid);
        crc.update(self.msgid);
        crc.update_slice(&self.payload);
        crc.finish(self.msgid, table);
        Ok(crc)
    }

    fn payload_len(&self) -> Result<u8, FrameError> {
        u8::try_from(self.payload.len()).map_err(|_| FrameError::PayloadTooLong(self.payload.len()))
    }

    pub fn encode(&self, table: &CompatibilityTable) -> Result<Vec<u8>, FrameError> {
        let len = self.payload_len()?;
        let crc = self.checksum(table)?;
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        out.extend_from_slice(&[STX, len, self.header.seq, self.header.sysid, self.header.compid, self.msgid]);
        out.extend_from_slice(&self.payload);
        out.push(crc.lsb());
        out.push(crc.msb());
        Ok(out)
    }

    /// Decode one packet at the start of `bytes`; returns it with the number of bytes used.
    pub fn decode(bytes: &[u8], table: &CompatibilityTable) -> Result<(Packet, usize), FrameError> {
        let (packet, total, received) = split_packet(bytes)?;
        let computed = packet.checksum(table)?.value();
        if received != computed {
            return Err(FrameError::ChecksumMismatch { received, computed });
        }
        Ok((packet, total))
    }
}

/// Cut one packet off the front of `bytes` without checking its checksum.
fn split_packet(bytes: &[u8]) -> Result<(Packet, usize, u16), FrameError> {
    match bytes.first() {
        None => {
            return Err(FrameError::Truncated {
                needed: HEADER_LEN + CHECKSUM_LEN,
                available: 0,
            })
        }
        Some(&b) if b != STX => return Err(FrameError::BadStart(b)),
        Some(_) => {}
    }
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::Truncated {
            needed: HEADER_LEN + CHECKSUM_LEN,
            available: bytes.len(),
        });
    }
    let len = bytes[1] as usize;
    let total = HEADER_LEN + len + CHECKSUM_LEN;
    if bytes.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }
    let packet = Packet {
        header: PacketHeader {
            seq: bytes[2],
            sysid: bytes[3],
            compid: bytes[4],
        },
        msgid: bytes[5],
        payload: bytes[HEADER_LEN..HEADER_LEN + len].to_vec(),
    };
    let received = u16::from_le_bytes([bytes[total - 2], bytes[total - 1]]);
    Ok((packet, total, received))
}

/// Pack `values` for the named message and frame them.
pub fn encode_message(
    codec: &Codec,
    table: &CompatibilityTable,
    header: PacketHeader,
    message_name: &str,
    values: &HashMap<String, Value>,
) -> Result<Vec<u8>, FrameError> {
    let spec = codec
        .message(message_name)
        .ok_or_else(|| CodecError::UnknownMessage(message_name.to_string()))?;
    let payload = codec.pack(spec, values)?;
    Packet {
        header,
        msgid: spec.id(),
        payload,
    }
    .encode(table)
}

#[derive(Debug)]
pub struct DecodedMessage {
    pub name: String,
    pub header: PacketHeader,
    pub values: HashMap<String, Value>,
    pub byte_range: (usize, usize),
}

#[derive(Debug)]
pub struct RemovedMessage {
    pub msgid: u8,
    pub byte_range: (usize, usize),
    pub reason: String,
}

/// Result of decoding a byte stream: packets that decoded, and the ones dropped.
#[derive(Debug, Default)]
pub struct FrameDecodeResult {
    pub messages: Vec<DecodedMessage>,
    pub removed: Vec<RemovedMessage>,
    /// Bytes skipped while searching for a start byte.
    pub skipped: usize,
    /// Trailing bytes of an incomplete packet.
    pub remainder: usize,
}

/// Decode every packet in `bytes`.
///
/// Unknown ids and payloads that fail to unpack consume the whole packet. A checksum
/// mismatch consumes only the start byte, since the length byte may itself be corrupt.
pub fn decode_stream(codec: &Codec, table: &CompatibilityTable, bytes: &[u8]) -> FrameDecodeResult {
    let mut result = FrameDecodeResult::default();
    let mut offset = 0;
    while offset < bytes.len() {
        if bytes[offset] != STX {
            result.skipped += 1;
            offset += 1;
            continue;
        }
        let (packet, total, received) = match split_packet(&bytes[offset..]) {
            Ok(parts) => parts,
            Err(_) => {
                result.remainder = bytes.len() - offset;
                break;
            }
        };
        let range = (offset, offset + total);
        let spec = match codec.message_by_id(packet.msgid) {
            Some(s) => s,
            None => {
                result.removed.push(RemovedMessage {
                    msgid: packet.msgid,
                    byte_range: range,
                    reason: FrameError::UnknownMessage(packet.msgid).to_string(),
                });
                offset += total;
                continue;
            }
        };
        // split_packet reads the length from one byte, so the payload always fits.
        let computed = match packet.checksum(table) {
            Ok(crc) => crc.value(),
            Err(_) => {
                offset += 1;
                continue;
            }
        };
        if computed != received {
            result.removed.push(RemovedMessage {
                msgid: packet.msgid,
                byte_range: range,
                reason: FrameError::ChecksumMismatch { received, computed }.to_string(),
            });
            offset += 1;
            continue;
        }
        match codec.unpack(spec, &packet.payload) {
            Ok(values) => result.messages.push(DecodedMessage {
                name: spec.name().to_string(),
                header: packet.header,
                values,
                byte_range: range,
            }),
            Err(e) => result.removed.push(RemovedMessage {
                msgid: packet.msgid,
                byte_range: range,
                reason: e.to_string(),
            }),
        }
        offset += total;
    }
    result
}
