//! # Wire Format
//!
//! The packet header is a fixed 11 bytes, all integers big-endian:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number (32)                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Acknowledgment Number (32)                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Flags     |          Checksum (16)        |   Data...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! `decode` never verifies the checksum — it only parses the structure.
//! Checksum verification is the connection state machine's job, so that a
//! structurally invalid datagram and a corrupted-but-well-formed one are
//! distinguishable to the caller.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::TransportError;

/// Header size in bytes: 4 (seq) + 4 (ack) + 1 (flags) + 2 (checksum).
pub const HEADER_LEN: usize = 11;

/// Maximum payload size in a single packet.
pub const MAX_DATA_SIZE: usize = 1000;

// ─── Flags ──────────────────────────────────────────────────────────────────

/// Protocol control flags. `Synack` is a distinct wire value (`0x03`), not a
/// bitwise OR of `Syn` and `Ack` decoded back to the same bits — the
/// handshake relies on exact equality against this byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flags {
    Data = 0x00,
    Ack = 0x01,
    Syn = 0x02,
    Synack = 0x03,
    Fin = 0x04,
}

impl Flags {
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Whether the FIN bit is set on a raw flags byte.
    pub fn is_fin(byte: u8) -> bool {
        byte & Flags::Fin.bits() != 0
    }
}

// ─── Checksum ───────────────────────────────────────────────────────────────

/// Unsigned sum of all payload bytes, reduced modulo `0xFFFF`. Zero for an
/// empty payload. Weak by design — it only needs to catch the single-byte
/// XOR corruption this protocol injects for testing.
pub fn checksum(data: &[u8]) -> u16 {
    let sum: u32 = data.iter().map(|&b| b as u32).sum();
    (sum % 0xFFFF) as u16
}

// ─── Decoded Packet ─────────────────────────────────────────────────────────

/// A parsed packet. Checksum is carried but not verified here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq: u32,
    pub ack: u32,
    pub flags: u8,
    pub checksum: u16,
    pub data: Bytes,
}

impl Packet {
    /// Recompute the checksum over `data` and compare against the carried
    /// value transmitted in the header.
    pub fn checksum_valid(&self) -> bool {
        checksum(&self.data) == self.checksum
    }
}

/// Encode a packet into wire bytes. Fails if `data` exceeds [`MAX_DATA_SIZE`].
pub fn encode(seq: u32, ack: u32, flags: u8, data: &[u8]) -> Result<Bytes, TransportError> {
    if data.len() > MAX_DATA_SIZE {
        return Err(TransportError::OversizedPayload {
            len: data.len(),
            max: MAX_DATA_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + data.len());
    buf.put_u32(seq);
    buf.put_u32(ack);
    buf.put_u8(flags);
    buf.put_u16(checksum(data));
    buf.extend_from_slice(data);
    Ok(buf.freeze())
}

/// Decode a packet from raw datagram bytes. Returns `None` for anything
/// shorter than [`HEADER_LEN`] — the caller drops such datagrams silently.
/// The trailing bytes, whatever their length, are the payload; the receiver
/// does not carry a length field and instead trusts the datagram boundary.
pub fn decode(mut raw: &[u8]) -> Option<Packet> {
    if raw.len() < HEADER_LEN {
        return None;
    }

    let seq = raw.get_u32();
    let ack = raw.get_u32();
    let flags = raw.get_u8();
    let checksum = raw.get_u16();
    let data = Bytes::copy_from_slice(raw);

    Some(Packet {
        seq,
        ack,
        flags,
        checksum,
        data,
    })
}
