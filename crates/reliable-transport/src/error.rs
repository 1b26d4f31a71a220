//! Error taxonomy for the transport.
//!
//! Parse failures and checksum mismatches never reach this type — they are
//! recovered locally (silent drop, rely on the peer's retransmit or the
//! receiver's duplicate ACK). Only conditions the caller must react to are
//! represented here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    OversizedPayload { len: usize, max: usize },

    #[error("handshake failed after exhausting retries")]
    HandshakeFailed,

    #[error("no ack received after exhausting retries")]
    RetriesExhausted,

    #[error("operation attempted on a closed connection")]
    NotOpen,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
