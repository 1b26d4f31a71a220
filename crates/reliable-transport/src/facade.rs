//! # Application Facade
//!
//! The four operations an application built on top of the transport
//! actually needs: `open`, `send_message`, `receive_message`, `close`. This
//! is the client-side surface — a listener typically drives
//! [`crate::connection::Connection`] directly, since it needs
//! `handshake_server` rather than a single `open()` call.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::config::TransportConfig;
use crate::connection::Connection;
use crate::error::TransportError;
use crate::simulator::ChannelSimulator;
use crate::wire::Flags;

/// A client-side reliable connection, bound and pointed at a remote address
/// at construction time but not yet handshaken.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Bind a local socket and record the remote address to dial. No
    /// network I/O happens until [`Client::open`] is called.
    pub fn new(
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        Ok(Client {
            conn: Connection::client(local_addr, remote_addr, config)?,
        })
    }

    /// Perform the three-way handshake.
    pub fn open(&mut self) -> Result<(), TransportError> {
        self.conn.handshake_client()
    }

    /// Reliably send one message, blocking until it is acknowledged or
    /// retries are exhausted.
    pub fn send_message(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.conn.send_packet(data, Flags::Data.bits())
    }

    /// Block for the next inbound message, deduplicating and re-acking as
    /// needed. Returns the payload and the flags byte it arrived with, so a
    /// caller can notice a FIN (empty payload, FIN bit set).
    pub fn receive_message(&mut self) -> Result<(Bytes, u8), TransportError> {
        self.conn.receive_packet()
    }

    /// Best-effort teardown: send one FIN, wait briefly, mark closed.
    pub fn close(&mut self) {
        self.conn.close();
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.conn.local_addr()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.conn.remote_addr()
    }

    /// Tune loss/corruption injection for this connection's outbound path.
    pub fn simulator_mut(&mut self) -> &mut ChannelSimulator {
        self.conn.simulator_mut()
    }
}
