//! # Connection State Machine
//!
//! Owns a single `std::net::UdpSocket` for its entire lifetime — handshake,
//! reliable send, reliable receive, and teardown all run against that one
//! socket, single-threaded and synchronous. No state is shared with the
//! peer except via the wire; no locking is needed within an endpoint.
//!
//! ```text
//! CLOSED → SYN_SENT → ESTABLISHED → CLOSED    (client)
//! CLOSED → LISTEN → SYN_RECEIVED → ESTABLISHED → CLOSED    (server)
//! ```

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::simulator::{ChannelSimulator, SimulatedSend};
use crate::wire::{self, Flags};

/// Which side of the handshake this connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Receive buffer size. Comfortably above `HEADER_LEN + MAX_DATA_SIZE`
/// (1011 bytes), matching the reference implementation's 1024-byte
/// `recvfrom` buffer.
const RECV_BUF_LEN: usize = 1024;

/// A reliable-datagram endpoint: handshake, stop-and-wait send/receive, and
/// FIN-based teardown over one owned UDP socket.
pub struct Connection {
    socket: UdpSocket,
    role: Role,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    seq: u32,
    ack: u32,
    is_open: bool,
    config: TransportConfig,
    simulator: ChannelSimulator,
}

/// Bind a UDP socket with `SO_REUSEADDR` set before the bind, matching the
/// reference implementation's `setsockopt(SO_REUSEADDR)` (so a test suite
/// can tear down and rebind the same port quickly).
fn bind_reuseaddr(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

impl Connection {
    /// Create a client endpoint bound to `local_addr`, pointed at a known
    /// `remote_addr`. The remote may be refined during the handshake — the
    /// server's actual reply source address becomes the address of record.
    pub fn client(
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let socket = bind_reuseaddr(local_addr)?;
        let local_addr = socket.local_addr()?;
        Ok(Connection {
            socket,
            role: Role::Client,
            local_addr,
            remote_addr: Some(remote_addr),
            seq: 0,
            ack: 0,
            is_open: true,
            config,
            simulator: ChannelSimulator::disabled(),
        })
    }

    /// Create a server (listener) endpoint bound to `local_addr`. The remote
    /// peer is unknown until the first valid SYN arrives.
    pub fn server(local_addr: SocketAddr, config: TransportConfig) -> Result<Self, TransportError> {
        let socket = bind_reuseaddr(local_addr)?;
        let local_addr = socket.local_addr()?;
        Ok(Connection {
            socket,
            role: Role::Server,
            local_addr,
            remote_addr: None,
            seq: 0,
            ack: 0,
            is_open: true,
            config,
            simulator: ChannelSimulator::disabled(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Mutable access to the channel simulator — the only piece of runtime
    /// state a caller may tune after construction.
    pub fn simulator_mut(&mut self) -> &mut ChannelSimulator {
        &mut self.simulator
    }

    // ─── Handshake ──────────────────────────────────────────────────────

    /// Client-side three-way handshake (§4.3.2). Retries up to
    /// `handshake_retries` times with `0.1 * attempt` second backoff between
    /// attempts; fails with [`TransportError::HandshakeFailed`] on
    /// exhaustion.
    pub fn handshake_client(&mut self) -> Result<(), TransportError> {
        let remote = self.remote_addr.ok_or(TransportError::NotOpen)?;
        self.socket.set_read_timeout(Some(self.config.timeout))?;
        let seq0 = self.seq;

        for attempt in 1..=self.config.handshake_retries {
            let syn = wire::encode(seq0, 0, Flags::Syn.bits(), &[])?;
            self.socket.send_to(&syn, remote)?;
            tracing::debug!(attempt, seq0, "sent SYN");

            match self.await_synack(seq0) {
                Some((peer_seq, from)) => {
                    self.remote_addr = Some(from);
                    self.ack = peer_seq.wrapping_add(1);
                    self.seq = seq0.wrapping_add(1);

                    let ack_pkt = wire::encode(self.seq, self.ack, Flags::Ack.bits(), &[])?;
                    self.socket.send_to(&ack_pkt, from)?;

                    tracing::info!(
                        local = %self.local_addr,
                        remote = %from,
                        "handshake established (client)"
                    );
                    return Ok(());
                }
                None => {
                    tracing::warn!(attempt, "handshake attempt failed, retrying");
                    std::thread::sleep(Duration::from_secs_f64(0.1 * attempt as f64));
                }
            }
        }

        Err(TransportError::HandshakeFailed)
    }

    fn await_synack(&self, seq0: u32) -> Option<(u32, SocketAddr)> {
        let mut buf = [0u8; RECV_BUF_LEN];
        let (n, from) = self.socket.recv_from(&mut buf).ok()?;
        let pkt = wire::decode(&buf[..n])?;
        if pkt.checksum_valid()
            && pkt.flags == Flags::Synack.bits()
            && pkt.ack == seq0.wrapping_add(1)
        {
            Some((pkt.seq, from))
        } else {
            None
        }
    }

    /// Server-side handshake loop (§4.3.2). Unbounded: a listener keeps
    /// accepting SYNs forever, since a mismatched or timed-out
    /// third-handshake ACK is not a fatal condition — it simply resumes
    /// listening.
    pub fn handshake_server(&mut self) -> Result<(), TransportError> {
        self.handshake_server_inner(None)
    }

    /// Like [`Connection::handshake_server`] but gives up with
    /// [`TransportError::HandshakeFailed`] after `max_attempts` SYNs have
    /// been considered. Useful for deterministic tests; the default
    /// unbounded behavior is what production listeners should use.
    pub fn handshake_server_bounded(&mut self, max_attempts: u32) -> Result<(), TransportError> {
        self.handshake_server_inner(Some(max_attempts))
    }

    fn handshake_server_inner(&mut self, max_attempts: Option<u32>) -> Result<(), TransportError> {
        self.socket.set_read_timeout(Some(self.config.timeout))?;
        let server_seq0 = self.seq;
        let mut attempts: u32 = 0;

        loop {
            if let Some(max) = max_attempts {
                if attempts >= max {
                    return Err(TransportError::HandshakeFailed);
                }
            }
            attempts += 1;

            let mut buf = [0u8; RECV_BUF_LEN];
            let (n, from) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(_) => continue,
            };

            let pkt = match wire::decode(&buf[..n]) {
                Some(p) => p,
                None => continue,
            };

            if !(pkt.checksum_valid() && pkt.flags == Flags::Syn.bits()) {
                continue;
            }

            self.remote_addr = Some(from);
            self.ack = pkt.seq.wrapping_add(1);
            tracing::debug!(peer = %from, seq = pkt.seq, "received SYN");

            let synack = wire::encode(server_seq0, self.ack, Flags::Synack.bits(), &[])?;
            self.socket.send_to(&synack, from)?;

            let (n2, _) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let resp = match wire::decode(&buf[..n2]) {
                Some(p) => p,
                None => continue,
            };

            if resp.checksum_valid()
                && resp.flags == Flags::Ack.bits()
                && resp.ack == server_seq0.wrapping_add(1)
            {
                self.seq = server_seq0.wrapping_add(1);
                tracing::info!(remote = %from, "handshake established (server)");
                return Ok(());
            }

            tracing::debug!(peer = %from, "third-handshake ack missing or invalid, resuming listen");
        }
    }

    // ─── Reliable send (§4.3.3) ─────────────────────────────────────────

    /// Stop-and-wait send with retransmission. Rebuilds the packet with the
    /// *same* `seq` on every attempt — duplicates on the wire are benign,
    /// since the receiver deduplicates by sequence.
    pub fn send_packet(&mut self, data: &[u8], flags: u8) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::NotOpen);
        }
        let remote = self.remote_addr.ok_or(TransportError::NotOpen)?;
        self.socket.set_read_timeout(Some(self.config.timeout))?;

        for attempt in 1..=self.config.max_retries {
            let wire_bytes = wire::encode(self.seq, self.ack, flags, data)?;

            match self.simulator.apply(&wire_bytes) {
                SimulatedSend::Dropped => {
                    tracing::debug!(attempt, seq = self.seq, "simulated loss, skipping send");
                }
                SimulatedSend::Clean(bytes) => {
                    self.socket.send_to(&bytes, remote)?;
                }
                SimulatedSend::Corrupted(bytes) => {
                    tracing::debug!(attempt, seq = self.seq, "simulated corruption on send");
                    self.socket.send_to(&bytes, remote)?;
                }
            }

            let mut buf = [0u8; RECV_BUF_LEN];
            match self.socket.recv_from(&mut buf) {
                Ok((n, _)) => {
                    let accepted = wire::decode(&buf[..n]).is_some_and(|resp| {
                        resp.checksum_valid()
                            && resp.flags == Flags::Ack.bits()
                            && resp.ack == self.seq.wrapping_add(1)
                    });
                    if accepted {
                        self.seq = self.seq.wrapping_add(1);
                        return Ok(());
                    }
                    tracing::warn!(attempt, "unexpected or invalid ack, retrying");
                }
                Err(_) => {
                    tracing::warn!(attempt, "send timed out, retrying");
                }
            }
        }

        Err(TransportError::RetriesExhausted)
    }

    // ─── Reliable receive (§4.3.4) ──────────────────────────────────────

    /// Loops while the connection is open, dropping malformed or corrupted
    /// datagrams silently, deduplicating by sequence, and re-ACKing
    /// duplicates/out-of-order arrivals to unblock a peer stuck retransmitting.
    pub fn receive_packet(&mut self) -> Result<(Bytes, u8), TransportError> {
        self.socket.set_read_timeout(Some(self.config.timeout))?;

        while self.is_open {
            let mut buf = [0u8; RECV_BUF_LEN];
            let (n, from) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(_) => continue,
            };

            let pkt = match wire::decode(&buf[..n]) {
                Some(p) => p,
                None => continue,
            };

            if !pkt.checksum_valid() {
                tracing::debug!(seq = pkt.seq, "checksum mismatch, dropping");
                continue;
            }

            if self.remote_addr.is_none() {
                self.remote_addr = Some(from);
            }
            let remote = match self.remote_addr {
                Some(r) => r,
                None => continue,
            };

            if Flags::is_fin(pkt.flags) {
                self.is_open = false;
                if let Ok(ack_pkt) = wire::encode(self.seq, self.ack, Flags::Ack.bits(), &[]) {
                    let _ = self.socket.send_to(&ack_pkt, remote);
                }
                tracing::info!(peer = %remote, "received FIN, connection closing");
                return Ok((Bytes::new(), pkt.flags));
            }

            if pkt.seq == self.ack {
                self.ack = self.ack.wrapping_add(1);
                let ack_pkt = wire::encode(self.seq, self.ack, Flags::Ack.bits(), &[])?;
                self.socket.send_to(&ack_pkt, remote)?;
                return Ok((pkt.data, pkt.flags));
            }

            // Duplicate or out-of-sequence: re-send the last ACK without
            // advancing state, so the peer's stuck retransmit is unblocked.
            tracing::debug!(
                seq = pkt.seq,
                expected = self.ack,
                "duplicate or out-of-order packet, re-acking"
            );
            if let Ok(ack_pkt) = wire::encode(self.seq, self.ack, Flags::Ack.bits(), &[]) {
                let _ = self.socket.send_to(&ack_pkt, remote);
            }
        }

        Err(TransportError::ConnectionClosed)
    }

    // ─── Teardown (§4.3.5) ───────────────────────────────────────────────

    /// Best-effort FIN: sent once, not retransmitted, not awaited. Errors
    /// during the final send are swallowed — close is always progress.
    pub fn close(&mut self) {
        if self.is_open {
            if let Some(remote) = self.remote_addr {
                match wire::encode(self.seq, self.ack, Flags::Fin.bits(), &[]) {
                    Ok(fin) => {
                        if let Err(e) = self.socket.send_to(&fin, remote) {
                            tracing::warn!(error = %e, "failed to send FIN during close");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to encode FIN during close"),
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        }
        self.is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::thread;

    fn loopback() -> SocketAddr {
        SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)
    }

    fn fast_config() -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_millis(200),
            max_retries: 5,
            handshake_retries: 5,
            max_data_size: wire::MAX_DATA_SIZE,
        }
    }

    /// Spawn a server thread that performs the handshake and returns the
    /// connected `Connection` to the caller via the returned `JoinHandle`.
    fn spawn_server(addr: SocketAddr, config: TransportConfig) -> (SocketAddr, thread::JoinHandle<Connection>) {
        let mut server = Connection::server(addr, config).unwrap();
        let bound = server.local_addr();
        let handle = thread::spawn(move || {
            server.handshake_server().unwrap();
            server
        });
        (bound, handle)
    }

    #[test]
    fn client_server_handshake_establishes_acks() {
        let (server_addr, handle) = spawn_server(loopback(), fast_config());
        let mut client = Connection::client(loopback(), server_addr, fast_config()).unwrap();
        client.handshake_client().unwrap();
        let server = handle.join().unwrap();

        // invariant 2: local.ack == remote.seq + 1 and vice versa
        assert_eq!(client.ack, server.seq);
        assert_eq!(server.ack, client.seq);
    }

    #[test]
    fn sequence_advances_by_one_per_successful_send() {
        let (server_addr, handle) = spawn_server(loopback(), fast_config());
        let mut client = Connection::client(loopback(), server_addr, fast_config()).unwrap();
        client.handshake_client().unwrap();
        let mut server = handle.join().unwrap();

        let reader = thread::spawn(move || {
            for _ in 0..3 {
                server.receive_packet().unwrap();
            }
        });

        let start_seq = client.seq;
        for i in 0..3u8 {
            client.send_packet(&[i], Flags::Data.bits()).unwrap();
        }
        reader.join().unwrap();

        assert_eq!(client.seq, start_seq + 3);
    }

    #[test]
    fn duplicate_delivery_is_deduplicated() {
        let (server_addr, handle) = spawn_server(loopback(), fast_config());
        let mut client = Connection::client(loopback(), server_addr, fast_config()).unwrap();
        client.handshake_client().unwrap();
        let mut server = handle.join().unwrap();

        // Manually craft and send the same data packet twice with no ACK
        // wait in between, simulating a retransmitted duplicate.
        let remote = client.remote_addr().unwrap();
        let pkt = wire::encode(client.seq, client.ack, Flags::Data.bits(), b"hi").unwrap();
        client.socket.send_to(&pkt, remote).unwrap();
        client.socket.send_to(&pkt, remote).unwrap();

        let (data1, _) = server.receive_packet().unwrap();
        assert_eq!(data1.as_ref(), b"hi");

        // The duplicate should be silently re-acked, not redelivered. We
        // can't directly observe "nothing delivered", so assert the
        // sequence/ack bookkeeping only advanced once.
        let ack_after_first = server.ack;
        // Give the duplicate a brief window to arrive and be re-acked.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(server.ack, ack_after_first);
    }

    #[test]
    fn oversized_payload_is_rejected_before_any_send() {
        let mut client = Connection::client(loopback(), loopback(), fast_config()).unwrap();
        let data = vec![0u8; wire::MAX_DATA_SIZE + 1];
        let err = client.send_packet(&data, Flags::Data.bits()).unwrap_err();
        assert!(matches!(err, TransportError::OversizedPayload { .. }));
    }

    #[test]
    fn send_on_closed_connection_fails_fast() {
        let mut client = Connection::client(loopback(), loopback(), fast_config()).unwrap();
        client.close();
        let err = client.send_packet(b"x", Flags::Data.bits()).unwrap_err();
        assert!(matches!(err, TransportError::NotOpen));
    }

    #[test]
    fn hundred_percent_loss_exhausts_retries() {
        // Bind a server but never handshake with it, so nothing ever replies.
        let server = Connection::server(loopback(), fast_config()).unwrap();
        let server_addr = server.local_addr();

        let mut client = Connection::client(loopback(), server_addr, fast_config()).unwrap();
        client.simulator_mut().set_loss_prob(1.0);

        let err = client.send_packet(b"lost", Flags::Data.bits()).unwrap_err();
        assert!(matches!(err, TransportError::RetriesExhausted));
    }

    #[test]
    fn fin_closes_receiver_and_returns_empty_payload() {
        let (server_addr, handle) = spawn_server(loopback(), fast_config());
        let mut client = Connection::client(loopback(), server_addr, fast_config()).unwrap();
        client.handshake_client().unwrap();
        let mut server = handle.join().unwrap();

        let reader = thread::spawn(move || server.receive_packet().unwrap());
        client.close();
        let (data, flags) = reader.join().unwrap();
        assert!(data.is_empty());
        assert!(Flags::is_fin(flags));
    }

    #[test]
    fn close_on_already_closed_connection_is_a_no_op() {
        let mut client = Connection::client(loopback(), loopback(), fast_config()).unwrap();
        client.close();
        client.close(); // must not panic or double-send
        assert!(!client.is_open());
    }

    #[test]
    fn bounded_server_handshake_fails_without_a_syn() {
        let mut server = Connection::server(loopback(), fast_config()).unwrap();
        let err = server.handshake_server_bounded(3).unwrap_err();
        assert!(matches!(err, TransportError::HandshakeFailed));
    }
}
