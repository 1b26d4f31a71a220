//! Reliable datagram transport over UDP: a stop-and-wait ARQ session with a
//! three-way handshake, checksum-based corruption detection, and FIN
//! teardown. Single-threaded per endpoint, synchronous, no background
//! tasks — a connection's entire lifecycle runs on the caller's own thread.

pub mod config;
pub mod connection;
pub mod error;
pub mod facade;
pub mod simulator;
pub mod wire;

pub use config::TransportConfig;
pub use connection::{Connection, Role};
pub use error::TransportError;
pub use facade::Client;
pub use simulator::{ChannelSimulator, SimulatedSend};
pub use wire::{Flags, Packet};
