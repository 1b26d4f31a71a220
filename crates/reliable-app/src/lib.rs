//! A toy HTTP request/response layer running over the reliable datagram
//! transport, plus the bootstrap glue (`tracing-subscriber` init, CLI flags,
//! optional TOML config file) for the two binaries in `src/bin/`.

pub mod client;
pub mod http;
pub mod server;

pub use client::HttpClient;
pub use server::HttpServer;
