//! A toy HTTP server driven by a single reliable-transport connection per
//! client. Each accepted connection is served to completion (FIN or error)
//! before the listener accepts the next one — there is no concurrency here,
//! matching the transport's one-socket-per-connection model.

use std::net::SocketAddr;

use reliable_transport::{Connection, TransportConfig, TransportError};

use crate::http::{self, Request};

pub struct HttpServer {
    local_addr: SocketAddr,
    config: TransportConfig,
}

impl HttpServer {
    pub fn new(local_addr: SocketAddr, config: TransportConfig) -> Self {
        HttpServer { local_addr, config }
    }

    /// Accept and serve one connection, then return. The caller loops this
    /// to serve connections back to back.
    pub fn serve_one(&self) -> Result<(), TransportError> {
        let mut conn = Connection::server(self.local_addr, self.config.clone())?;
        conn.handshake_server()?;

        let result = self.handle_connection(&mut conn);
        conn.close();
        result
    }

    fn handle_connection(&self, conn: &mut Connection) -> Result<(), TransportError> {
        loop {
            let (data, flags) = conn.receive_packet()?;
            if reliable_transport::Flags::is_fin(flags) {
                tracing::info!(peer = ?conn.remote_addr(), "peer closed connection");
                return Ok(());
            }

            let response = match Request::parse(&data) {
                Ok(request) => {
                    tracing::debug!(method = %request.method, path = %request.path, "handling request");
                    http::route(&request)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unparsable request body");
                    http::render_response("400 Bad Request", "Bad Request")
                }
            };

            conn.send_packet(&response, reliable_transport::Flags::Data.bits())?;
        }
    }
}
