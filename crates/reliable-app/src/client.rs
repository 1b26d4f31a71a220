//! A toy HTTP client: one request per connection, matching the reference
//! implementation's request/response-then-close lifecycle.

use std::net::SocketAddr;
use std::time::Duration;

use reliable_transport::{Client as TransportClient, TransportConfig, TransportError};

use crate::http::Request;

pub struct HttpClient {
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    config: TransportConfig,
    loss_prob: f64,
    corrupt_prob: f64,
}

impl HttpClient {
    pub fn new(local_addr: SocketAddr, remote_addr: SocketAddr, config: TransportConfig) -> Self {
        HttpClient {
            local_addr,
            remote_addr,
            config,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
        }
    }

    /// Tune outbound loss/corruption simulation applied to every request
    /// this client sends from here on.
    pub fn with_simulation(mut self, loss_prob: f64, corrupt_prob: f64) -> Self {
        self.loss_prob = loss_prob;
        self.corrupt_prob = corrupt_prob;
        self
    }

    fn send_request(&self, method: &str, path: &str, body: &str) -> Result<String, TransportError> {
        let mut client = TransportClient::new(self.local_addr, self.remote_addr, self.config.clone())?;
        if self.loss_prob > 0.0 || self.corrupt_prob > 0.0 {
            client.simulator_mut().set_loss_prob(self.loss_prob);
            client.simulator_mut().set_corrupt_prob(self.corrupt_prob);
        }
        let request = Request::encode(method, path, body);

        let result = (|| -> Result<String, TransportError> {
            client.open()?;
            client.send_message(&request)?;
            let (response, _flags) = client.receive_message()?;
            Ok(String::from_utf8_lossy(&response).into_owned())
        })();

        // Give the server a moment to finish processing before tearing
        // down, matching the reference client's fixed post-exchange delay.
        std::thread::sleep(Duration::from_millis(200));
        client.close();

        result
    }

    pub fn get(&self, path: &str) -> Result<String, TransportError> {
        self.send_request("GET", path, "")
    }

    pub fn post(&self, path: &str, body: &str) -> Result<String, TransportError> {
        self.send_request("POST", path, body)
    }
}
