//! Explicit connection configuration.
//!
//! The reference implementation mutates ad-hoc attributes on a live socket
//! object to inject test behavior. Here, everything except the channel
//! simulator's probabilities is an immutable snapshot taken at connect time;
//! `loss_prob`/`corrupt_prob` remain live-tunable through the simulator
//! itself (see [`crate::simulator::ChannelSimulator`]), since tests need to
//! flip them mid-run.

use std::time::Duration;

use serde::Deserialize;

use crate::wire::MAX_DATA_SIZE;

/// Immutable-at-connect-time configuration for a [`crate::connection::Connection`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Receive deadline for a single datagram wait.
    pub timeout: Duration,
    /// Maximum stop-and-wait retransmit attempts for a data send.
    pub max_retries: u32,
    /// Maximum client handshake attempts before giving up.
    pub handshake_retries: u32,
    /// Wire-defined payload ceiling. Not user-settable; carried here only
    /// so callers can read it alongside the other tunables.
    pub max_data_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            timeout: Duration::from_secs(1),
            max_retries: 5,
            handshake_retries: 5,
            max_data_size: MAX_DATA_SIZE,
        }
    }
}

/// Serde-deserializable mirror of [`TransportConfig`] for loading a TOML
/// config file. All fields are optional so a partial file only overrides
/// what it names; anything absent falls back to [`TransportConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfigInput {
    pub timeout_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub handshake_retries: Option<u32>,
}

impl TransportConfigInput {
    /// Resolve into a concrete [`TransportConfig`], filling gaps with defaults.
    pub fn resolve(self) -> TransportConfig {
        let default = TransportConfig::default();
        TransportConfig {
            timeout: self
                .timeout_secs
                .map(Duration::from_secs_f64)
                .unwrap_or(default.timeout),
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            handshake_retries: self.handshake_retries.unwrap_or(default.handshake_retries),
            max_data_size: default.max_data_size,
        }
    }
}

impl TransportConfig {
    /// Parse a TOML document into a [`TransportConfig`]. An empty document
    /// yields the default configuration.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        if input.trim().is_empty() {
            return Ok(TransportConfig::default());
        }
        let parsed: TransportConfigInput = toml::from_str(input)?;
        Ok(parsed.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = TransportConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.handshake_retries, 5);
        assert_eq!(cfg.max_data_size, MAX_DATA_SIZE);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = TransportConfig::from_toml_str("max_retries = 3\n").unwrap();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.handshake_retries, 5); // untouched default
    }

    #[test]
    fn timeout_secs_parses_as_duration() {
        let cfg = TransportConfig::from_toml_str("timeout_secs = 2.5\n").unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs_f64(2.5));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(TransportConfig::from_toml_str("not valid = [[[").is_err());
    }
}
