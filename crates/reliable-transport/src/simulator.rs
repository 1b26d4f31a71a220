//! # Channel Simulator
//!
//! A send-side-only filter used by tests to inject loss and corruption. Both
//! probabilities default to zero and are not part of the wire contract — a
//! conforming peer never needs to know the simulator exists.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Outcome of running an outbound datagram through the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedSend {
    /// Send the bytes as-is.
    Clean(Vec<u8>),
    /// Send the bytes with the last byte XORed with `0xFF`.
    Corrupted(Vec<u8>),
    /// Drop the datagram silently; nothing is sent.
    Dropped,
}

/// Bernoulli loss/corruption injector for the outbound path.
pub struct ChannelSimulator {
    loss_prob: f64,
    corrupt_prob: f64,
    rng: StdRng,
}

impl ChannelSimulator {
    /// A simulator with both probabilities at zero, using the thread's
    /// entropy source. Equivalent to "no simulation" in production use.
    pub fn disabled() -> Self {
        ChannelSimulator {
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            rng: StdRng::seed_from_u64(rand::rng().random()),
        }
    }

    /// A simulator seeded deterministically, for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        ChannelSimulator {
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn set_loss_prob(&mut self, p: f64) {
        self.loss_prob = p.clamp(0.0, 1.0);
    }

    pub fn set_corrupt_prob(&mut self, p: f64) {
        self.corrupt_prob = p.clamp(0.0, 1.0);
    }

    pub fn loss_prob(&self) -> f64 {
        self.loss_prob
    }

    pub fn corrupt_prob(&self) -> f64 {
        self.corrupt_prob
    }

    /// Run one outbound datagram through the simulator's Bernoulli draws.
    pub fn apply(&mut self, data: &[u8]) -> SimulatedSend {
        if self.loss_prob > 0.0 && self.rng.random::<f64>() < self.loss_prob {
            return SimulatedSend::Dropped;
        }

        if self.corrupt_prob > 0.0 && self.rng.random::<f64>() < self.corrupt_prob {
            let mut corrupted = data.to_vec();
            if let Some(last) = corrupted.last_mut() {
                *last ^= 0xFF;
            }
            return SimulatedSend::Corrupted(corrupted);
        }

        SimulatedSend::Clean(data.to_vec())
    }
}

impl Default for ChannelSimulator {
    fn default() -> Self {
        Self::disabled()
    }
}
