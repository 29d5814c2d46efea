//! Transport configuration and the running sample position.
//!
//! [`TransportState`] is written by the stream driver and read by the host
//! callback while the plugin is inside its process call. The configuration is
//! swapped as a whole through [`ArcSwap`], so a reader always sees every field
//! of one published config. Reads never block, which keeps them legal on the
//! plugin's own call stack.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing configuration published by upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Frames per buffer.
    pub buffer_size: usize,
    /// Hz.
    pub sample_rate: u32,
    /// BPM. Must be positive.
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            buffer_size: 512,
            sample_rate: 44100,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
        }
    }
}

impl TransportConfig {
    pub fn new(buffer_size: usize, sample_rate: u32) -> Self {
        Self {
            buffer_size,
            sample_rate,
            ..Self::default()
        }
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_time_signature(mut self, numerator: i32, denominator: i32) -> Self {
        self.time_sig_numerator = numerator;
        self.time_sig_denominator = denominator;
        self
    }

    /// `60 / tempo * sample_rate`.
    pub fn samples_per_beat(&self) -> f64 {
        60.0 / self.tempo * self.sample_rate as f64
    }
}

/// Frames processed since the stream started.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SamplePosition(pub u64);

impl SamplePosition {
    pub fn advance(&mut self, frames: usize) {
        self.0 += frames as u64;
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for SamplePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared transport record: current config plus the published sample position.
///
/// The stream driver is the only writer. Everything else gets read access.
#[derive(Debug)]
pub struct TransportState {
    config: ArcSwap<TransportConfig>,
    position: AtomicU64,
}

impl TransportState {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            position: AtomicU64::new(0),
        }
    }

    /// Copy of the config in effect.
    pub fn config(&self) -> TransportConfig {
        **self.config.load()
    }

    pub fn position(&self) -> SamplePosition {
        SamplePosition(self.position.load(Ordering::Acquire))
    }

    /// Read the config and position as one pair.
    ///
    /// Between process calls both are stable, so during a callback the pair
    /// describes the buffer being processed.
    pub fn snapshot(&self) -> (TransportConfig, SamplePosition) {
        let config = **self.config.load();
        (config, self.position())
    }

    /// Replace the whole config.
    pub(crate) fn publish(&self, config: TransportConfig) {
        self.config.store(Arc::new(config));
    }

    pub(crate) fn set_position(&self, position: SamplePosition) {
        self.position.store(position.0, Ordering::Release);
    }
}
