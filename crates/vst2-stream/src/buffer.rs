//! Sample buffers and pipeline messages.

use crate::error::{ProcessorError, Result};
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};

/// Channel and frame counts of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferShape {
    pub channels: usize,
    pub frames: usize,
}

impl std::fmt::Display for BufferShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ch x {}", self.channels, self.frames)
    }
}

/// Non-interleaved double precision audio: one `Vec` per channel.
///
/// Every channel must hold the same number of frames. This is checked by
/// [`SampleBuffer::shape`], not at construction, so a malformed buffer can
/// travel through the pipeline and be rejected where it is processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    channels: Vec<Vec<f64>>,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f64>>) -> Self {
        Self { channels }
    }

    /// `channels` channels of `frames` zeroed samples.
    pub fn silence(channels: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Validate the buffer and return its shape.
    ///
    /// Fails with [`ProcessorError::EmptyBuffer`] when there are no channels and
    /// with [`ProcessorError::MalformedBuffer`] at the first channel whose frame
    /// count differs from channel 0.
    pub fn shape(&self) -> Result<BufferShape> {
        let first = self.channels.first().ok_or(ProcessorError::EmptyBuffer)?;
        let frames = first.len();

        if let Some((channel, ch)) = self
            .channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != frames)
        {
            return Err(ProcessorError::MalformedBuffer {
                channel,
                expected_frames: frames,
                found_frames: ch.len(),
            });
        }

        Ok(BufferShape {
            channels: self.channels.len(),
            frames,
        })
    }
}

impl From<Vec<Vec<f64>>> for SampleBuffer {
    fn from(channels: Vec<Vec<f64>>) -> Self {
        Self::new(channels)
    }
}

/// One unit of the inbound and outbound streams.
///
/// `transport` is set when upstream publishes a new configuration; it is
/// adopted before `samples` are processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub transport: Option<TransportConfig>,
    pub samples: SampleBuffer,
}

impl Message {
    pub fn new(samples: SampleBuffer) -> Self {
        Self {
            transport: None,
            samples,
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = Some(transport);
        self
    }
}
