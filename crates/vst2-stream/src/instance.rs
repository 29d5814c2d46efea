//! Native plugin boundary.
//!
//! [`NativePlugin`] is what a loaded plugin looks like to the rest of the
//! crate. The VST2 shim implements it over the `vst` crate; tests implement it
//! with in-memory mocks.

use crate::callback::HostCallback;
use crate::metadata::PluginMetadata;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Borrowed non-interleaved audio handed to a native process call.
pub struct AudioBuffer<'a, T = f32> {
    pub inputs: &'a [&'a [T]],
    pub outputs: &'a mut [&'a mut [T]],
    pub num_samples: usize,
}

pub type AudioBuffer32<'a> = AudioBuffer<'a, f32>;
pub type AudioBuffer64<'a> = AudioBuffer<'a, f64>;

/// Speaker layout announced to the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerArrangement {
    pub channels: usize,
}

impl SpeakerArrangement {
    pub const STEREO: Self = Self { channels: 2 };
}

impl Default for SpeakerArrangement {
    fn default() -> Self {
        Self::STEREO
    }
}

/// A loaded plugin instance.
///
/// Instances are not assumed to be reentrant: every method takes `&mut self`
/// and one instance is driven by one session at a time.
pub trait NativePlugin: Send {
    fn metadata(&self) -> &PluginMetadata;

    fn set_block_size(&mut self, frames: usize) -> Result<()>;

    fn set_sample_rate(&mut self, rate: f64) -> Result<()>;

    fn set_speaker_arrangement(&mut self, arrangement: SpeakerArrangement) -> Result<()>;

    /// `effMainsChanged(1)`.
    fn resume(&mut self);

    /// `effMainsChanged(0)`.
    fn suspend(&mut self);

    /// Install or clear the callback the plugin uses to query its host.
    /// `None` restores the default callback, which answers neutrally.
    fn set_host_callback(&mut self, callback: Option<HostCallback>);

    /// `processReplacing`. Writes every output slice.
    fn process_f32(&mut self, buffer: &mut AudioBuffer32<'_>) -> Result<()>;

    /// `processDoubleReplacing`. Only called when `metadata().supports_f64`.
    fn process_f64(&mut self, buffer: &mut AudioBuffer64<'_>) -> Result<()>;
}
