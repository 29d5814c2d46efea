use crate::buffer::SampleBuffer;
use crate::callback::HostCallback;
use crate::error::{ProcessorError, Result, Stage};
use crate::instance::{AudioBuffer, NativePlugin, SpeakerArrangement};
use crate::metadata::PluginMetadata;
use crate::precision::{self, SampleWidth};
use crate::transport::TransportConfig;
use std::ops::{Deref, DerefMut};

/// Owns one loaded plugin instance.
///
/// Hides the plugin's preferred sample width behind a double precision
/// [`process`](Self::process) and tracks the resume/suspend state so each
/// transition reaches the plugin once.
pub struct PluginHandle {
    plugin: Box<dyn NativePlugin>,
    width: SampleWidth,
    active: bool,
}

impl PluginHandle {
    /// Fails with [`ProcessorError::UnsupportedPrecision`] when the plugin
    /// offers neither `f32` nor `f64` processing.
    pub fn new(plugin: Box<dyn NativePlugin>) -> Result<Self> {
        let meta = plugin.metadata();
        let width = SampleWidth::negotiate(&meta.name, meta.supports_f32, meta.supports_f64)?;
        tracing::debug!("Plugin {} will process at {:?} precision", meta.name, width);
        Ok(Self {
            plugin,
            width,
            active: false,
        })
    }

    pub fn metadata(&self) -> &PluginMetadata {
        self.plugin.metadata()
    }

    pub fn name(&self) -> &str {
        &self.plugin.metadata().name
    }

    pub fn width(&self) -> SampleWidth {
        self.width
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Session setup: block size, sample rate and speaker layout. Call before
    /// [`resume`](Self::resume).
    pub fn configure(
        &mut self,
        config: &TransportConfig,
        arrangement: SpeakerArrangement,
    ) -> Result<()> {
        self.apply_transport(config)?;
        self.plugin.set_speaker_arrangement(arrangement)
    }

    /// Push a newly adopted block size and sample rate to the plugin.
    pub fn apply_transport(&mut self, config: &TransportConfig) -> Result<()> {
        self.plugin.set_block_size(config.buffer_size)?;
        self.plugin.set_sample_rate(config.sample_rate as f64)
    }

    pub fn set_host_callback(&mut self, callback: Option<HostCallback>) {
        self.plugin.set_host_callback(callback);
    }

    pub fn resume(&mut self) {
        if !self.active {
            self.plugin.resume();
            self.active = true;
        }
    }

    pub fn suspend(&mut self) {
        if self.active {
            self.plugin.suspend();
            self.active = false;
        }
    }

    /// Resume and return a guard that suspends on every exit path.
    pub fn activate(mut self) -> ActivePlugin {
        self.resume();
        ActivePlugin { handle: Some(self) }
    }

    /// Run one buffer through the plugin.
    ///
    /// The output has the input's shape. Ragged or channel-less input is
    /// rejected before the plugin sees it; a zero-frame buffer is returned
    /// without a native call.
    pub fn process(&mut self, buffer: &SampleBuffer) -> Result<SampleBuffer> {
        let shape = buffer.shape()?;

        if !self.active {
            return Err(ProcessorError::PluginError {
                stage: Stage::Processing,
                reason: format!("{} is suspended", self.name()),
            });
        }

        if shape.frames == 0 {
            return Ok(buffer.clone());
        }

        match self.width {
            SampleWidth::Double => {
                let inputs: Vec<&[f64]> = buffer.channels().iter().map(Vec::as_slice).collect();
                let mut outputs = vec![vec![0.0f64; shape.frames]; shape.channels];
                {
                    let mut output_slices: Vec<&mut [f64]> =
                        outputs.iter_mut().map(Vec::as_mut_slice).collect();
                    let mut native = AudioBuffer {
                        inputs: &inputs,
                        outputs: &mut output_slices,
                        num_samples: shape.frames,
                    };
                    self.plugin.process_f64(&mut native)?;
                }
                Ok(SampleBuffer::new(outputs))
            }
            SampleWidth::Single => {
                let narrowed = precision::to_single(buffer);
                let inputs: Vec<&[f32]> = narrowed.iter().map(Vec::as_slice).collect();
                let mut outputs = vec![vec![0.0f32; shape.frames]; shape.channels];
                {
                    let mut output_slices: Vec<&mut [f32]> =
                        outputs.iter_mut().map(Vec::as_mut_slice).collect();
                    let mut native = AudioBuffer {
                        inputs: &inputs,
                        outputs: &mut output_slices,
                        num_samples: shape.frames,
                    };
                    self.plugin.process_f32(&mut native)?;
                }
                Ok(precision::to_double(outputs))
            }
        }
    }
}

/// A resumed [`PluginHandle`]. Suspends the plugin when dropped, including on
/// unwinding, or hands the suspended handle back through
/// [`deactivate`](Self::deactivate).
pub struct ActivePlugin {
    handle: Option<PluginHandle>,
}

impl ActivePlugin {
    pub fn deactivate(mut self) -> PluginHandle {
        let mut handle = self
            .handle
            .take()
            .unwrap_or_else(|| unreachable!("handle is only taken here or in drop"));
        handle.suspend();
        handle
    }
}

impl Deref for ActivePlugin {
    type Target = PluginHandle;

    fn deref(&self) -> &PluginHandle {
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("handle is only taken here or in drop"),
        }
    }
}

impl DerefMut for ActivePlugin {
    fn deref_mut(&mut self) -> &mut PluginHandle {
        match &mut self.handle {
            Some(handle) => handle,
            None => unreachable!("handle is only taken here or in drop"),
        }
    }
}

impl Drop for ActivePlugin {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.suspend();
        }
    }
}
