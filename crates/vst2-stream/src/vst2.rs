//! VST2 plugins through the `vst` crate.
//!
//! [`Vst2Plugin`] adapts a `vst::host::PluginInstance` to [`NativePlugin`].
//! The crate's [`Host`] trait is implemented by [`BridgeHost`], which forwards
//! the plugin's queries to whichever [`HostCallback`] the current session
//! registered and answers neutrally when there is none.
//!
//! The `vst` host dispatcher routes `audioMasterIdle`, `audioMasterGetTime`
//! and `audioMasterGetBlockSize` to the [`Host`] trait. It has no hook for
//! `audioMasterGetSampleRate`, so plugins asking for it get the crate's
//! default answer.

use crate::callback::{HostCallback, HostOpcode, HostReply, TimeInfo};
use crate::error::{ProcessorError, Result, Stage};
use crate::instance::{AudioBuffer32, AudioBuffer64, NativePlugin, SpeakerArrangement};
use crate::metadata::PluginMetadata;
use arc_swap::ArcSwapOption;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use vst::buffer::AudioBuffer as VstBuffer;
use vst::host::{Host, PluginInstance, PluginLoader};
use vst::plugin::Plugin as VstPlugin;

/// Receives the edit-idle calls the plugin asks for.
trait EditIdle: Send {
    fn idle(&mut self);
}

/// The plugin's editor.
///
/// Safety: `Box<dyn Editor>` is not `Send`, but it is only touched through
/// `&mut Vst2Plugin`, which one session drives at a time.
struct SendEditor(Box<dyn vst::editor::Editor>);
unsafe impl Send for SendEditor {}

impl EditIdle for SendEditor {
    fn idle(&mut self) {
        self.0.idle();
    }
}

/// Pending edit-idle requests and the editor that services them.
struct IdleService {
    pending: Arc<AtomicBool>,
    editor: Option<Box<dyn EditIdle>>,
}

impl IdleService {
    /// Deliver an edit-idle the plugin asked for since the last call.
    fn service(&mut self) {
        if self.pending.swap(false, Ordering::AcqRel) {
            if let Some(editor) = self.editor.as_mut() {
                editor.idle();
            }
        }
    }
}

/// A loaded VST2 plugin instance.
pub struct Vst2Plugin {
    // Declared before `instance` so the editor is dropped first.
    idle: IdleService,

    instance: PluginInstance,

    /// Kept alive for the `vst` crate's `Host` dispatch.
    #[allow(dead_code)]
    host: Arc<Mutex<BridgeHost>>,

    callback: Arc<ArcSwapOption<HostCallback>>,
    metadata: PluginMetadata,
}

impl Vst2Plugin {
    /// Open the library at `path` and create one instance.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let callback = Arc::new(ArcSwapOption::empty());
        let idle_pending = Arc::new(AtomicBool::new(false));

        let host = Arc::new(Mutex::new(BridgeHost::new(
            Arc::clone(&callback),
            Arc::clone(&idle_pending),
        )));

        let mut loader =
            PluginLoader::load(path, Arc::clone(&host)).map_err(|e| ProcessorError::LoadFailed {
                path: path.to_path_buf(),
                stage: Stage::Opening,
                reason: format!("Failed to load VST: {:?}", e),
            })?;

        let mut instance = loader.instance().map_err(|e| ProcessorError::LoadFailed {
            path: path.to_path_buf(),
            stage: Stage::Instantiation,
            reason: format!("Failed to create instance: {:?}", e),
        })?;

        instance.init();

        let info = instance.get_info();
        // `get_editor` hands the editor out once per instance and `None` after.
        let editor = instance
            .get_editor()
            .map(|editor| Box::new(SendEditor(editor)) as Box<dyn EditIdle>);
        if let Ok(mut host) = host.lock() {
            host.plugin_name = info.name.clone();
        }

        let metadata = PluginMetadata::new(format!("vst2.{}", info.unique_id), info.name.clone())
            .vendor(info.vendor.clone())
            .version(info.version.to_string())
            .audio_io(info.inputs.max(0) as usize, info.outputs.max(0) as usize)
            .f32_support(true)
            .f64_support(info.f64_precision);

        tracing::info!(
            "Loaded VST2 plugin {} ({}) from {}",
            metadata.name,
            metadata.id,
            path.display()
        );

        Ok(Self {
            idle: IdleService {
                pending: idle_pending,
                editor,
            },
            instance,
            host,
            callback,
            metadata,
        })
    }
}

impl NativePlugin for Vst2Plugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn set_block_size(&mut self, frames: usize) -> Result<()> {
        if frames == 0 {
            return Err(ProcessorError::PluginError {
                stage: Stage::Configuration,
                reason: "block size must be positive".to_string(),
            });
        }
        self.instance.set_block_size(frames as i64);
        Ok(())
    }

    fn set_sample_rate(&mut self, rate: f64) -> Result<()> {
        if rate <= 0.0 {
            return Err(ProcessorError::PluginError {
                stage: Stage::Configuration,
                reason: format!("invalid sample rate {}", rate),
            });
        }
        self.instance.set_sample_rate(rate as f32);
        Ok(())
    }

    fn set_speaker_arrangement(&mut self, arrangement: SpeakerArrangement) -> Result<()> {
        // `PluginInstance` has no effSetSpeakerArrangement; channel counts are
        // matched by padding in the process calls instead.
        let io = self.metadata.audio_io;
        if arrangement.channels != io.outputs {
            tracing::debug!(
                "{} has {} in / {} out, session uses {} channels",
                self.metadata.name,
                io.inputs,
                io.outputs,
                arrangement.channels
            );
        }
        Ok(())
    }

    fn resume(&mut self) {
        self.instance.resume();
    }

    fn suspend(&mut self) {
        self.instance.suspend();
        self.idle.service();
    }

    fn set_host_callback(&mut self, callback: Option<HostCallback>) {
        self.callback.store(callback.map(Arc::new));
    }

    fn process_f32(&mut self, buffer: &mut AudioBuffer32<'_>) -> Result<()> {
        let io = self.metadata.audio_io;
        let mut scratch = Scratch::new(
            buffer.inputs,
            buffer.outputs.len(),
            buffer.num_samples,
            io.inputs,
            io.outputs,
        );

        let input_ptrs: Vec<*const f32> = scratch.inputs.iter().map(|v| v.as_ptr()).collect();
        let mut output_ptrs: Vec<*mut f32> =
            scratch.outputs.iter_mut().map(|v| v.as_mut_ptr()).collect();

        // Safety: every pointer refers to a `scratch` channel of `num_samples`
        // samples, and `scratch` outlives the process call.
        let mut native = unsafe {
            VstBuffer::from_raw(
                input_ptrs.len(),
                output_ptrs.len(),
                input_ptrs.as_ptr(),
                output_ptrs.as_mut_ptr(),
                buffer.num_samples,
            )
        };
        self.instance.process(&mut native);

        scratch.copy_outputs(buffer.outputs);
        self.idle.service();
        Ok(())
    }

    fn process_f64(&mut self, buffer: &mut AudioBuffer64<'_>) -> Result<()> {
        let io = self.metadata.audio_io;
        let mut scratch = Scratch::new(
            buffer.inputs,
            buffer.outputs.len(),
            buffer.num_samples,
            io.inputs,
            io.outputs,
        );

        let input_ptrs: Vec<*const f64> = scratch.inputs.iter().map(|v| v.as_ptr()).collect();
        let mut output_ptrs: Vec<*mut f64> =
            scratch.outputs.iter_mut().map(|v| v.as_mut_ptr()).collect();

        // Safety: as in `process_f32`.
        let mut native = unsafe {
            VstBuffer::from_raw(
                input_ptrs.len(),
                output_ptrs.len(),
                input_ptrs.as_ptr(),
                output_ptrs.as_mut_ptr(),
                buffer.num_samples,
            )
        };
        self.instance.process_f64(&mut native);

        scratch.copy_outputs(buffer.outputs);
        self.idle.service();
        Ok(())
    }
}

/// Channel storage sized for both the session and the plugin's own I/O count.
struct Scratch<T> {
    inputs: Vec<Vec<T>>,
    outputs: Vec<Vec<T>>,
}

impl<T: Copy + Default> Scratch<T> {
    fn new(
        inputs: &[&[T]],
        session_outputs: usize,
        frames: usize,
        native_inputs: usize,
        native_outputs: usize,
    ) -> Self {
        let mut padded: Vec<Vec<T>> = inputs.iter().map(|ch| ch[..frames].to_vec()).collect();
        while padded.len() < native_inputs {
            padded.push(vec![T::default(); frames]);
        }
        let outputs = vec![vec![T::default(); frames]; session_outputs.max(native_outputs)];
        Self {
            inputs: padded,
            outputs,
        }
    }

    /// Channels the plugin does not produce stay silent.
    fn copy_outputs(&self, outputs: &mut [&mut [T]]) {
        for (dst, src) in outputs.iter_mut().zip(&self.outputs) {
            dst.copy_from_slice(&src[..dst.len()]);
        }
    }
}

/// `Host` implementation handed to the `vst` crate.
pub struct BridgeHost {
    callback: Arc<ArcSwapOption<HostCallback>>,
    idle_pending: Arc<AtomicBool>,
    plugin_name: String,
}

impl BridgeHost {
    fn new(callback: Arc<ArcSwapOption<HostCallback>>, idle_pending: Arc<AtomicBool>) -> Self {
        Self {
            callback,
            idle_pending,
            plugin_name: String::new(),
        }
    }

    fn dispatch(&self, opcode: HostOpcode) -> HostReply {
        match self.callback.load().as_deref() {
            Some(callback) => callback.dispatch(opcode),
            None => {
                tracing::debug!(
                    "Plugin {} called host (opcode {}) outside a session",
                    self.plugin_name,
                    opcode.raw()
                );
                HostReply::Ignored
            }
        }
    }
}

impl Host for BridgeHost {
    fn automate(&self, _index: i32, _value: f32) {}

    fn idle(&self) {
        if self.dispatch(HostOpcode::Idle) == HostReply::EditIdle {
            self.idle_pending.store(true, Ordering::Release);
        }
    }

    fn get_time_info(&self, _mask: i32) -> Option<vst::api::TimeInfo> {
        match self.dispatch(HostOpcode::GetTime) {
            HostReply::Time(time) => Some(to_api_time_info(&time)),
            _ => None,
        }
    }

    fn get_block_size(&self) -> isize {
        self.dispatch(HostOpcode::GetBlockSize).value() as isize
    }
}

fn to_api_time_info(time: &TimeInfo) -> vst::api::TimeInfo {
    vst::api::TimeInfo {
        sample_pos: time.sample_pos,
        sample_rate: time.sample_rate,
        nanoseconds: time.nanoseconds,
        ppq_pos: time.ppq_pos,
        tempo: time.tempo,
        bar_start_pos: time.bar_pos,
        time_sig_numerator: time.time_sig_numerator,
        time_sig_denominator: time.time_sig_denominator,
        flags: time.flags,
        ..Default::default()
    }
}
