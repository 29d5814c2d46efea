//! Streaming VST2 processor
//!
//! Hosts one native VST2 plugin inside an asynchronous audio pipeline. Buffers
//! of double precision samples arrive on a channel, go through the plugin in
//! order, and leave on another channel. While it runs, the plugin may call back
//! into the host to ask for the sample rate, block size or transport time; those
//! questions are answered from the transport record of the session the plugin
//! belongs to.
//!
//! ## Usage
//!
//! ```ignore
//! use vst2_stream::{
//!     CancelToken, Message, PluginHandle, Processor, ProcessorConfig, SampleBuffer,
//!     TransportConfig, Vst2Plugin,
//! };
//!
//! let plugin = Vst2Plugin::load("/usr/lib/vst/reverb.so")?;
//! let handle = PluginHandle::new(Box::new(plugin))?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(4);
//! let mut session = Processor::new(handle, ProcessorConfig::default()).start(
//!     TransportConfig::new(512, 48000),
//!     rx,
//!     CancelToken::new(),
//! )?;
//!
//! tx.send(Message::new(SampleBuffer::silence(2, 512))).await?;
//! let processed = session.output.recv().await;
//! drop(tx);
//!
//! // The plugin comes back suspended once the session ends.
//! let handle = session.task.join().await?;
//! ```

pub mod error;
pub use error::{ProcessorError, Result, Stage};

mod buffer;
pub use buffer::{BufferShape, Message, SampleBuffer};

pub mod callback;
pub use callback::{HostCallback, HostOpcode, HostReply, TimeInfo};

mod cancel;
pub use cancel::CancelToken;

mod config;
pub use config::ProcessorConfig;

pub mod discovery;

mod handle;
pub use handle::{ActivePlugin, PluginHandle};

pub mod instance;
pub use instance::{AudioBuffer, AudioBuffer32, AudioBuffer64, NativePlugin, SpeakerArrangement};

mod metadata;
pub use metadata::{AudioIO, PluginMetadata};

pub mod precision;
pub use precision::SampleWidth;

mod processor;
pub use processor::{Processor, Session, SessionTask};

mod transport;
pub use transport::{SamplePosition, TransportConfig, TransportState};

#[cfg(feature = "vst2")]
mod vst2;
#[cfg(feature = "vst2")]
pub use vst2::{BridgeHost, Vst2Plugin};
