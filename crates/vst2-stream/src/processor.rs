//! Stream driver.
//!
//! [`Processor::start`] configures and resumes the plugin, then spawns one
//! task that pulls [`Message`]s from the inbound channel, runs them through
//! the plugin in arrival order, advances the sample position and pushes the
//! processed messages downstream. The task ends when the inbound channel
//! closes, when the [`CancelToken`] fires, when downstream goes away, or on
//! the first processing error. Every one of those paths suspends the plugin
//! exactly once and closes the outbound channels.

use crate::buffer::Message;
use crate::callback::HostCallback;
use crate::cancel::CancelToken;
use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::handle::{ActivePlugin, PluginHandle};
use crate::transport::{SamplePosition, TransportConfig, TransportState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drives one plugin through streaming sessions.
pub struct Processor {
    handle: PluginHandle,
    config: ProcessorConfig,
}

/// A running session.
pub struct Session {
    /// Processed messages, in input order. Closed when the session ends.
    pub output: mpsc::Receiver<Message>,
    /// Carries at most one terminal error, then closes.
    pub errors: mpsc::Receiver<ProcessorError>,
    /// Transport record the plugin's host callback reads from.
    pub transport: Arc<TransportState>,
    pub task: SessionTask,
}

/// Join handle of the session task. Yields the suspended plugin back.
pub struct SessionTask(JoinHandle<PluginHandle>);

impl SessionTask {
    pub async fn join(self) -> Result<PluginHandle> {
        self.0
            .await
            .map_err(|e| ProcessorError::SessionFailed(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Drained,
    Cancelled,
    DownstreamClosed,
    Failed,
}

impl Processor {
    pub fn new(handle: PluginHandle, config: ProcessorConfig) -> Self {
        Self { handle, config }
    }

    /// Configure and resume the plugin, then start streaming on a new task.
    ///
    /// Configuration failures are returned here and no task is spawned; the
    /// plugin is dropped with the processor in that case. Must be called
    /// inside a tokio runtime.
    pub fn start(
        self,
        initial: TransportConfig,
        input: mpsc::Receiver<Message>,
        cancel: CancelToken,
    ) -> Result<Session> {
        let Processor { mut handle, config } = self;
        config.validate()?;

        let transport = Arc::new(TransportState::new(initial));
        handle.set_host_callback(Some(HostCallback::new(Arc::clone(&transport))));
        if let Err(e) = handle.configure(&initial, config.speaker_arrangement) {
            handle.set_host_callback(None);
            return Err(e);
        }
        tracing::info!(
            "Configured {}: {} frames @ {} Hz, {} speakers",
            handle.name(),
            initial.buffer_size,
            initial.sample_rate,
            config.speaker_arrangement.channels
        );

        let plugin = handle.activate();

        let (output_tx, output_rx) = mpsc::channel(config.output_capacity);
        let (error_tx, error_rx) = mpsc::channel(1);

        let task = tokio::spawn(run(
            plugin,
            Arc::clone(&transport),
            input,
            output_tx,
            error_tx,
            cancel,
        ));

        Ok(Session {
            output: output_rx,
            errors: error_rx,
            transport,
            task: SessionTask(task),
        })
    }
}

async fn run(
    mut plugin: ActivePlugin,
    transport: Arc<TransportState>,
    mut input: mpsc::Receiver<Message>,
    output: mpsc::Sender<Message>,
    errors: mpsc::Sender<ProcessorError>,
    cancel: CancelToken,
) -> PluginHandle {
    let mut position = SamplePosition::default();

    let exit = loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Exit::Cancelled,
            msg = input.recv() => match msg {
                Some(msg) => msg,
                None => break Exit::Drained,
            },
        };

        let processed = match process_message(&mut plugin, &transport, &mut position, msg) {
            Ok(processed) => processed,
            Err(e) => {
                tracing::error!("{} failed at sample {}: {}", plugin.name(), position, e);
                let _ = errors.try_send(e);
                break Exit::Failed;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Exit::Cancelled,
            sent = output.send(processed) => {
                if sent.is_err() {
                    break Exit::DownstreamClosed;
                }
            }
        }
    };

    let mut handle = plugin.deactivate();
    handle.set_host_callback(None);
    tracing::info!(
        "Stream session for {} ended ({:?}) at sample {}",
        handle.name(),
        exit,
        position
    );
    handle
}

/// Adopt the message's config if any, process its samples and advance.
fn process_message(
    plugin: &mut ActivePlugin,
    transport: &TransportState,
    position: &mut SamplePosition,
    msg: Message,
) -> Result<Message> {
    if let Some(config) = &msg.transport {
        transport.publish(*config);
        plugin.apply_transport(config)?;
        tracing::debug!(
            "Adopted transport: {} frames @ {} Hz, {} BPM {}/{}",
            config.buffer_size,
            config.sample_rate,
            config.tempo,
            config.time_sig_numerator,
            config.time_sig_denominator
        );
    }

    let shape = msg.samples.shape()?;
    let samples = plugin.process(&msg.samples)?;

    position.advance(shape.frames);
    transport.set_position(*position);
    tracing::trace!("Processed {} buffer, position {}", shape, position);

    Ok(Message {
        transport: msg.transport,
        samples,
    })
}
