//! Stream a sine tone through a VST2 plugin

use std::time::Duration;
use tokio::sync::mpsc;
use vst2_stream::{
    CancelToken, Message, PluginHandle, Processor, ProcessorConfig, SampleBuffer,
    TransportConfig, Vst2Plugin,
};

const BUFFERS: usize = 100;

fn sine(frames: usize, offset: usize, sample_rate: u32) -> SampleBuffer {
    let channel: Vec<f64> = (0..frames)
        .map(|i| {
            let t = (offset + i) as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect();
    SampleBuffer::new(vec![channel.clone(), channel])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let plugin_path = std::env::args()
        .nth(1)
        .expect("Usage: vst2_host <plugin>");

    let handle = PluginHandle::new(Box::new(Vst2Plugin::load(&plugin_path)?))?;
    println!(
        "Loaded {} ({:?} precision, {} in, {} out)",
        handle.name(),
        handle.width(),
        handle.metadata().audio_io.inputs,
        handle.metadata().audio_io.outputs
    );

    let transport = TransportConfig::new(512, 44100);
    let (tx, rx) = mpsc::channel(4);
    let cancel = CancelToken::new();
    cancel.cancel_after(Duration::from_secs(10));

    let mut session =
        Processor::new(handle, ProcessorConfig::default()).start(transport, rx, cancel)?;

    let feeder = tokio::spawn(async move {
        for n in 0..BUFFERS {
            let samples = sine(transport.buffer_size, n * transport.buffer_size, 44100);
            if tx.send(Message::new(samples)).await.is_err() {
                break;
            }
        }
    });

    let mut peak = 0.0f64;
    let mut received = 0;
    while let Some(out) = session.output.recv().await {
        for channel in out.samples.channels() {
            peak = channel.iter().fold(peak, |p, s| p.max(s.abs()));
        }
        received += 1;
    }
    feeder.await?;

    if let Some(err) = session.errors.recv().await {
        eprintln!("Session failed: {}", err);
    }

    let handle = session.task.join().await?;
    println!(
        "Processed {} buffers ({} samples), output peak {:.3}; {} suspended: {}",
        received,
        session.transport.position(),
        peak,
        handle.name(),
        !handle.is_active()
    );
    Ok(())
}
