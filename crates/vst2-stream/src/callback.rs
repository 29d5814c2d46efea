//! Host callback bridge.
//!
//! A plugin calls back into its host synchronously, usually from inside its
//! own process call, to ask for the sample rate, block size or transport time.
//! [`HostCallback`] answers those questions from a [`TransportState`] handle
//! and nothing else: it holds no global state, never blocks and never calls
//! back into the stream driver. One callback is registered per plugin instance.

use crate::transport::{SamplePosition, TransportConfig, TransportState};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// `audioMaster*` opcode numbers used by the VST2 host callback.
pub mod opcode {
    pub const IDLE: i32 = 3;
    pub const GET_TIME: i32 = 7;
    pub const GET_SAMPLE_RATE: i32 = 16;
    pub const GET_BLOCK_SIZE: i32 = 17;
}

/// `VstTimeInfo` flag bits.
pub mod time_flags {
    pub const TRANSPORT_PLAYING: i32 = 1 << 1;
    pub const NANOS_VALID: i32 = 1 << 8;
    pub const PPQ_POS_VALID: i32 = 1 << 9;
    pub const TEMPO_VALID: i32 = 1 << 10;
    pub const BARS_VALID: i32 = 1 << 11;
    pub const TIME_SIG_VALID: i32 = 1 << 13;
}

/// A query from the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOpcode {
    Idle,
    GetTime,
    GetSampleRate,
    GetBlockSize,
    /// Anything the host does not answer. Plugins probe many optional
    /// capabilities, so this is not an error.
    Other(i32),
}

impl HostOpcode {
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            opcode::IDLE => HostOpcode::Idle,
            opcode::GET_TIME => HostOpcode::GetTime,
            opcode::GET_SAMPLE_RATE => HostOpcode::GetSampleRate,
            opcode::GET_BLOCK_SIZE => HostOpcode::GetBlockSize,
            other => HostOpcode::Other(other),
        }
    }

    pub const fn raw(self) -> i32 {
        match self {
            HostOpcode::Idle => opcode::IDLE,
            HostOpcode::GetTime => opcode::GET_TIME,
            HostOpcode::GetSampleRate => opcode::GET_SAMPLE_RATE,
            HostOpcode::GetBlockSize => opcode::GET_BLOCK_SIZE,
            HostOpcode::Other(raw) => raw,
        }
    }
}

/// Transport time handed to the plugin for `audioMasterGetTime`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInfo {
    pub sample_rate: f64,
    pub sample_pos: f64,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    /// Wall clock, nanoseconds since the Unix epoch.
    pub nanoseconds: f64,
    /// Musical position in quarter notes, 1-based.
    pub ppq_pos: f64,
    /// `floor(ppq_pos / time_sig_numerator)`.
    pub bar_pos: f64,
    pub flags: i32,
}

impl TimeInfo {
    /// Musical time for `position` under `config`.
    ///
    /// Uses the time signature of this one snapshot; a signature change in the
    /// middle of a buffer is not reflected until the next query after it is
    /// adopted. `config.tempo` must be positive.
    pub fn at(config: &TransportConfig, position: SamplePosition, nanoseconds: f64) -> Self {
        let ppq_pos = position.as_f64() / config.samples_per_beat() + 1.0;
        let bar_pos = (ppq_pos / config.time_sig_numerator as f64).floor();

        Self {
            sample_rate: config.sample_rate as f64,
            sample_pos: position.as_f64(),
            tempo: config.tempo,
            time_sig_numerator: config.time_sig_numerator,
            time_sig_denominator: config.time_sig_denominator,
            nanoseconds,
            ppq_pos,
            bar_pos,
            flags: time_flags::TRANSPORT_PLAYING
                | time_flags::NANOS_VALID
                | time_flags::PPQ_POS_VALID
                | time_flags::TEMPO_VALID
                | time_flags::BARS_VALID
                | time_flags::TIME_SIG_VALID,
        }
    }
}

/// Answer to a [`HostOpcode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostReply {
    Value(i64),
    Time(TimeInfo),
    /// The native shim must send `effEditIdle` back to the plugin.
    EditIdle,
    Ignored,
}

impl HostReply {
    /// Integer return value of the native callback. Time info travels by
    /// pointer, so its value here is 0.
    pub fn value(&self) -> i64 {
        match self {
            HostReply::Value(v) => *v,
            HostReply::Time(_) | HostReply::EditIdle | HostReply::Ignored => 0,
        }
    }
}

/// Per-instance host callback bound to one session's transport.
#[derive(Debug, Clone)]
pub struct HostCallback {
    transport: Arc<TransportState>,
}

impl HostCallback {
    pub fn new(transport: Arc<TransportState>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<TransportState> {
        &self.transport
    }

    pub fn dispatch(&self, opcode: HostOpcode) -> HostReply {
        match opcode {
            HostOpcode::Idle => {
                tracing::trace!("plugin requested idle");
                HostReply::EditIdle
            }
            HostOpcode::GetSampleRate => {
                HostReply::Value(self.transport.config().sample_rate as i64)
            }
            HostOpcode::GetBlockSize => HostReply::Value(self.transport.config().buffer_size as i64),
            HostOpcode::GetTime => HostReply::Time(self.time_info()),
            HostOpcode::Other(_) => HostReply::Ignored,
        }
    }

    /// Dispatch a raw opcode number.
    pub fn dispatch_raw(&self, raw: i32) -> HostReply {
        self.dispatch(HostOpcode::from_raw(raw))
    }

    pub fn time_info(&self) -> TimeInfo {
        let (config, position) = self.transport.snapshot();
        TimeInfo::at(&config, position, wall_clock_nanos())
    }
}

fn wall_clock_nanos() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as f64)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(config: TransportConfig) -> HostCallback {
        HostCallback::new(Arc::new(TransportState::new(config)))
    }

    #[test]
    fn test_opcode_mapping() {
        assert_eq!(HostOpcode::from_raw(3), HostOpcode::Idle);
        assert_eq!(HostOpcode::from_raw(7), HostOpcode::GetTime);
        assert_eq!(HostOpcode::from_raw(16), HostOpcode::GetSampleRate);
        assert_eq!(HostOpcode::from_raw(17), HostOpcode::GetBlockSize);
        assert_eq!(HostOpcode::from_raw(23), HostOpcode::Other(23));
        for raw in [3, 7, 16, 17, 0, 42, -1] {
            assert_eq!(HostOpcode::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_sample_rate_and_block_size() {
        let cb = callback(TransportConfig::new(256, 48000));
        assert_eq!(cb.dispatch(HostOpcode::GetSampleRate), HostReply::Value(48000));
        assert_eq!(cb.dispatch(HostOpcode::GetBlockSize), HostReply::Value(256));
    }

    #[test]
    fn test_answers_follow_published_config() {
        let cb = callback(TransportConfig::new(256, 48000));
        cb.transport().publish(TransportConfig::new(1024, 96000));
        assert_eq!(cb.dispatch_raw(opcode::GET_SAMPLE_RATE).value(), 96000);
        assert_eq!(cb.dispatch_raw(opcode::GET_BLOCK_SIZE).value(), 1024);
    }

    #[test]
    fn test_idle_requests_edit_idle() {
        let cb = callback(TransportConfig::default());
        let reply = cb.dispatch(HostOpcode::Idle);
        assert_eq!(reply, HostReply::EditIdle);
        assert_eq!(reply.value(), 0);
    }

    #[test]
    fn test_unknown_opcodes_are_ignored() {
        let cb = callback(TransportConfig::default());
        for raw in [0, 1, 2, 23, 42, 10_000, -5] {
            let reply = cb.dispatch_raw(raw);
            assert_eq!(reply, HostReply::Ignored);
            assert_eq!(reply.value(), 0);
        }
    }

    #[test]
    fn test_quarter_note_position() {
        let config = TransportConfig::new(512, 44100).with_tempo(120.0);
        let info = TimeInfo::at(&config, SamplePosition(44100), 0.0);
        assert!((info.ppq_pos - 2.0).abs() < 1e-12);
        assert_eq!(info.sample_pos, 44100.0);
        assert_eq!(info.sample_rate, 44100.0);
        assert_eq!(info.tempo, 120.0);
    }

    #[test]
    fn test_position_at_stream_start() {
        let info = TimeInfo::at(&TransportConfig::default(), SamplePosition(0), 0.0);
        assert_eq!(info.ppq_pos, 1.0);
        assert_eq!(info.bar_pos, 0.0);
    }

    #[test]
    fn test_bar_position() {
        // 120 BPM at 44100 Hz: one beat is 22050 samples.
        let config = TransportConfig::new(512, 44100).with_time_signature(3, 4);
        let info = TimeInfo::at(&config, SamplePosition(22050 * 5), 0.0);
        assert!((info.ppq_pos - 6.0).abs() < 1e-12);
        assert_eq!(info.bar_pos, 2.0);
        assert_eq!(info.time_sig_numerator, 3);
        assert_eq!(info.time_sig_denominator, 4);
    }

    #[test]
    fn test_time_info_reads_position_and_flags() {
        let cb = callback(TransportConfig::new(512, 48000).with_tempo(90.0));
        cb.transport().set_position(SamplePosition(96000));

        let info = match cb.dispatch(HostOpcode::GetTime) {
            HostReply::Time(info) => info,
            other => panic!("expected time info, got {:?}", other),
        };

        assert_eq!(info.sample_pos, 96000.0);
        assert!((info.ppq_pos - (96000.0 / (60.0 / 90.0 * 48000.0) + 1.0)).abs() < 1e-12);
        assert!(info.nanoseconds > 0.0);
        assert_ne!(info.flags & time_flags::TEMPO_VALID, 0);
        assert_ne!(info.flags & time_flags::PPQ_POS_VALID, 0);
        assert_ne!(info.flags & time_flags::TIME_SIG_VALID, 0);
    }
}
