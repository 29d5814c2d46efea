//! Error types for the streaming processor

use std::path::PathBuf;
use thiserror::Error;

/// Where in a plugin's life a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Opening,
    Instantiation,
    Configuration,
    Processing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Opening => write!(f, "opening library"),
            Stage::Instantiation => write!(f, "creating instance"),
            Stage::Configuration => write!(f, "configuring processing"),
            Stage::Processing => write!(f, "processing"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Plugin load failed at {stage} stage: {path}\n  Reason: {reason}")]
    LoadFailed {
        path: PathBuf,
        stage: Stage,
        reason: String,
    },

    #[error("Plugin {plugin} supports neither single nor double precision processing")]
    UnsupportedPrecision { plugin: String },

    #[error("Plugin error while {stage}: {reason}")]
    PluginError { stage: Stage, reason: String },

    #[error("Malformed buffer: channel {channel} has {found_frames} frames, expected {expected_frames}")]
    MalformedBuffer {
        channel: usize,
        expected_frames: usize,
        found_frames: usize,
    },

    #[error("Malformed buffer: no channels")]
    EmptyBuffer,

    #[error("Invalid processor config: {0}")]
    InvalidConfig(String),

    #[error("Stream session failed: {0}")]
    SessionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    /// Errors that stop a session before it ever processes a buffer.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ProcessorError::LoadFailed { .. }
            | ProcessorError::UnsupportedPrecision { .. }
            | ProcessorError::InvalidConfig(_) => true,
            ProcessorError::PluginError { stage, .. } => *stage != Stage::Processing,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Opening.to_string(), "opening library");
        assert_eq!(Stage::Instantiation.to_string(), "creating instance");
        assert_eq!(Stage::Configuration.to_string(), "configuring processing");
        assert_eq!(Stage::Processing.to_string(), "processing");
    }

    #[test]
    fn test_error_display() {
        let err = ProcessorError::MalformedBuffer {
            channel: 1,
            expected_frames: 256,
            found_frames: 255,
        };
        let text = err.to_string();
        assert!(text.contains("channel 1"));
        assert!(text.contains("255"));
        assert!(text.contains("256"));

        assert_eq!(
            ProcessorError::EmptyBuffer.to_string(),
            "Malformed buffer: no channels"
        );

        let err = ProcessorError::UnsupportedPrecision {
            plugin: "Null".into(),
        };
        assert!(err.to_string().contains("Null"));
    }

    #[test]
    fn test_configuration_error_classification() {
        assert!(ProcessorError::UnsupportedPrecision {
            plugin: "x".into()
        }
        .is_configuration_error());
        assert!(ProcessorError::PluginError {
            stage: Stage::Configuration,
            reason: "rejected block size".into(),
        }
        .is_configuration_error());
        assert!(!ProcessorError::PluginError {
            stage: Stage::Processing,
            reason: "denormal storm".into(),
        }
        .is_configuration_error());
        assert!(!ProcessorError::EmptyBuffer.is_configuration_error());
    }
}
