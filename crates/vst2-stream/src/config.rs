//! Processor configuration.

use crate::error::{ProcessorError, Result};
use crate::instance::SpeakerArrangement;
use serde::{Deserialize, Serialize};

fn default_output_capacity() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Processed buffers that may wait downstream before the driver blocks.
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,
    /// Announced once per session, before resume.
    #[serde(default)]
    pub speaker_arrangement: SpeakerArrangement,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            output_capacity: default_output_capacity(),
            speaker_arrangement: SpeakerArrangement::STEREO,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_capacity == 0 {
            return Err(ProcessorError::InvalidConfig(
                "output_capacity must be at least 1".to_string(),
            ));
        }
        if self.speaker_arrangement.channels == 0 {
            return Err(ProcessorError::InvalidConfig(
                "speaker arrangement has no channels".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_config_default() {
        let config = ProcessorConfig::default();
        assert_eq!(config.output_capacity, 1);
        assert_eq!(config.speaker_arrangement, SpeakerArrangement::STEREO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_processor_config_validation() {
        let config = ProcessorConfig {
            output_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ProcessorError::InvalidConfig(_))
        ));

        let config = ProcessorConfig {
            speaker_arrangement: SpeakerArrangement { channels: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_processor_config_serde_defaults() {
        let config: ProcessorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProcessorConfig::default());

        let config: ProcessorConfig = serde_json::from_str(r#"{"output_capacity":8}"#).unwrap();
        assert_eq!(config.output_capacity, 8);
        assert_eq!(config.speaker_arrangement.channels, 2);
    }
}
