//! Plugin metadata
//!
//! Identity and capabilities reported by a loaded plugin.

use serde::{Deserialize, Serialize};

/// Audio I/O configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioIO {
    /// Number of audio input channels
    pub inputs: usize,
    /// Number of audio output channels
    pub outputs: usize,
}

impl AudioIO {
    /// Stereo in, stereo out
    pub fn stereo() -> Self {
        Self {
            inputs: 2,
            outputs: 2,
        }
    }
}

/// Plugin metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique plugin ID
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Vendor/author name
    pub vendor: String,

    /// Version string
    pub version: String,

    /// Audio I/O configuration
    pub audio_io: AudioIO,

    /// Whether the plugin processes 32-bit (f32) audio
    #[serde(default = "default_true")]
    pub supports_f32: bool,

    /// Whether the plugin processes 64-bit (f64) audio
    #[serde(default)]
    pub supports_f64: bool,
}

fn default_true() -> bool {
    true
}

impl PluginMetadata {
    /// Create new metadata with required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vendor: String::new(),
            version: "1.0.0".to_string(),
            audio_io: AudioIO::stereo(),
            supports_f32: true,
            supports_f64: false,
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn audio_io(mut self, inputs: usize, outputs: usize) -> Self {
        self.audio_io = AudioIO { inputs, outputs };
        self
    }

    pub fn f32_support(mut self, supports_f32: bool) -> Self {
        self.supports_f32 = supports_f32;
        self
    }

    pub fn f64_support(mut self, supports_f64: bool) -> Self {
        self.supports_f64 = supports_f64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_precision_defaults() {
        let meta = PluginMetadata::new("test.plugin", "Test Plugin");
        assert!(meta.supports_f32);
        assert!(!meta.supports_f64);

        let meta = meta.f64_support(true).f32_support(false);
        assert!(meta.supports_f64);
        assert!(!meta.supports_f32);
    }

    #[test]
    fn test_metadata_serde_roundtrip() {
        let meta = PluginMetadata::new("vst2.1234", "Super Reverb")
            .vendor("TestCo")
            .audio_io(2, 2)
            .f64_support(true);

        let json = serde_json::to_string(&meta).unwrap();
        let decoded: PluginMetadata = serde_json::from_str(&json).unwrap();

        assert!(decoded.supports_f64);
        assert_eq!(decoded.name, "Super Reverb");
        assert_eq!(decoded.audio_io, AudioIO::stereo());
    }

    #[test]
    fn test_metadata_serde_precision_defaults() {
        // Metadata written before the precision fields existed
        let json = r#"{"id":"old","name":"Old Plugin","vendor":"","version":"1.0.0","audio_io":{"inputs":2,"outputs":2}}"#;
        let decoded: PluginMetadata = serde_json::from_str(json).unwrap();

        assert!(decoded.supports_f32);
        assert!(!decoded.supports_f64);
    }
}
