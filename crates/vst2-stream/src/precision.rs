//! Sample-width negotiation and conversion.
//!
//! The pipeline always carries `f64`. Plugins that only process `f32` get a
//! converted copy on the way in and have their output widened on the way out.
//! The narrowing is lossy and that is accepted: shape is preserved exactly,
//! values only to single precision.

use crate::buffer::SampleBuffer;
use crate::error::{ProcessorError, Result};
use serde::{Deserialize, Serialize};

/// Width a plugin is driven at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleWidth {
    Single,
    Double,
}

impl SampleWidth {
    /// Double precision is used whenever the plugin offers it.
    pub fn negotiate(plugin: &str, supports_f32: bool, supports_f64: bool) -> Result<Self> {
        match (supports_f32, supports_f64) {
            (_, true) => Ok(SampleWidth::Double),
            (true, false) => Ok(SampleWidth::Single),
            (false, false) => Err(ProcessorError::UnsupportedPrecision {
                plugin: plugin.to_string(),
            }),
        }
    }
}

/// Narrow every channel to `f32`.
pub fn to_single(buffer: &SampleBuffer) -> Vec<Vec<f32>> {
    buffer
        .channels()
        .iter()
        .map(|ch| ch.iter().map(|&s| s as f32).collect())
        .collect()
}

/// Widen every channel back to `f64`.
pub fn to_double(channels: Vec<Vec<f32>>) -> SampleBuffer {
    SampleBuffer::new(
        channels
            .into_iter()
            .map(|ch| ch.into_iter().map(f64::from).collect())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_prefers_double() {
        assert_eq!(
            SampleWidth::negotiate("p", true, true).unwrap(),
            SampleWidth::Double
        );
        assert_eq!(
            SampleWidth::negotiate("p", false, true).unwrap(),
            SampleWidth::Double
        );
    }

    #[test]
    fn test_negotiate_single_only() {
        assert_eq!(
            SampleWidth::negotiate("p", true, false).unwrap(),
            SampleWidth::Single
        );
    }

    #[test]
    fn test_negotiate_without_support_is_an_error() {
        let err = SampleWidth::negotiate("Silent Box", false, false).unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedPrecision { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_conversion_preserves_shape_and_values() {
        let original = SampleBuffer::new(vec![
            (0..300).map(|i| (i as f64 * 0.013).sin()).collect(),
            (0..300).map(|i| (i as f64 * 0.007).cos() * 0.5).collect(),
            Vec::new(),
        ]);

        let narrowed = to_single(&original);
        assert_eq!(narrowed.len(), 3);
        assert_eq!(narrowed[0].len(), 300);
        assert_eq!(narrowed[2].len(), 0);

        let widened = to_double(narrowed);
        assert_eq!(widened.num_channels(), original.num_channels());
        for (a, b) in original.channels().iter().zip(widened.channels()) {
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() <= f32::EPSILON as f64 * x.abs().max(1.0));
            }
        }
    }
}
