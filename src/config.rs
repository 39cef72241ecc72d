//! Configuration types for analysis, residual modeling, and synthesis.
//!
//! Every configuration struct carries the defaults a host can start from and
//! a `validate()` method that rejects inconsistent settings before any
//! processing begins. Validation failures name the offending parameter so the
//! caller can fix its configuration rather than retry.

use serde::{Deserialize, Serialize};

use crate::error::{SineModelError, SineModelResult};

/// Window functions available for spectral analysis.
///
/// All three taper the frame to reduce spectral leakage; they differ in the
/// trade-off between main-lobe width and side-lobe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Hann window - good general-purpose window with moderate leakage.
    #[default]
    Hann,
    /// Hamming window - similar to Hann but slightly different coefficients.
    Hamming,
    /// Blackman window - low leakage but wider main lobe.
    Blackman,
}

/// Parameters for partial-tracking analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analysis frame length in samples. Must be a power of two.
    pub fft_size: usize,
    /// Sample advance between consecutive frames. Must not exceed `fft_size`.
    pub hop_size: usize,
    /// Window function applied to each frame.
    pub window_type: WindowType,
    /// Peaks below this level (dB) are ignored.
    pub min_amplitude_db: f32,
    /// Hard cap on the number of partials kept after tracking.
    pub max_partials: usize,
    /// Partials shorter than this are dropped after tracking.
    pub min_duration_ms: f32,
    /// Maximum frame-to-frame linking cost, in Hz.
    pub freq_tolerance_hz: f32,
    /// Lower edge of the analysis band, in Hz.
    pub freq_min_hz: f32,
    /// Upper edge of the analysis band, in Hz.
    pub freq_max_hz: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            window_type: WindowType::Hann,
            min_amplitude_db: -60.0,
            max_partials: 500,
            min_duration_ms: 50.0,
            freq_tolerance_hz: 50.0,
            freq_min_hz: 20.0,
            freq_max_hz: 8000.0,
        }
    }
}

impl AnalysisConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SineModelResult<()> {
        if self.fft_size == 0 || !self.fft_size.is_power_of_two() {
            return Err(SineModelError::InvalidParameter(format!(
                "fft_size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if self.hop_size == 0 {
            return Err(SineModelError::InvalidParameter(
                "hop_size must be greater than 0".to_string(),
            ));
        }
        if self.hop_size > self.fft_size {
            return Err(SineModelError::InvalidParameter(format!(
                "hop_size {} cannot exceed fft_size {}",
                self.hop_size, self.fft_size
            )));
        }
        if self.max_partials == 0 {
            return Err(SineModelError::InvalidParameter(
                "max_partials must be greater than 0".to_string(),
            ));
        }
        if !self.min_duration_ms.is_finite() || self.min_duration_ms < 0.0 {
            return Err(SineModelError::InvalidParameter(format!(
                "min_duration_ms must be non-negative, got {}",
                self.min_duration_ms
            )));
        }
        if !self.freq_tolerance_hz.is_finite() || self.freq_tolerance_hz <= 0.0 {
            return Err(SineModelError::InvalidParameter(format!(
                "freq_tolerance_hz must be greater than 0, got {}",
                self.freq_tolerance_hz
            )));
        }
        if self.freq_min_hz < 0.0 || self.freq_max_hz <= self.freq_min_hz {
            return Err(SineModelError::InvalidRange(format!(
                "frequency band [{}, {}] is empty or negative",
                self.freq_min_hz, self.freq_max_hz
            )));
        }
        Ok(())
    }
}

/// Parameters for the noise residual model.
///
/// These are independent of [`AnalysisConfig`]: the residual STFT runs at a
/// fixed resolution matched to the band synthesis, not at whatever resolution
/// the partial analysis happened to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Residual analysis frame length in samples. Must be a power of two.
    pub fft_size: usize,
    /// Sample advance between residual frames.
    pub hop_size: usize,
    /// Number of log-spaced bands between 20 Hz and Nyquist.
    pub num_bands: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            num_bands: 64,
        }
    }
}

impl NoiseConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SineModelResult<()> {
        if self.fft_size == 0 || !self.fft_size.is_power_of_two() {
            return Err(SineModelError::InvalidParameter(format!(
                "fft_size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.fft_size {
            return Err(SineModelError::InvalidParameter(format!(
                "hop_size {} must be in 1..={}",
                self.hop_size, self.fft_size
            )));
        }
        if self.num_bands == 0 {
            return Err(SineModelError::InvalidParameter(
                "num_bands must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for additive synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Playback-rate factor: 0.5 renders at half speed (double duration)
    /// without changing pitch.
    pub playback_rate: f32,
    /// Noise envelope mix level in [0, 1]. Ignored when no envelope is given.
    pub noise_mix: f32,
    /// Source-domain duration override in seconds. `None` derives the
    /// duration from the last partial point and the noise envelope.
    pub duration_secs: Option<f32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            playback_rate: 1.0,
            noise_mix: 0.3,
            duration_secs: None,
        }
    }
}

impl SynthesisConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SineModelResult<()> {
        if self.sample_rate == 0 {
            return Err(SineModelError::InvalidParameter(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(SineModelError::InvalidParameter(format!(
                "playback_rate must be positive and finite, got {}",
                self.playback_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_mix) {
            return Err(SineModelError::InvalidRange(format!(
                "noise_mix must be in [0, 1], got {}",
                self.noise_mix
            )));
        }
        if let Some(duration) = self.duration_secs {
            if !duration.is_finite() || duration < 0.0 {
                return Err(SineModelError::InvalidParameter(format!(
                    "duration_secs must be non-negative, got {duration}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(NoiseConfig::default().validate().is_ok());
        assert!(SynthesisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fft_size_must_be_power_of_two() {
        let config = AnalysisConfig {
            fft_size: 1000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SineModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hop_size_cannot_exceed_fft_size() {
        let config = AnalysisConfig {
            fft_size: 1024,
            hop_size: 2048,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_frequency_band_rejected() {
        let config = AnalysisConfig {
            freq_min_hz: 1000.0,
            freq_max_hz: 500.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SineModelError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_synthesis_rate_and_mix_bounds() {
        let mut config = SynthesisConfig {
            playback_rate: 0.0,
            ..SynthesisConfig::default()
        };
        assert!(config.validate().is_err());

        config.playback_rate = 1.0;
        config.noise_mix = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_type_serde_names() {
        let json = serde_json::to_string(&WindowType::Blackman).unwrap();
        assert_eq!(json, "\"blackman\"");
    }
}
