//! End-to-end analysis: framing, magnitude spectra, peak extraction, and
//! partial tracking.
//!
//! The pipeline consumes a whole mono buffer ahead of time; there is no
//! streaming mode. Long passes report progress through a caller-supplied
//! callback at fixed frame intervals so a single-threaded host can keep its
//! UI responsive. The callback has no effect on the analysis result, and no
//! other core operation may run while a pass is in flight.

use crate::config::AnalysisConfig;
use crate::error::{SineModelError, SineModelResult};
use crate::model::{Frame, Partial};
use crate::peaks::extract_peaks;
use crate::spectrum::SpectrumAnalyzer;
use crate::tracker::track_partials_with_progress;

/// Spectral-stage progress is reported every this many frames.
pub const ANALYSIS_PROGRESS_INTERVAL: usize = 100;

/// Which stage of the analysis pipeline a progress report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    /// Per-frame spectra and peak extraction.
    Spectral,
    /// Frame-to-frame partial tracking.
    Tracking,
}

/// Progress snapshot emitted during analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisProgress {
    /// The stage this report refers to.
    pub stage: AnalysisStage,
    /// Frames processed so far within the stage.
    pub frames_done: usize,
    /// Total frames in the stage.
    pub frames_total: usize,
}

/// Analyzes a mono signal into a partial collection.
///
/// See [`analyze_with_progress`]; this variant skips progress reporting.
///
/// # Examples
///
/// ```rust
/// use sinemodel::{analyze, AnalysisConfig};
/// use sinemodel::generation::sine_wave;
/// use std::time::Duration;
///
/// let signal = sine_wave(440.0, Duration::from_secs(1), 44_100, 0.5);
/// let partials = analyze(&signal, 44_100, &AnalysisConfig::default()).unwrap();
/// assert_eq!(partials.len(), 1);
/// ```
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> SineModelResult<Vec<Partial>> {
    analyze_with_progress(samples, sample_rate, config, |_| {})
}

/// Analyzes a mono signal into a partial collection, reporting progress.
///
/// The signal is cut into `fft_size`-sample frames every `hop_size` samples;
/// each frame yields a magnitude spectrum and a peak list, and the tracker
/// links the per-frame peaks into partials. Fails before any processing when
/// the configuration is invalid, the sample rate is zero, or the signal is
/// empty or shorter than one frame.
pub fn analyze_with_progress(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
    mut on_progress: impl FnMut(AnalysisProgress),
) -> SineModelResult<Vec<Partial>> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(SineModelError::InvalidParameter(
            "sample_rate must be greater than 0".to_string(),
        ));
    }
    if samples.is_empty() {
        return Err(SineModelError::DimensionMismatch(
            "signal is empty".to_string(),
        ));
    }
    if samples.len() < config.fft_size {
        return Err(SineModelError::DimensionMismatch(format!(
            "signal length {} is shorter than fft_size {}",
            samples.len(),
            config.fft_size
        )));
    }

    let analyzer = SpectrumAnalyzer::new(config.fft_size, config.window_type)?;
    let calibration = analyzer.sinusoid_calibration();
    let num_frames = (samples.len() - config.fft_size) / config.hop_size + 1;

    let mut frames = Vec::with_capacity(num_frames);
    for frame_idx in 0..num_frames {
        let start = frame_idx * config.hop_size;
        let magnitudes = analyzer.magnitudes(&samples[start..start + config.fft_size])?;
        let peaks = extract_peaks(&magnitudes, sample_rate, config, calibration);
        frames.push(Frame {
            time: start as f32 / sample_rate as f32,
            peaks,
        });

        if frame_idx % ANALYSIS_PROGRESS_INTERVAL == 0 {
            on_progress(AnalysisProgress {
                stage: AnalysisStage::Spectral,
                frames_done: frame_idx,
                frames_total: num_frames,
            });
        }
    }
    tracing::debug!(frames = frames.len(), "spectral analysis complete");

    let partials = track_partials_with_progress(&frames, sample_rate, config, |p| {
        on_progress(AnalysisProgress {
            stage: AnalysisStage::Tracking,
            frames_done: p.frames_done,
            frames_total: p.frames_total,
        });
    })?;

    tracing::info!(
        partials = partials.len(),
        frames = num_frames,
        "analysis complete"
    );
    Ok(partials)
}

/// Downmixes planar multi-channel audio to mono by arithmetic mean.
///
/// The core only consumes mono buffers; hosts with multi-channel sources run
/// them through this before analysis.
pub fn downmix_mono(channels: &[&[f32]]) -> SineModelResult<Vec<f32>> {
    let Some(first) = channels.first() else {
        return Err(SineModelError::DimensionMismatch(
            "no channels to downmix".to_string(),
        ));
    };
    if channels.iter().any(|ch| ch.len() != first.len()) {
        return Err(SineModelError::DimensionMismatch(
            "channel lengths differ".to_string(),
        ));
    }

    let scale = 1.0 / channels.len() as f32;
    Ok((0..first.len())
        .map(|i| channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::sine_wave;
    use approx_eq::assert_approx_eq;
    use std::time::Duration;

    const SAMPLE_RATE: u32 = 44_100;

    fn db(amplitude: f32) -> f32 {
        20.0 * amplitude.log10()
    }

    #[test]
    fn test_pure_sine_recovers_one_partial() {
        let amplitude = 0.5;
        let signal = sine_wave(440.0, Duration::from_secs(1), SAMPLE_RATE, amplitude);
        let config = AnalysisConfig::default();

        let partials = analyze(&signal, SAMPLE_RATE, &config).unwrap();
        assert_eq!(partials.len(), 1);

        // Mean frequency within half a bin width, mean amplitude within 1 dB.
        let half_bin = SAMPLE_RATE as f32 / config.fft_size as f32 / 2.0;
        let partial = &partials[0];
        assert!((partial.mean_frequency() - 440.0).abs() < half_bin);
        assert!((partial.mean_amplitude() - db(amplitude)).abs() < 1.0);
    }

    #[test]
    fn test_two_tones_recover_two_partials() {
        let mut signal = sine_wave(440.0, Duration::from_secs(1), SAMPLE_RATE, 0.5);
        let second = sine_wave(1000.0, Duration::from_secs(1), SAMPLE_RATE, 0.25);
        for (a, b) in signal.iter_mut().zip(&second) {
            *a += *b;
        }

        let mut partials = analyze(&signal, SAMPLE_RATE, &AnalysisConfig::default()).unwrap();
        assert_eq!(partials.len(), 2);
        partials.sort_by(|a, b| a.mean_frequency().total_cmp(&b.mean_frequency()));
        assert!((partials[0].mean_frequency() - 440.0).abs() < 11.0);
        assert!((partials[1].mean_frequency() - 1000.0).abs() < 11.0);
        assert!((partials[0].mean_amplitude() - db(0.5)).abs() < 1.0);
        assert!((partials[1].mean_amplitude() - db(0.25)).abs() < 1.0);
    }

    #[test]
    fn test_progress_covers_both_stages() {
        let signal = sine_wave(440.0, Duration::from_secs(1), SAMPLE_RATE, 0.5);
        let mut spectral = 0usize;
        let mut tracking = 0usize;
        analyze_with_progress(&signal, SAMPLE_RATE, &AnalysisConfig::default(), |p| {
            match p.stage {
                AnalysisStage::Spectral => spectral += 1,
                AnalysisStage::Tracking => tracking += 1,
            }
        })
        .unwrap();
        assert!(spectral >= 1);
        assert!(tracking >= 1);
    }

    #[test]
    fn test_empty_and_short_signals_rejected() {
        let config = AnalysisConfig::default();
        assert!(matches!(
            analyze(&[], SAMPLE_RATE, &config),
            Err(SineModelError::DimensionMismatch(_))
        ));
        assert!(analyze(&vec![0.0; 100], SAMPLE_RATE, &config).is_err());
    }

    #[test]
    fn test_invalid_config_rejected_before_processing() {
        let signal = sine_wave(440.0, Duration::from_millis(100), SAMPLE_RATE, 0.5);
        let config = AnalysisConfig {
            fft_size: 1000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze(&signal, SAMPLE_RATE, &config),
            Err(SineModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_downmix_mono_averages_channels() {
        let left = [1.0f32, 0.0, -1.0];
        let right = [0.0f32, 1.0, -1.0];
        let mono = downmix_mono(&[&left, &right]).unwrap();
        assert_approx_eq!(mono[0] as f64, 0.5, 1e-6);
        assert_approx_eq!(mono[1] as f64, 0.5, 1e-6);
        assert_approx_eq!(mono[2] as f64, -1.0, 1e-6);
    }

    #[test]
    fn test_downmix_rejects_mismatched_channels() {
        let left = [1.0f32, 0.0];
        let right = [0.0f32];
        assert!(downmix_mono(&[&left, &right]).is_err());
        assert!(downmix_mono(&[]).is_err());
    }
}
