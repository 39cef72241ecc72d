//! Noise residual modeling.
//!
//! Whatever the partial set does not explain (breath, bow noise, transients
//! smeared below the peak floor) survives in the residual. This module
//! subtracts a unity-gain sinusoidal reconstruction from the original signal
//! and summarizes the remainder as per-frame energies in log-spaced bands,
//! compact enough to travel with the partial set and matched to the band
//! synthesis on the other side.

use ndarray::Array2;

use crate::config::{NoiseConfig, WindowType};
use crate::error::{SineModelError, SineModelResult};
use crate::model::{band_center_frequencies, NoiseEnvelope, Partial};
use crate::spectrum::{generate_window, single_bin_magnitude};
use crate::synth::{render_sinusoids_into, RenderOptions};

/// RMS values are floored at this value before conversion to dB.
const RMS_FLOOR: f32 = 1e-10;

/// Result of residual analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseAnalysis {
    /// The band-energy envelope of the residual.
    pub envelope: NoiseEnvelope,
    /// Total residual RMS in dB, for diagnostics.
    pub residual_rms_db: f32,
}

/// Models the noise residual of `samples` against the given partial set.
///
/// The partials are rendered at unity gain with accumulated phase and
/// subtracted sample by sample; the residual then runs through a fixed
/// Hann-windowed STFT, and each frame's energy in every log-spaced band is
/// estimated with a single-frequency DFT at the band center rather than a
/// full spectrum. Band energies are scaled so that a flat residual
/// reconstructs at matched power through the band oscillators.
///
/// The envelope is derived from this exact partial set; if the set changes
/// materially the envelope goes stale and should be discarded or re-analyzed
/// (staleness degrades quality, not correctness).
pub fn analyze_residual(
    samples: &[f32],
    sample_rate: u32,
    partials: &[Partial],
    config: &NoiseConfig,
) -> SineModelResult<NoiseAnalysis> {
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

    let mut reconstruction = vec![0.0f32; samples.len()];
    render_sinusoids_into(
        &mut reconstruction,
        partials,
        sample_rate,
        &RenderOptions::reconstruction(),
    );

    let residual: Vec<f32> = samples
        .iter()
        .zip(&reconstruction)
        .map(|(&original, &modeled)| original - modeled)
        .collect();

    let rms = (residual.iter().map(|&x| (x as f64).powi(2)).sum::<f64>()
        / residual.len() as f64)
        .sqrt() as f32;
    let residual_rms_db = 20.0 * rms.max(RMS_FLOOR).log10();

    let window = generate_window(config.fft_size, WindowType::Hann);
    let window_sq_sum: f64 = window.iter().map(|&w| (w as f64).powi(2)).sum();
    // Scales a center-frequency magnitude so the band oscillators carry the
    // windowed frame's energy: flat residual in, matched power out.
    let calibration = (config.fft_size as f64
        * (2.0 / (config.num_bands as f64 * window_sq_sum)).sqrt()) as f32;

    let num_frames = (samples.len() - config.fft_size) / config.hop_size + 1;
    let centers = band_center_frequencies(config.num_bands, sample_rate as f32 / 2.0);

    let mut bands = Array2::zeros((num_frames, config.num_bands));
    let mut frame_buf = vec![0.0f32; config.fft_size];
    for frame_idx in 0..num_frames {
        let start = frame_idx * config.hop_size;
        for (dst, (&sample, &w)) in frame_buf
            .iter_mut()
            .zip(residual[start..start + config.fft_size].iter().zip(&window))
        {
            *dst = sample * w;
        }
        for (band, &center) in centers.iter().enumerate() {
            bands[[frame_idx, band]] =
                single_bin_magnitude(&frame_buf, center, sample_rate) * calibration;
        }
    }

    tracing::debug!(
        frames = num_frames,
        bands = config.num_bands,
        residual_rms_db,
        "residual analysis complete"
    );

    Ok(NoiseAnalysis {
        envelope: NoiseEnvelope {
            sample_rate,
            fft_size: config.fft_size,
            hop_size: config.hop_size,
            num_bands: config.num_bands,
            bands,
        },
        residual_rms_db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{sine_wave, white_noise};
    use crate::model::Point;
    use crate::synth::render_noise_into;
    use std::time::Duration;

    const SAMPLE_RATE: u32 = 44_100;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|&x| (x as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
            as f32
    }

    #[test]
    fn test_envelope_carries_analysis_parameters() {
        let signal = sine_wave(440.0, Duration::from_secs(1), SAMPLE_RATE, 0.5);
        let config = NoiseConfig::default();
        let analysis = analyze_residual(&signal, SAMPLE_RATE, &[], &config).unwrap();

        let envelope = &analysis.envelope;
        assert_eq!(envelope.sample_rate, SAMPLE_RATE);
        assert_eq!(envelope.fft_size, 2048);
        assert_eq!(envelope.hop_size, 512);
        assert_eq!(envelope.num_bands, 64);
        let expected_frames = (signal.len() - 2048) / 512 + 1;
        assert_eq!(envelope.num_frames(), expected_frames);
    }

    #[test]
    fn test_exact_reconstruction_leaves_silence() {
        // Feeding the reconstruction itself as the signal must cancel.
        let partial = Partial {
            id: 0,
            points: vec![
                Point {
                    time: 0.0,
                    freq: 440.0,
                    amplitude: -10.0,
                },
                Point {
                    time: 1.0,
                    freq: 440.0,
                    amplitude: -10.0,
                },
            ],
        };
        let mut signal = vec![0.0f32; SAMPLE_RATE as usize];
        render_sinusoids_into(
            &mut signal,
            std::slice::from_ref(&partial),
            SAMPLE_RATE,
            &RenderOptions::reconstruction(),
        );

        let analysis =
            analyze_residual(&signal, SAMPLE_RATE, &[partial], &NoiseConfig::default()).unwrap();
        assert!(analysis.residual_rms_db < -100.0);
    }

    #[test]
    fn test_white_noise_envelope_reconstructs_matched_rms() {
        // With no partials the residual is the signal itself; the envelope's
        // band synthesis must land within 3 dB of its RMS.
        let signal = white_noise(Duration::from_secs(1), SAMPLE_RATE, 0.3);
        let analysis =
            analyze_residual(&signal, SAMPLE_RATE, &[], &NoiseConfig::default()).unwrap();

        let samples = (analysis.envelope.duration() * SAMPLE_RATE as f32) as usize;
        let mut reconstruction = vec![0.0f32; samples];
        render_noise_into(
            &mut reconstruction,
            &analysis.envelope,
            SAMPLE_RATE,
            1.0,
            1.0,
        );

        let reconstructed_db = 20.0 * rms(&reconstruction).log10();
        let error_db = reconstructed_db - analysis.residual_rms_db;
        assert!(
            error_db.abs() < 3.0,
            "reconstruction off by {error_db} dB (residual {} dB, rebuilt {} dB)",
            analysis.residual_rms_db,
            reconstructed_db
        );
    }

    #[test]
    fn test_rejects_short_signal() {
        let config = NoiseConfig::default();
        assert!(matches!(
            analyze_residual(&[0.0; 100], SAMPLE_RATE, &[], &config),
            Err(SineModelError::DimensionMismatch(_))
        ));
        assert!(analyze_residual(&[], SAMPLE_RATE, &[], &config).is_err());
    }
}
