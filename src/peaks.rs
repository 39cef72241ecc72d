//! Per-frame peak extraction with parabolic refinement.
//!
//! Raw bin resolution (`sample_rate / fft_size`) is far too coarse for
//! musically useful pitch accuracy, so every candidate bin is refined with a
//! three-point parabolic fit before it becomes a [`Peak`]. The fit runs on
//! linear magnitudes, which is more stable here than fitting in dB.

use crate::config::AnalysisConfig;
use crate::model::Peak;

/// Hard cap on peaks kept per frame.
pub const MAX_PEAKS_PER_FRAME: usize = 100;

/// Magnitudes are floored at this value before conversion to dB.
const AMPLITUDE_FLOOR: f32 = 1e-10;

/// Parabolic (three-point) interpolation around a local maximum.
///
/// Fits `p = 0.5 * (alpha - gamma) / (alpha - 2*beta + gamma)` and evaluates
/// the parabola's value at the refined position. The fit is only trusted when
/// the denominator describes a numerically concave peak (`< -1e-10`);
/// otherwise the offset is zero and the center magnitude is kept.
///
/// Returns `(offset, refined)` with `offset` clamped to `[-0.5, 0.5]`.
pub fn interpolate_peak(alpha: f32, beta: f32, gamma: f32) -> (f32, f32) {
    let denom = alpha - 2.0 * beta + gamma;
    let mut offset = 0.0;
    if denom < -1e-10 {
        offset = (0.5 * (alpha - gamma) / denom).clamp(-0.5, 0.5);
    }
    let refined = beta - 0.25 * (alpha - gamma) * offset;
    (offset, refined)
}

/// Extracts refined peaks from a magnitude spectrum.
///
/// A bin is a candidate when it strictly exceeds its four ±2 neighbors and
/// the configured amplitude floor. Candidates are refined, converted to dB,
/// filtered to `[freq_min_hz, freq_max_hz]`, ordered by descending amplitude,
/// and capped at [`MAX_PEAKS_PER_FRAME`].
///
/// `calibration` maps raw magnitudes to sinusoid amplitude (see
/// [`crate::spectrum::SpectrumAnalyzer::sinusoid_calibration`]); pass 1.0 for
/// an uncalibrated spectrum. The floor is configured in calibrated dB, so the
/// gate is applied in the same units.
pub fn extract_peaks(
    spectrum: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
    calibration: f32,
) -> Vec<Peak> {
    let mut peaks = Vec::new();
    if spectrum.len() < 5 {
        return peaks;
    }

    let bin_width = sample_rate as f32 / (spectrum.len() * 2) as f32;
    let floor_linear = 10f32.powf(config.min_amplitude_db / 20.0) / calibration;

    for i in 2..spectrum.len() - 2 {
        let mag = spectrum[i];
        if mag > floor_linear
            && mag > spectrum[i - 1]
            && mag > spectrum[i + 1]
            && mag > spectrum[i - 2]
            && mag > spectrum[i + 2]
        {
            let (offset, refined) = interpolate_peak(spectrum[i - 1], mag, spectrum[i + 1]);
            let freq = (i as f32 + offset) * bin_width;
            let amplitude = 20.0 * (refined * calibration).max(AMPLITUDE_FLOOR).log10();

            if freq >= config.freq_min_hz && freq <= config.freq_max_hz {
                peaks.push(Peak { freq, amplitude });
            }
        }
    }

    peaks.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));
    peaks.truncate(MAX_PEAKS_PER_FRAME);
    peaks
}
