//! Windowed spectral analysis primitives.
//!
//! This module owns window generation, the per-frame magnitude spectrum, and
//! the single-frequency DFT probe used by the noise residual model. The FFT
//! itself is RustFFT's forward transform; this module adds power-of-two
//! validation, windowing, and magnitude normalization on top.

use std::f32::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::WindowType;
use crate::error::{SineModelError, SineModelResult};

/// Generates a window kernel of the given size.
///
/// The kernels follow the usual closed forms over `x = i / (size - 1)`:
///
/// - Hann: `0.5 * (1 - cos(2πx))`
/// - Hamming: `0.54 - 0.46 * cos(2πx)`
/// - Blackman: `0.42 - 0.5 * cos(2πx) + 0.08 * cos(4πx)`
pub fn generate_window(size: usize, window_type: WindowType) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let x = i as f32 / denom;
            match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                WindowType::Blackman => {
                    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                }
            }
        })
        .collect()
}

/// Computes magnitude spectra of fixed-size frames.
///
/// Holds the FFT plan and window kernel so a frame loop pays the planning
/// cost once. The analyzer has no mutable state; `magnitudes` is a pure
/// function of the frame.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_size: usize,
    calibration: f32,
}

impl SpectrumAnalyzer {
    /// Creates an analyzer for frames of `fft_size` samples.
    ///
    /// Fails with [`SineModelError::InvalidParameter`] unless `fft_size` is a
    /// power of two.
    pub fn new(fft_size: usize, window_type: WindowType) -> SineModelResult<Self> {
        if fft_size == 0 || !fft_size.is_power_of_two() {
            return Err(SineModelError::InvalidParameter(format!(
                "fft_size must be a power of two, got {fft_size}"
            )));
        }
        let window = generate_window(fft_size, window_type);
        let window_sum: f32 = window.iter().sum();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Ok(Self {
            fft,
            window,
            fft_size,
            calibration: 2.0 * fft_size as f32 / window_sum,
        })
    }

    /// The frame length this analyzer was built for.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// The window kernel applied to each frame.
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Factor mapping a magnitude bin to the amplitude of the sinusoid that
    /// produced it.
    ///
    /// Compensates the window's coherent gain and the split between positive
    /// and negative frequency bins, so `magnitude * calibration` reads in the
    /// same linear units as the input samples.
    pub fn sinusoid_calibration(&self) -> f32 {
        self.calibration
    }

    /// Magnitude spectrum of one frame: `fft_size / 2` non-negative values
    /// covering 0..Nyquist, normalized by the FFT size.
    ///
    /// Fails with [`SineModelError::DimensionMismatch`] when the frame length
    /// does not match the configured FFT size.
    pub fn magnitudes(&self, frame: &[f32]) -> SineModelResult<Vec<f32>> {
        if frame.len() != self.fft_size {
            return Err(SineModelError::DimensionMismatch(format!(
                "frame length {} does not match fft_size {}",
                frame.len(),
                self.fft_size
            )));
        }

        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size as f32;
        Ok(buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm() * scale)
            .collect())
    }
}

/// One-shot magnitude spectrum of a power-of-two frame.
pub fn magnitude_spectrum(frame: &[f32], window_type: WindowType) -> SineModelResult<Vec<f32>> {
    SpectrumAnalyzer::new(frame.len(), window_type)?.magnitudes(frame)
}

/// Magnitude of a single-frequency DFT over `frame`, normalized by the frame
/// length.
///
/// A Goertzel-style probe: the residual model needs energy at a handful of
/// band centers per frame, not a full spectrum. Accumulates in f64 so long
/// frames don't lose precision.
pub fn single_bin_magnitude(frame: &[f32], freq_hz: f32, sample_rate: u32) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let omega = std::f64::consts::TAU * freq_hz as f64 / sample_rate as f64;
    let mut re = 0.0f64;
    let mut im = 0.0f64;
    for (i, &sample) in frame.iter().enumerate() {
        let angle = omega * i as f64;
        re += sample as f64 * angle.cos();
        im += sample as f64 * angle.sin();
    }
    ((re * re + im * im).sqrt() / frame.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::sine_wave;
    use approx_eq::assert_approx_eq;
    use std::time::Duration;

    #[test]
    fn test_window_endpoints() {
        let hann = generate_window(512, WindowType::Hann);
        assert_approx_eq!(hann[0] as f64, 0.0, 1e-6);
        assert_approx_eq!(hann[511] as f64, 0.0, 1e-6);
        assert_approx_eq!(hann[255] as f64, 1.0, 1e-4);

        let hamming = generate_window(512, WindowType::Hamming);
        assert_approx_eq!(hamming[0] as f64, 0.08, 1e-6);

        let blackman = generate_window(512, WindowType::Blackman);
        assert_approx_eq!(blackman[0] as f64, 0.0, 1e-6);
    }

    #[test]
    fn test_fft_size_must_be_power_of_two() {
        assert!(SpectrumAnalyzer::new(1000, WindowType::Hann).is_err());
        assert!(SpectrumAnalyzer::new(0, WindowType::Hann).is_err());
        assert!(SpectrumAnalyzer::new(1024, WindowType::Hann).is_ok());
    }

    #[test]
    fn test_frame_length_mismatch_rejected() {
        let analyzer = SpectrumAnalyzer::new(1024, WindowType::Hann).unwrap();
        assert!(analyzer.magnitudes(&vec![0.0; 512]).is_err());
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sample_rate = 44_100;
        let fft_size = 1024;
        // Bin-centered frequency so the peak lands on a single bin.
        let freq = 64.0 * sample_rate as f32 / fft_size as f32;
        let signal = sine_wave(freq, Duration::from_secs(1), sample_rate, 0.8);

        let analyzer = SpectrumAnalyzer::new(fft_size, WindowType::Hann).unwrap();
        let mags = analyzer.magnitudes(&signal[..fft_size]).unwrap();
        assert_eq!(mags.len(), fft_size / 2);

        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 64);

        // The calibrated magnitude reads back the sinusoid amplitude.
        let recovered = mags[peak_bin] * analyzer.sinusoid_calibration();
        assert_approx_eq!(recovered as f64, 0.8, 0.02);
    }

    #[test]
    fn test_single_bin_magnitude_recovers_sine_level() {
        let sample_rate = 44_100;
        let signal = sine_wave(997.0, Duration::from_secs(1), sample_rate, 0.8);
        let mag = single_bin_magnitude(&signal[..2048], 997.0, sample_rate);
        // An unwindowed probe at the signal frequency reads amplitude / 2.
        assert_approx_eq!(mag as f64, 0.4, 0.01);
    }

    #[test]
    fn test_single_bin_magnitude_empty_frame() {
        assert_eq!(single_bin_magnitude(&[], 440.0, 44_100), 0.0);
    }
}
