//! Core data model: frames, peaks, partials, and the noise envelope.
//!
//! Partials and the noise envelope are the persistent outputs of analysis and
//! serialize to plain records; how they are stored (JSON project files, etc.)
//! is the host's business. Frames only live inside one analysis pass.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Lowest band center used by the noise model, in Hz.
pub const NOISE_BAND_FLOOR_HZ: f32 = 20.0;

/// A refined spectral peak: a candidate sinusoidal component in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Frequency in Hz, refined by parabolic interpolation.
    pub freq: f32,
    /// Amplitude in dB.
    pub amplitude: f32,
}

/// One windowed analysis slice and its extracted peaks.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame start time in seconds.
    pub time: f32,
    /// Peaks ordered by descending amplitude.
    pub peaks: Vec<Peak>,
}

/// A single breakpoint of a partial trajectory. Invariant: `freq > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Time in seconds.
    pub time: f32,
    /// Frequency in Hz.
    pub freq: f32,
    /// Amplitude in dB.
    pub amplitude: f32,
}

/// A tracked sinusoidal trajectory: a time-ordered sequence of points.
///
/// Points are non-decreasing in time. A partial with fewer than two points is
/// transient and is never persisted by the tracker. The id is the only stable
/// handle across edits; the core never holds references into the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    /// Unique id within one partial collection.
    pub id: u64,
    /// Trajectory breakpoints, ordered by time.
    pub points: Vec<Point>,
}

impl Partial {
    /// Creates an empty partial with the given id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            points: Vec::new(),
        }
    }

    /// Time of the first point, if any.
    pub fn start_time(&self) -> Option<f32> {
        self.points.first().map(|p| p.time)
    }

    /// Time of the last point, if any.
    pub fn end_time(&self) -> Option<f32> {
        self.points.last().map(|p| p.time)
    }

    /// Trajectory duration in seconds; zero for transient partials.
    pub fn duration(&self) -> f32 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => end - start,
            _ => 0.0,
        }
    }

    /// Arithmetic mean of the point frequencies; zero when empty.
    pub fn mean_frequency(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.freq).sum::<f32>() / self.points.len() as f32
    }

    /// Arithmetic mean of the point amplitudes in dB; zero when empty.
    pub fn mean_amplitude(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.amplitude).sum::<f32>() / self.points.len() as f32
    }

    /// True when the partial has fewer than two points.
    pub fn is_transient(&self) -> bool {
        self.points.len() < 2
    }

    /// Restores the by-time point ordering after a geometry edit.
    pub fn sort_points_by_time(&mut self) {
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}

/// Time-varying band energies of the noise residual.
///
/// One row per residual-analysis hop, one column per log-spaced band. The
/// analysis parameters travel with the matrix: all four are needed to
/// reinterpret the envelope at synthesis time, and the envelope is only
/// meaningful as a whole. It becomes stale when the partial set it was
/// derived from changes materially; staleness degrades quality, not
/// correctness, so the host decides when to re-analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseEnvelope {
    /// Sample rate of the analyzed signal, in Hz.
    pub sample_rate: u32,
    /// Residual analysis frame length in samples.
    pub fft_size: usize,
    /// Sample advance between residual frames.
    pub hop_size: usize,
    /// Number of log-spaced bands per frame.
    pub num_bands: usize,
    /// Band energies (linear magnitude), shape `(frames, bands)`.
    pub bands: Array2<f32>,
}

impl NoiseEnvelope {
    /// Number of residual frames.
    pub fn num_frames(&self) -> usize {
        self.bands.nrows()
    }

    /// The band energies of one frame.
    pub fn band_frame(&self, frame: usize) -> ArrayView1<'_, f32> {
        self.bands.row(frame)
    }

    /// Duration of one frame hop in seconds.
    pub fn frame_duration(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate as f32
    }

    /// Total envelope duration in seconds.
    pub fn duration(&self) -> f32 {
        self.num_frames() as f32 * self.frame_duration()
    }

    /// The band center frequencies this envelope was analyzed at.
    pub fn band_centers(&self) -> Vec<f32> {
        band_center_frequencies(self.num_bands, self.sample_rate as f32 / 2.0)
    }
}

/// Log-spaced band center frequencies from 20 Hz up to `nyquist`.
///
/// Centers are the geometric midpoints of the log-spaced band edges:
/// `20 * (nyquist/20)^((b + 0.5) / num_bands)`. Analysis and synthesis share
/// this single definition.
pub fn band_center_frequencies(num_bands: usize, nyquist: f32) -> Vec<f32> {
    (0..num_bands)
        .map(|b| {
            NOISE_BAND_FLOOR_HZ
                * (nyquist / NOISE_BAND_FLOOR_HZ).powf((b as f32 + 0.5) / num_bands as f32)
        })
        .collect()
}

/// Min/max point time across the given partials, if any points exist.
pub(crate) fn time_bounds(partials: &[Partial]) -> Option<(f32, f32)> {
    let mut bounds: Option<(f32, f32)> = None;
    for point in partials.iter().flat_map(|p| &p.points) {
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(point.time), max.max(point.time)),
            None => (point.time, point.time),
        });
    }
    bounds
}

/// Min/max point frequency across the given partials, if any points exist.
pub(crate) fn freq_bounds(partials: &[Partial]) -> Option<(f32, f32)> {
    let mut bounds: Option<(f32, f32)> = None;
    for point in partials.iter().flat_map(|p| &p.points) {
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(point.freq), max.max(point.freq)),
            None => (point.freq, point.freq),
        });
    }
    bounds
}
