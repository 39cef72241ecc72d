//! Phase-continuous additive synthesis.
//!
//! Each partial is rendered by walking its points pairwise, interpolating
//! frequency and dB amplitude linearly per sample and integrating phase
//! sample by sample. Phase, not frequency, is the accumulated quantity: that
//! keeps the waveform continuous across frequency and amplitude changes and
//! is what makes the output click-free. The same fold renders the unity-gain
//! reconstruction the residual model subtracts from the original signal.
//!
//! Time stretching happens in exactly one place: the mapping from output
//! sample index to source time is divided by the playback rate, while every
//! stored frequency is used unscaled.

use std::f64::consts::{PI, TAU};

use rand::Rng;

use crate::config::SynthesisConfig;
use crate::error::SineModelResult;
use crate::model::{NoiseEnvelope, Partial};

/// Linear headroom applied to every partial before mixing.
const PARTIAL_HEADROOM: f64 = 0.1;
/// Length of the half-cosine attack/release ramp at a partial's edges.
const EDGE_RAMP_SECS: f64 = 0.005;
/// Output is peak-normalized to this level when any energy is present.
const NORMALIZE_PEAK: f32 = 0.9;
/// Per-sample phase jitter bound for band-limited noise, in radians.
const NOISE_JITTER: f64 = 0.25;
/// Per-sample band phase drift bound, in radians.
const NOISE_DRIFT: f64 = 0.05;

/// How the shared sinusoidal fold is parameterized by its two callers.
pub(crate) struct RenderOptions {
    /// Output-time divisor: 0.5 renders at half speed.
    pub playback_rate: f64,
    /// Linear gain applied after dB conversion.
    pub headroom: f64,
    /// Whether to shape partial edges with the 5 ms half-cosine ramp.
    pub edge_ramp: bool,
}

impl RenderOptions {
    /// Unity-gain, unramped, rate-1 rendering; used when subtracting the
    /// sinusoidal part from the original signal.
    pub fn reconstruction() -> Self {
        Self {
            playback_rate: 1.0,
            headroom: 1.0,
            edge_ramp: false,
        }
    }
}

/// Renders every partial into `out`, accumulating into existing content.
///
/// Within each point pair, frequency and dB amplitude advance linearly per
/// sample while phase accumulates `freq * 2π / sample_rate`, wrapped modulo
/// 2π for numerical stability. When flooring produces a gap between
/// consecutive segments, phase still advances through the gap at the boundary
/// frequency so the partial stays continuous where it resumes.
pub(crate) fn render_sinusoids_into(
    out: &mut [f32],
    partials: &[Partial],
    sample_rate: u32,
    opts: &RenderOptions,
) {
    let sr = sample_rate as f64;
    let two_pi_over_sr = TAU / sr;
    let ramp_samples = if opts.edge_ramp {
        (sr * EDGE_RAMP_SECS).floor() as i64
    } else {
        0
    };
    let out_len = out.len() as i64;

    for partial in partials {
        if partial.is_transient() {
            continue;
        }
        let to_sample = |time: f32| (time as f64 / opts.playback_rate * sr).floor() as i64;
        let partial_start = to_sample(partial.points[0].time);
        let partial_end = to_sample(partial.points[partial.points.len() - 1].time);

        let mut phase: f64 = 0.0;
        let mut prev_end: i64 = -1;

        for pair in partial.points.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            let start = to_sample(p1.time);
            let end = to_sample(p2.time);

            if prev_end >= 0 && start > prev_end {
                phase += (start - prev_end) as f64 * p1.freq as f64 * two_pi_over_sr;
            }

            let segment_len = end - start;
            if segment_len <= 0 {
                continue;
            }

            let freq_step = (p2.freq - p1.freq) as f64 / segment_len as f64;
            let amp_db_step = (p2.amplitude - p1.amplitude) as f64 / segment_len as f64;
            let mut freq = p1.freq as f64;
            let mut amp_db = p1.amplitude as f64;

            let mut s = start;
            while s < end && s < out_len {
                if s >= 0 {
                    let mut amp = 10f64.powf(amp_db / 20.0) * opts.headroom;
                    if ramp_samples > 0 {
                        let into = s - partial_start;
                        let remaining = partial_end - s;
                        if into >= 0 && into < ramp_samples {
                            let t = into as f64 / ramp_samples as f64;
                            amp *= 0.5 * (1.0 - (PI * t).cos());
                        }
                        if remaining >= 0 && remaining < ramp_samples {
                            let t = remaining as f64 / ramp_samples as f64;
                            amp *= 0.5 * (1.0 - (PI * t).cos());
                        }
                    }
                    out[s as usize] += (amp * phase.sin()) as f32;
                }

                phase += freq * two_pi_over_sr;
                if phase > TAU {
                    phase %= TAU;
                }
                freq += freq_step;
                amp_db += amp_db_step;
                s += 1;
            }

            prev_end = end;
        }
    }
}

/// Renders the band-limited noise model into `out`.
///
/// Per output sample, the enclosing envelope frame pair is located in source
/// time and band energies are interpolated linearly between them. Each band
/// contributes an oscillator at its center frequency whose phase carries a
/// stable random offset plus small per-sample jitter and a slow random
/// drift: band-limited noise without stored noise samples.
pub(crate) fn render_noise_into(
    out: &mut [f32],
    envelope: &NoiseEnvelope,
    sample_rate: u32,
    playback_rate: f64,
    mix: f32,
) {
    let num_frames = envelope.num_frames();
    if num_frames == 0 || envelope.num_bands == 0 || mix <= 0.0 {
        return;
    }

    let sr = sample_rate as f64;
    let frame_duration = envelope.hop_size as f64 / envelope.sample_rate as f64;
    let centers = envelope.band_centers();
    let mut rng = rand::rng();
    let mut band_phases: Vec<f64> = (0..envelope.num_bands)
        .map(|_| rng.random_range(0.0..TAU))
        .collect();

    for (i, sample) in out.iter_mut().enumerate() {
        let source_time = i as f64 / sr * playback_rate;
        let frame_pos = source_time / frame_duration;
        let frame_idx = frame_pos.floor() as usize;
        if frame_idx >= num_frames {
            continue;
        }
        let frac = frame_pos - frame_idx as f64;

        let row = envelope.bands.row(frame_idx);
        let next = envelope.bands.row((frame_idx + 1).min(num_frames - 1));

        let mut noise = 0.0f64;
        for (band, &center) in centers.iter().enumerate() {
            let amp = row[band] as f64 * (1.0 - frac) + next[band] as f64 * frac;
            let phase = band_phases[band] + source_time * center as f64 * TAU;
            let jitter = rng.random_range(-NOISE_JITTER..NOISE_JITTER);
            noise += amp * (phase + jitter).sin();
            band_phases[band] += rng.random_range(-NOISE_DRIFT..NOISE_DRIFT);
        }
        *sample += (noise * mix as f64) as f32;
    }
}

/// Synthesizes the partial set, optionally blended with the noise model, into
/// a mono buffer.
///
/// The output covers `duration / playback_rate` seconds, where the source
/// duration defaults to the later of the last partial point and the noise
/// envelope's end. Frequencies are never scaled: a playback rate of 0.5
/// doubles the duration at unchanged pitch. The buffer is peak-normalized to
/// 0.9 when any energy is present.
///
/// # Examples
///
/// ```rust
/// use sinemodel::{synthesize, Partial, Point, SynthesisConfig};
///
/// let partial = Partial {
///     id: 0,
///     points: vec![
///         Point { time: 0.0, freq: 440.0, amplitude: -10.0 },
///         Point { time: 1.0, freq: 440.0, amplitude: -10.0 },
///     ],
/// };
/// let out = synthesize(&[partial], None, &SynthesisConfig::default()).unwrap();
/// assert_eq!(out.len(), 44_100);
/// ```
pub fn synthesize(
    partials: &[Partial],
    noise: Option<&NoiseEnvelope>,
    config: &SynthesisConfig,
) -> SineModelResult<Vec<f32>> {
    config.validate()?;

    let source_duration = match config.duration_secs {
        Some(duration) => duration,
        None => {
            let partial_end = partials
                .iter()
                .filter_map(|p| p.end_time())
                .fold(0.0f32, f32::max);
            let noise_end = noise.map_or(0.0, |env| env.duration());
            partial_end.max(noise_end)
        }
    };

    let rate = config.playback_rate as f64;
    let num_samples =
        (source_duration as f64 / rate * config.sample_rate as f64).floor() as usize;
    let mut out = vec![0.0f32; num_samples];

    render_sinusoids_into(
        &mut out,
        partials,
        config.sample_rate,
        &RenderOptions {
            playback_rate: rate,
            headroom: PARTIAL_HEADROOM,
            edge_ramp: true,
        },
    );

    if let Some(envelope) = noise {
        render_noise_into(&mut out, envelope, config.sample_rate, rate, config.noise_mix);
    }

    let peak = out.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    if peak > 0.0 {
        let scale = NORMALIZE_PEAK / peak;
        for sample in &mut out {
            *sample *= scale;
        }
    }

    tracing::debug!(
        samples = out.len(),
        rate = config.playback_rate,
        "synthesis complete"
    );
    Ok(out)
}
