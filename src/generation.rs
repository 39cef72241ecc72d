//! Signal generation utilities.
//!
//! Small generators used by the test suite and handy for callers building
//! fixtures or probing the analysis chain with known material.

use std::time::Duration;

use rand::Rng;

fn sample_count(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Generates a sine wave of the given frequency and linear amplitude.
pub fn sine_wave(frequency: f32, duration: Duration, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let step = std::f64::consts::TAU * frequency as f64 / sample_rate as f64;
    (0..sample_count(duration, sample_rate))
        .map(|i| (amplitude as f64 * (step * i as f64).sin()) as f32)
        .collect()
}

/// Generates uniform white noise in `[-amplitude, amplitude]`.
pub fn white_noise(duration: Duration, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..sample_count(duration, sample_rate))
        .map(|_| rng.random_range(-amplitude..=amplitude))
        .collect()
}
