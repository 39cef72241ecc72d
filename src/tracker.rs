//! Frame-to-frame partial tracking.
//!
//! Links per-frame peaks into continuous trajectories. Candidate links are
//! scored against both the last observed frequency and a damped prediction,
//! collected under a tolerance, sorted by cost, and assigned greedily with
//! one-to-one exclusivity on both sides: a cheap stand-in for an optimal
//! bipartite matching that avoids the trajectory swaps plain nearest-neighbor
//! linking produces when partials cross.

use crate::config::AnalysisConfig;
use crate::error::SineModelResult;
use crate::model::{Frame, Partial, Point};

/// Weight of the distance to the last observed frequency.
const DIRECT_WEIGHT: f32 = 0.7;
/// Weight of the distance to the predicted frequency.
const PREDICTED_WEIGHT: f32 = 0.3;
/// Damping applied to the frequency velocity when extrapolating.
const VELOCITY_DAMPING: f32 = 0.5;
/// Progress is reported every this many frames.
pub const TRACKER_PROGRESS_INTERVAL: usize = 200;

/// Progress snapshot emitted while tracking.
#[derive(Debug, Clone, Copy)]
pub struct TrackerProgress {
    /// Frames processed so far.
    pub frames_done: usize,
    /// Total frames in this pass.
    pub frames_total: usize,
    /// Trajectories currently active.
    pub active_partials: usize,
}

struct Candidate {
    partial_idx: usize,
    peak_idx: usize,
    cost: f32,
}

/// Tracks partials across the given frames.
///
/// See [`track_partials_with_progress`] for the algorithm; this variant skips
/// progress reporting.
pub fn track_partials(
    frames: &[Frame],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> SineModelResult<Vec<Partial>> {
    track_partials_with_progress(frames, sample_rate, config, |_| {})
}

/// Tracks partials across the given frames, reporting progress every
/// [`TRACKER_PROGRESS_INTERVAL`] frames.
///
/// Per frame, each active partial predicts its next frequency by damped
/// linear extrapolation (which anticipates vibrato without overshooting) and
/// every (partial, peak) pair below the frequency tolerance becomes a
/// candidate link with cost
/// `0.7 * |peak - last| + 0.3 * |peak - predicted|`. Candidates are assigned
/// greedily in ascending cost order. Unmatched partials end on that frame and
/// are kept only if they carry at least two points; unmatched peaks start new
/// trajectories.
///
/// Post-processing drops partials shorter than the configured minimum
/// duration, keeps the highest-mean-amplitude partials when the count cap is
/// exceeded, and renumbers ids densely in final order.
///
/// The progress callback is cooperative-scheduling support for a host UI
/// thread; invoking it has no effect on the result.
pub fn track_partials_with_progress(
    frames: &[Frame],
    sample_rate: u32,
    config: &AnalysisConfig,
    mut on_progress: impl FnMut(TrackerProgress),
) -> SineModelResult<Vec<Partial>> {
    config.validate()?;

    let mut finished: Vec<Partial> = Vec::new();
    let mut active: Vec<Partial> = Vec::new();
    let mut next_id: u64 = 0;

    for (frame_idx, frame) in frames.iter().enumerate() {
        let mut candidates: Vec<Candidate> = Vec::new();
        for (partial_idx, partial) in active.iter().enumerate() {
            let Some(last) = partial.points.last().copied() else {
                continue;
            };
            let predicted = if partial.points.len() >= 2 {
                let prev = partial.points[partial.points.len() - 2];
                last.freq + (last.freq - prev.freq) * VELOCITY_DAMPING
            } else {
                last.freq
            };

            for (peak_idx, peak) in frame.peaks.iter().enumerate() {
                let cost = DIRECT_WEIGHT * (peak.freq - last.freq).abs()
                    + PREDICTED_WEIGHT * (peak.freq - predicted).abs();
                if cost < config.freq_tolerance_hz {
                    candidates.push(Candidate {
                        partial_idx,
                        peak_idx,
                        cost,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));

        let mut peak_used = vec![false; frame.peaks.len()];
        let mut partial_matched = vec![false; active.len()];
        for candidate in &candidates {
            if partial_matched[candidate.partial_idx] || peak_used[candidate.peak_idx] {
                continue;
            }
            let peak = frame.peaks[candidate.peak_idx];
            active[candidate.partial_idx].points.push(Point {
                time: frame.time,
                freq: peak.freq,
                amplitude: peak.amplitude,
            });
            partial_matched[candidate.partial_idx] = true;
            peak_used[candidate.peak_idx] = true;
        }

        // Unmatched partials end on this frame; single-point trajectories are
        // transient and discarded.
        for idx in (0..active.len()).rev() {
            if !partial_matched[idx] {
                let partial = active.remove(idx);
                if !partial.is_transient() {
                    finished.push(partial);
                }
            }
        }

        // Unclaimed peaks begin new trajectories.
        for (peak_idx, peak) in frame.peaks.iter().enumerate() {
            if peak_used[peak_idx] {
                continue;
            }
            active.push(Partial {
                id: next_id,
                points: vec![Point {
                    time: frame.time,
                    freq: peak.freq,
                    amplitude: peak.amplitude,
                }],
            });
            next_id += 1;
        }

        if frame_idx % TRACKER_PROGRESS_INTERVAL == 0 {
            on_progress(TrackerProgress {
                frames_done: frame_idx,
                frames_total: frames.len(),
                active_partials: active.len(),
            });
        }
    }

    for partial in active {
        if !partial.is_transient() {
            finished.push(partial);
        }
    }

    // Minimum duration, converted to a point count via the hop rate.
    let min_points = ((config.min_duration_ms / 1000.0) * sample_rate as f32
        / config.hop_size as f32)
        .ceil() as usize;
    finished.retain(|p| p.points.len() >= min_points);

    // Over the cap, the strongest partials win.
    if finished.len() > config.max_partials {
        finished.sort_by(|a, b| b.mean_amplitude().total_cmp(&a.mean_amplitude()));
        finished.truncate(config.max_partials);
    }

    for (idx, partial) in finished.iter_mut().enumerate() {
        partial.id = idx as u64;
    }

    tracing::debug!(
        partials = finished.len(),
        frames = frames.len(),
        "partial tracking complete"
    );
    Ok(finished)
}
