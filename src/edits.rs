//! Editing transforms over partial collections.
//!
//! Every operation here is a pure data transform over the caller's selection,
//! passed as a mutable slice of partials; selection, undo, and rendering
//! belong to the host. Transforms that normalize by the selection's time or
//! frequency range fall back to a unit range or to the identity when the
//! range is zero, so no edit can introduce NaN into the model.

use rand::seq::SliceRandom;

use crate::error::{SineModelError, SineModelResult};
use crate::model::{freq_bounds, time_bounds, Partial, Point};

/// Frequencies are clamped to this floor after geometry edits.
pub const MIN_EDIT_FREQ_HZ: f32 = 20.0;
/// Harmonics above this frequency are not generated.
pub const MAX_HARMONIC_FREQ_HZ: f32 = 20_000.0;

/// Anchor for [`time_stretch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StretchAnchor {
    /// Stretch away from the selection's first point time.
    #[default]
    Start,
    /// Stretch symmetrically around the selection's center time.
    Center,
    /// Stretch toward the selection's last point time.
    End,
}

/// Pivot for [`rotate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotatePivot {
    /// Rotate around the selection's start time.
    Start,
    /// Rotate around the selection's center.
    #[default]
    Center,
    /// Rotate around the selection's end time.
    End,
}

/// Ordering used by [`explode`] when redistributing start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplodeOrder {
    /// Keep the partials in their original start-time order.
    #[default]
    Original,
    /// Lowest mean frequency first.
    Ascending,
    /// Highest mean frequency first.
    Descending,
    /// Random order.
    Random,
}

/// Multiplies every point frequency by `ratio` (a pitch shift without any
/// time change).
pub fn pitch_shift(partials: &mut [Partial], ratio: f32) -> SineModelResult<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(SineModelError::InvalidParameter(format!(
            "pitch ratio must be positive and finite, got {ratio}"
        )));
    }
    for point in partials.iter_mut().flat_map(|p| &mut p.points) {
        point.freq *= ratio;
    }
    Ok(())
}

/// Scales every point time by `factor` away from the selection's anchor (a
/// time stretch without any pitch change).
pub fn time_stretch(
    partials: &mut [Partial],
    factor: f32,
    anchor: StretchAnchor,
) -> SineModelResult<()> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(SineModelError::InvalidParameter(format!(
            "stretch factor must be positive and finite, got {factor}"
        )));
    }
    let Some((min_time, max_time)) = time_bounds(partials) else {
        return Ok(());
    };
    let anchor_time = match anchor {
        StretchAnchor::Start => min_time,
        StretchAnchor::Center => (min_time + max_time) / 2.0,
        StretchAnchor::End => max_time,
    };
    for point in partials.iter_mut().flat_map(|p| &mut p.points) {
        point.time = anchor_time + (point.time - anchor_time) * factor;
    }
    Ok(())
}

/// Mirrors the selection in time around its center.
pub fn reverse(partials: &mut [Partial]) {
    let Some((min_time, max_time)) = time_bounds(partials) else {
        return;
    };
    let center = (min_time + max_time) / 2.0;
    for partial in partials.iter_mut() {
        for point in &mut partial.points {
            point.time = center - (point.time - center);
        }
        // Mirroring inverts chronology; flip the storage order back.
        partial.points.reverse();
    }
}

/// Rotates the selection by `angle_degrees` in normalized time/frequency
/// space around the chosen pivot.
///
/// Time and frequency live on incommensurate scales, so each axis is
/// normalized by the selection's range before rotating and scaled back after.
/// A zero range degrades to a unit scale, which keeps the rotation defined
/// (and the identity for points on the pivot). Frequencies are clamped to
/// [`MIN_EDIT_FREQ_HZ`] and each partial's points are re-sorted by time,
/// since a rotation can reverse chronology.
pub fn rotate(partials: &mut [Partial], angle_degrees: f32, pivot: RotatePivot) {
    if angle_degrees == 0.0 {
        return;
    }
    let Some((min_time, max_time)) = time_bounds(partials) else {
        return;
    };
    let Some((min_freq, max_freq)) = freq_bounds(partials) else {
        return;
    };

    let pivot_time = match pivot {
        RotatePivot::Start => min_time,
        RotatePivot::Center => (min_time + max_time) / 2.0,
        RotatePivot::End => max_time,
    };
    let pivot_freq = (min_freq + max_freq) / 2.0;

    let time_scale = if max_time > min_time {
        max_time - min_time
    } else {
        1.0
    };
    let freq_scale = if max_freq > min_freq {
        max_freq - min_freq
    } else {
        1.0
    };

    let (sin_a, cos_a) = angle_degrees.to_radians().sin_cos();
    for partial in partials.iter_mut() {
        for point in &mut partial.points {
            let norm_time = (point.time - pivot_time) / time_scale;
            let norm_freq = (point.freq - pivot_freq) / freq_scale;
            let rot_time = norm_time * cos_a - norm_freq * sin_a;
            let rot_freq = norm_time * sin_a + norm_freq * cos_a;
            point.time = pivot_time + rot_time * time_scale;
            point.freq = (pivot_freq + rot_freq * freq_scale).max(MIN_EDIT_FREQ_HZ);
        }
        partial.sort_points_by_time();
    }
}

/// Swaps the time and frequency axes of the selection (a 90° rotation in
/// normalized range space): `(t, f) -> (f, 1 - t)`.
///
/// A selection that is flat in either axis has no defined 90° image, so the
/// transform is the identity when either range is zero.
pub fn perpendicular(partials: &mut [Partial]) {
    let Some((min_time, max_time)) = time_bounds(partials) else {
        return;
    };
    let Some((min_freq, max_freq)) = freq_bounds(partials) else {
        return;
    };
    let time_range = max_time - min_time;
    let freq_range = max_freq - min_freq;
    if time_range <= 0.0 || freq_range <= 0.0 {
        return;
    }

    for partial in partials.iter_mut() {
        for point in &mut partial.points {
            let norm_time = (point.time - min_time) / time_range;
            let norm_freq = (point.freq - min_freq) / freq_range;
            point.time = min_time + norm_freq * time_range;
            point.freq = (min_freq + (1.0 - norm_time) * freq_range).max(MIN_EDIT_FREQ_HZ);
        }
        partial.sort_points_by_time();
    }
}

/// Redistributes partial start times evenly across the selection's time
/// range, in the chosen order.
///
/// A no-op for fewer than two partials. With a zero time range every target
/// start equals every current start and the selection is left unchanged.
pub fn explode(partials: &mut [Partial], order: ExplodeOrder) {
    if partials.len() < 2 {
        return;
    }
    let Some((min_time, max_time)) = time_bounds(partials) else {
        return;
    };
    let time_range = max_time - min_time;

    let keys: Vec<(f32, f32)> = partials
        .iter()
        .map(|p| (p.mean_frequency(), p.start_time().unwrap_or(min_time)))
        .collect();
    let mut order_indices: Vec<usize> = (0..partials.len()).collect();
    match order {
        ExplodeOrder::Original => {
            order_indices.sort_by(|&a, &b| keys[a].1.total_cmp(&keys[b].1));
        }
        ExplodeOrder::Ascending => {
            order_indices.sort_by(|&a, &b| keys[a].0.total_cmp(&keys[b].0));
        }
        ExplodeOrder::Descending => {
            order_indices.sort_by(|&a, &b| keys[b].0.total_cmp(&keys[a].0));
        }
        ExplodeOrder::Random => {
            order_indices.shuffle(&mut rand::rng());
        }
    }

    let last_slot = (order_indices.len() - 1) as f32;
    for (slot, &idx) in order_indices.iter().enumerate() {
        let partial = &mut partials[idx];
        let Some(current_start) = partial.start_time() else {
            continue;
        };
        let target_start = min_time + (slot as f32 / last_slot) * time_range;
        let offset = target_start - current_start;
        for point in &mut partial.points {
            point.time += offset;
        }
    }
}

/// Generates harmonic copies of the given partials.
///
/// For each source partial and each harmonic `h` in `2..=count + 1` (odd `h`
/// only when `odd_only`), points are copied with frequency multiplied by `h`
/// and amplitude lowered by `dropoff_db_per_octave * log2(h)`; points that
/// would land above [`MAX_HARMONIC_FREQ_HZ`] are skipped. Harmonics that end
/// up with fewer than two points are not kept. Returned partials get ids
/// continuing after the current maximum; the caller decides whether to append
/// them to its collection.
pub fn add_harmonics(
    partials: &[Partial],
    count: usize,
    dropoff_db_per_octave: f32,
    odd_only: bool,
) -> Vec<Partial> {
    let mut next_id = partials.iter().map(|p| p.id + 1).max().unwrap_or(0);
    let mut harmonics = Vec::new();

    for partial in partials {
        for h in 2..count.saturating_add(2) {
            if odd_only && h % 2 == 0 {
                continue;
            }
            let dropoff_db = dropoff_db_per_octave * (h as f32).log2();
            let points: Vec<Point> = partial
                .points
                .iter()
                .filter_map(|p| {
                    let freq = p.freq * h as f32;
                    (freq <= MAX_HARMONIC_FREQ_HZ).then_some(Point {
                        time: p.time,
                        freq,
                        amplitude: p.amplitude - dropoff_db,
                    })
                })
                .collect();
            if points.len() >= 2 {
                harmonics.push(Partial {
                    id: next_id,
                    points,
                });
                next_id += 1;
            }
        }
    }

    harmonics
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn partial(id: u64, points: &[(f32, f32, f32)]) -> Partial {
        Partial {
            id,
            points: points
                .iter()
                .map(|&(time, freq, amplitude)| Point {
                    time,
                    freq,
                    amplitude,
                })
                .collect(),
        }
    }

    fn assert_all_finite(partials: &[Partial]) {
        for point in partials.iter().flat_map(|p| &p.points) {
            assert!(point.time.is_finite() && point.freq.is_finite());
        }
    }

    #[test]
    fn test_pitch_shift_scales_frequencies() {
        let mut partials = vec![partial(0, &[(0.0, 440.0, -10.0), (1.0, 220.0, -10.0)])];
        pitch_shift(&mut partials, 2.0).unwrap();
        assert_eq!(partials[0].points[0].freq, 880.0);
        assert_eq!(partials[0].points[1].freq, 440.0);
        assert!(pitch_shift(&mut partials, 0.0).is_err());
        assert!(pitch_shift(&mut partials, f32::NAN).is_err());
    }

    #[test]
    fn test_time_stretch_anchored_at_start() {
        let mut partials = vec![partial(0, &[(1.0, 440.0, -10.0), (2.0, 440.0, -10.0)])];
        time_stretch(&mut partials, 2.0, StretchAnchor::Start).unwrap();
        assert_approx_eq!(partials[0].points[0].time as f64, 1.0, 1e-6);
        assert_approx_eq!(partials[0].points[1].time as f64, 3.0, 1e-6);
    }

    #[test]
    fn test_reverse_mirrors_and_keeps_chronology() {
        let mut partials = vec![partial(0, &[(0.0, 100.0, -10.0), (1.0, 200.0, -20.0)])];
        reverse(&mut partials);
        let points = &partials[0].points;
        assert_approx_eq!(points[0].time as f64, 0.0, 1e-6);
        assert_approx_eq!(points[1].time as f64, 1.0, 1e-6);
        // The trajectory now falls instead of rising.
        assert_eq!(points[0].freq, 200.0);
        assert_eq!(points[1].freq, 100.0);
    }

    #[test]
    fn test_rotate_quarter_turn_tilts_flat_partial() {
        // A flat partial has zero frequency range; rotation falls back to a
        // unit frequency scale and must still be well defined.
        let mut partials = vec![partial(0, &[(0.0, 1000.0, -10.0), (1.0, 1000.0, -10.0)])];
        rotate(&mut partials, 90.0, RotatePivot::Center);
        assert_all_finite(&partials);
        let points = &partials[0].points;
        assert_approx_eq!(points[0].time as f64, 0.5, 1e-4);
        assert_approx_eq!(points[1].time as f64, 0.5, 1e-4);
        let mut freqs = [points[0].freq, points[1].freq];
        freqs.sort_by(f32::total_cmp);
        assert_approx_eq!(freqs[0] as f64, 999.5, 1e-3);
        assert_approx_eq!(freqs[1] as f64, 1000.5, 1e-3);
    }

    #[test]
    fn test_rotate_degenerate_point_selection_is_identity() {
        // Both ranges are zero: every point sits on the pivot and must come
        // back unchanged, never NaN.
        let mut partials = vec![partial(0, &[(0.5, 440.0, -10.0), (0.5, 440.0, -10.0)])];
        let before = partials.clone();
        rotate(&mut partials, 45.0, RotatePivot::Center);
        assert_all_finite(&partials);
        assert_eq!(partials, before);
    }

    #[test]
    fn test_perpendicular_swaps_axes() {
        let mut partials = vec![partial(0, &[(0.0, 100.0, -10.0), (1.0, 200.0, -20.0)])];
        perpendicular(&mut partials);
        let points = &partials[0].points;
        assert_approx_eq!(points[0].time as f64, 0.0, 1e-6);
        assert_eq!(points[0].freq, 200.0);
        assert_approx_eq!(points[1].time as f64, 1.0, 1e-6);
        assert_eq!(points[1].freq, 100.0);
    }

    #[test]
    fn test_perpendicular_zero_range_is_identity() {
        let mut partials = vec![partial(0, &[(0.0, 440.0, -10.0), (1.0, 440.0, -10.0)])];
        let before = partials.clone();
        perpendicular(&mut partials);
        assert_eq!(partials, before);
        assert_all_finite(&partials);
    }

    #[test]
    fn test_explode_redistributes_start_times() {
        let mut partials = vec![
            partial(0, &[(0.0, 100.0, -10.0), (0.5, 100.0, -10.0)]),
            partial(1, &[(0.0, 200.0, -10.0), (1.0, 200.0, -10.0)]),
        ];
        explode(&mut partials, ExplodeOrder::Ascending);
        // Lowest partial stays at the selection start, the other moves to the
        // end of the time range.
        assert_approx_eq!(partials[0].points[0].time as f64, 0.0, 1e-6);
        assert_approx_eq!(partials[1].points[0].time as f64, 1.0, 1e-6);
        assert_approx_eq!(partials[1].points[1].time as f64, 2.0, 1e-6);
    }

    #[test]
    fn test_explode_degenerate_cases() {
        // Fewer than two partials: no-op.
        let mut single = vec![partial(0, &[(0.25, 100.0, -10.0), (0.75, 100.0, -10.0)])];
        let before = single.clone();
        explode(&mut single, ExplodeOrder::Original);
        assert_eq!(single, before);

        // Zero time range: every target equals every start, nothing moves.
        let mut flat = vec![
            partial(0, &[(1.0, 100.0, -10.0)]),
            partial(1, &[(1.0, 200.0, -10.0)]),
        ];
        let before = flat.clone();
        explode(&mut flat, ExplodeOrder::Descending);
        assert_eq!(flat, before);
        assert_all_finite(&flat);
    }

    #[test]
    fn test_add_harmonics_builds_overtone_stack() {
        let source = vec![partial(3, &[(0.0, 440.0, -10.0), (1.0, 440.0, -10.0)])];
        let harmonics = add_harmonics(&source, 2, 6.0, false);
        assert_eq!(harmonics.len(), 2);
        assert_eq!(harmonics[0].id, 4);
        assert_eq!(harmonics[1].id, 5);
        assert_eq!(harmonics[0].points[0].freq, 880.0);
        assert_approx_eq!(harmonics[0].points[0].amplitude as f64, -16.0, 1e-3);
        assert_eq!(harmonics[1].points[0].freq, 1320.0);
        // 3rd harmonic sits log2(3) octaves up: -10 - 6 * 1.585 dB.
        assert_approx_eq!(harmonics[1].points[0].amplitude as f64, -19.5098, 1e-3);
    }

    #[test]
    fn test_add_harmonics_odd_only_and_frequency_cap() {
        let source = vec![partial(0, &[(0.0, 6000.0, -10.0), (1.0, 6000.0, -10.0)])];
        // h=2 is even (skipped), h=3 lands at 18 kHz (kept), h=5 would pass
        // 20 kHz and is dropped entirely.
        let harmonics = add_harmonics(&source, 4, 6.0, true);
        assert_eq!(harmonics.len(), 1);
        assert_eq!(harmonics[0].points[0].freq, 18_000.0);
    }
}
