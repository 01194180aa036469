//! Post-solve tone correction.
//!
//! The spectral solve returns each channel up to an additive constant and
//! with slightly drifted extremes. The functions here put the level back
//! ([`anchor_to_reference`], [`color_balance`]) and match the channel range
//! to a target ([`rebalance_unblended`], [`rebalance_to_reference`],
//! [`colorbalance_rgb_f32`]).


use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::plane::Plane;

/// Values at rank `nb_min` from the bottom and `nb_max` from the top of the
/// finite pixels, or `None` when the plane has no finite pixel.
///
/// Ranks past the middle are clamped so the low value never exceeds the high one.
pub fn tail_values(plane: &Plane, nb_min: usize, nb_max: usize) -> Option<(f32, f32)> {
    let values = plane.pixels().iter().copied().filter(|v| v.is_finite()).collect();
    select_tails(values, nb_min, nb_max)
}

/// [`tail_values`] restricted to pixels with zero blend weight.
pub fn unblended_tail_values(
    plane: &Plane,
    weights: &Plane,
    nb_min: usize,
    nb_max: usize,
) -> Option<(f32, f32)> {
    let values = plane
        .pixels()
        .iter()
        .zip(weights.pixels())
        .filter(|&(v, &w)| w == 0.0 && v.is_finite())
        .map(|(&v, _)| v)
        .collect();
    select_tails(values, nb_min, nb_max)
}

fn select_tails(mut values: Vec<f32>, nb_min: usize, nb_max: usize) -> Option<(f32, f32)> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let low_rank = nb_min.min(n - 1);
    let high_rank = (n - 1 - nb_max.min(n - 1)).max(low_rank);

    let (_, &mut low, upper) = values.select_nth_unstable_by(low_rank, f32::total_cmp);
    let high = if high_rank == low_rank {
        low
    } else {
        let (_, &mut high, _) =
            upper.select_nth_unstable_by(high_rank - low_rank - 1, f32::total_cmp);
        high
    };
    Some((low, high))
}

/// Simplest colour balance: per channel, stretch the range between the tail
/// values onto `[0, 1]` and clip.
///
/// Channels whose tails coincide are left unchanged.
pub fn colorbalance_rgb_f32(channels: &mut [Plane], nb_min: usize, nb_max: usize) {
    channels.par_iter_mut().for_each(|plane| {
        if let Some((low, high)) = tail_values(plane, nb_min, nb_max) {
            stretch(plane, (low, high), (0.0, 1.0));
        }
    });
}

/// Map each channel's tail values onto the same-rank tail values of the
/// matching reference channel, clipping to that range.
///
/// After the call the fraction of pixels at each end of the range matches the
/// reference's within one pixel (ties aside).
pub fn rebalance_to_reference(
    channels: &mut [Plane],
    reference: &[Plane],
    nb_min: usize,
    nb_max: usize,
) -> Result<()> {
    if channels.len() != reference.len() {
        return Err(Error::UnsupportedChannelCount {
            channels: channels.len(),
        });
    }
    for (channel, target) in channels.iter().zip(reference) {
        target.ensure_same_size(channel, "rebalanced channel")?;
    }

    channels
        .par_iter_mut()
        .zip(reference.par_iter())
        .for_each(|(plane, target)| {
            let source = tail_values(plane, nb_min, nb_max);
            let target = tail_values(target, nb_min, nb_max);
            if let (Some(source), Some(target)) = (source, target) {
                stretch(plane, source, target);
            }
        });
    Ok(())
}

/// Correct solve drift using only the pixels the blend left alone.
///
/// Per channel, the tail values of the unblended pixels (`weights == 0`) of
/// the composite are mapped onto the tail values of the same pixels of the
/// reference, and that affine map is applied to the whole channel. Donor
/// content is not clipped to the reference's range; results are floored at 0.
/// Channels are left unchanged when either range is degenerate or no pixel is
/// unblended.
pub fn rebalance_unblended(
    channels: &mut [Plane],
    reference: &[Plane],
    weights: &Plane,
    nb_min: usize,
    nb_max: usize,
) -> Result<()> {
    if channels.len() != reference.len() {
        return Err(Error::UnsupportedChannelCount {
            channels: channels.len(),
        });
    }
    for (channel, target) in channels.iter().zip(reference) {
        target.ensure_same_size(channel, "rebalanced channel")?;
        weights.ensure_same_size(channel, "blend weights")?;
    }

    channels
        .par_iter_mut()
        .zip(reference.par_iter())
        .for_each(|(plane, target)| {
            let source = unblended_tail_values(plane, weights, nb_min, nb_max);
            let target = unblended_tail_values(target, weights, nb_min, nb_max);
            match (source, target) {
                (Some((low, high)), Some((target_low, target_high)))
                    if high > low && target_high > target_low =>
                {
                    let gain = (target_high - target_low) / (high - low);
                    plane.map_inplace(|v| (target_low + (v - low) * gain).max(0.0));
                }
                _ => tracing::debug!("No usable unblended range, channel left as solved"),
            }
        });
    Ok(())
}

/// Scale `u` so that `u(x, y) == f(x, y)`.
///
/// Returns the applied gain. A zero or non-finite sample at the anchor leaves
/// `u` untouched and returns 1.
pub fn color_balance(u: &mut Plane, f: &Plane, x: usize, y: usize) -> Result<f32> {
    f.ensure_same_size(u, "balanced plane")?;
    if x >= u.width() || y >= u.height() {
        return Err(Error::InvalidConfig(format!(
            "anchor pixel ({x}, {y}) outside {}x{} image",
            u.width(),
            u.height()
        )));
    }

    let gain = f.get(x, y) / u.get(x, y);
    if !gain.is_finite() || gain <= 0.0 {
        tracing::warn!(x, y, "Anchor pixel unusable, skipping colour balance");
        return Ok(1.0);
    }
    u.map_inplace(|v| v * gain);
    Ok(gain)
}

/// Shift the log-domain reconstruction `u_log` so its mean over unblended
/// pixels (`weights == 0`) equals that of the reference `f_log`.
///
/// Falls back to all pixels when every pixel was blended. Returns the shift.
pub fn anchor_to_reference(u_log: &mut Plane, f_log: &Plane, weights: &Plane) -> Result<f32> {
    f_log.ensure_same_size(u_log, "anchored plane")?;
    f_log.ensure_same_size(weights, "blend weights")?;

    let difference = |only_unblended: bool| {
        u_log
            .pixels()
            .par_iter()
            .zip(f_log.pixels().par_iter())
            .zip(weights.pixels().par_iter())
            .filter(|(_, w)| !only_unblended || **w == 0.0)
            .map(|((&u, &f), _)| ((f - u) as f64, 1usize))
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
    };

    let (mut sum, mut count) = difference(true);
    if count == 0 {
        (sum, count) = difference(false);
    }
    if count == 0 {
        return Ok(0.0);
    }

    let shift = (sum / count as f64) as f32;
    u_log.map_inplace(|v| v + shift);
    Ok(shift)
}

/// Affine map of `source` range onto `target` range, clipped to `target`.
fn stretch(plane: &mut Plane, (low, high): (f32, f32), (target_low, target_high): (f32, f32)) {
    if !(high > low) {
        return;
    }
    let span = high - low;
    plane.map_inplace(|v| {
        let t = ((v - low) / span).clamp(0.0, 1.0);
        (target_low * (1.0 - t) + target_high * t).clamp(target_low, target_high)
    });
}
