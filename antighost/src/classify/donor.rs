//! Donor selection: which exposure replaces ghosted content.
//!
//! Exposures are compared through one scalar hue statistic per frame
//! ([`hue_squared_mean`]). A donor whose statistic is close to the
//! reference's shows the scene in the same colours and blends without a cast.

use rayon::prelude::*;

use crate::color::hue_squared_mean;
use crate::error::{Error, Result};
use crate::frame::ExposureStack;

/// Statistics closer than this are treated as equal.
const TIE_TOLERANCE: f32 = 1e-6;

/// `hue_squared_mean` of every frame, in stack order.
pub fn hue_statistics(stack: &ExposureStack) -> Vec<f32> {
    stack
        .items()
        .par_iter()
        .map(|item| hue_squared_mean(&item.frame))
        .collect()
}

/// Index of the first smallest value, skipping NaN. `None` when nothing is comparable.
pub fn find_min_index(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

/// Every frame except `reference`, best donor first.
///
/// Ordered by hue-statistic distance to the reference; near-ties go to the
/// smaller EV distance and then to the lower index.
pub fn rank_donors(stack: &ExposureStack, reference: usize) -> Result<Vec<usize>> {
    let ref_item = stack.get(reference)?;
    if stack.len() < 2 {
        return Err(Error::NoDonorCandidate { reference });
    }

    let stats = hue_statistics(stack);
    let hue_distance = |i: usize| (stats[i] - stats[reference]).abs();
    let ev_distance = |i: usize| (stack.items()[i].ev - ref_item.ev).abs();

    let mut ranked: Vec<usize> = (0..stack.len()).filter(|&i| i != reference).collect();
    order_candidates(&mut ranked, hue_distance, ev_distance);
    Ok(ranked)
}

/// Sort candidates by hue distance quantised to [`TIE_TOLERANCE`] steps, then
/// by EV distance, then by index.
fn order_candidates<H, E>(candidates: &mut [usize], hue_distance: H, ev_distance: E)
where
    H: Fn(usize) -> f32,
    E: Fn(usize) -> f32,
{
    let key = |i: usize| ((hue_distance(i) / TIE_TOLERANCE).floor(), ev_distance(i));
    candidates.sort_by(|&a, &b| {
        let ((hue_a, ev_a), (hue_b, ev_b)) = (key(a), key(b));
        hue_a
            .total_cmp(&hue_b)
            .then(ev_a.total_cmp(&ev_b))
            .then(a.cmp(&b))
    });
}

/// The frame every other frame is corrected against when deghosting a whole stack.
///
/// Smallest hue statistic wins; near-ties go to the EV closest to the
/// bracket's median EV and then to the lower index.
pub fn select_good_frame(stack: &ExposureStack) -> usize {
    let stats = hue_statistics(stack);
    let Some(min_idx) = find_min_index(&stats) else {
        return 0;
    };
    let min = stats[min_idx];

    let mut evs: Vec<f32> = stack.items().iter().map(|item| item.ev).collect();
    evs.sort_by(f32::total_cmp);
    let median = evs[evs.len() / 2];

    (0..stack.len())
        .filter(|&i| (stats[i] - min).abs() <= TIE_TOLERANCE)
        .fold(min_idx, |best, i| {
            let di = (stack.items()[i].ev - median).abs();
            let db = (stack.items()[best].ev - median).abs();
            if di < db || (di == db && i < best) { i } else { best }
        })
}
