//! Soft donor weights around ghosted regions.

use rayon::prelude::*;

use crate::bit_plane::BitPlane;
use crate::plane::Plane;

#[derive(Debug, Clone, Copy)]
enum Window {
    Max,
    Mean,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Donor weight per pixel: 1 on ghosted pixels, falling linearly to 0 across
/// the `2 * radius` pixels outside them.
///
/// The indicator is first dilated by `radius` and then box-filtered with the
/// same radius, so the ramp never reaches into the ghosted region. Windows
/// are truncated at the image edges. `radius == 0` gives a hard switch.
pub fn feather_weights(ghosted: &BitPlane, radius: usize) -> Plane {
    let indicator = ghosted.to_plane();
    if radius == 0 || ghosted.none() {
        return indicator;
    }

    let dilated = separable(&indicator, radius, Window::Max);
    let mut weights = separable(&dilated, radius, Window::Mean);
    weights.par_rows_mut().for_each(|(y, row)| {
        for (x, w) in row.iter_mut().enumerate() {
            *w = if ghosted.get_xy(x, y) { 1.0 } else { w.clamp(0.0, 1.0) };
        }
    });
    weights
}

fn separable(plane: &Plane, radius: usize, window: Window) -> Plane {
    let pass = window_pass(plane, radius, window, Axis::Horizontal);
    window_pass(&pass, radius, window, Axis::Vertical)
}

fn window_pass(src: &Plane, radius: usize, window: Window, axis: Axis) -> Plane {
    let width = src.width();
    let height = src.height();
    let mut out = Plane::zeros(width, height);
    out.par_rows_mut().for_each(|(y, row)| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = match axis {
                Axis::Horizontal => {
                    let xs = x.saturating_sub(radius)..(x + radius + 1).min(width);
                    reduce(window, xs.map(|i| src.get(i, y)))
                }
                Axis::Vertical => {
                    let ys = y.saturating_sub(radius)..(y + radius + 1).min(height);
                    reduce(window, ys.map(|j| src.get(x, j)))
                }
            };
        }
    });
    out
}

fn reduce(window: Window, values: impl Iterator<Item = f32>) -> f32 {
    match window {
        Window::Max => values.fold(0.0, f32::max),
        Window::Mean => {
            let (sum, count) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
            if count == 0 { 0.0 } else { sum / count as f32 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_radius_is_hard_switch() {
        let mut mask = BitPlane::new_default(8, 8);
        mask.fill_rect(2, 2, 4, 4, true);
        let weights = feather_weights(&mask, 0);
        assert_eq!(weights, mask.to_plane());
    }

    #[test]
    fn test_ramp_profile_outside_ghost() {
        let mut mask = BitPlane::new_default(40, 1);
        mask.fill_rect(0, 0, 10, 1, true);
        let weights = feather_weights(&mask, 2);
        let row = weights.row(0);
        assert!(row[..10].iter().all(|&w| w == 1.0));
        // the ramp covers the 2 * radius pixels next to the ghost
        let expected = [0.8, 0.6, 0.4, 0.2];
        for (i, &e) in expected.iter().enumerate() {
            assert!((row[10 + i] - e).abs() < 1e-6, "x={}: {}", 10 + i, row[10 + i]);
        }
        assert!(row[14..].iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_empty_mask_has_zero_weights() {
        let weights = feather_weights(&BitPlane::new_default(5, 5), 3);
        assert!(weights.pixels().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_weights_are_monotone_away_from_ghost() {
        let mut mask = BitPlane::new_default(30, 30);
        mask.fill_rect(12, 12, 18, 18, true);
        let weights = feather_weights(&mask, 3);
        for x in 18..29 {
            assert!(weights.get(x, 15) >= weights.get(x + 1, 15));
        }
    }
}
