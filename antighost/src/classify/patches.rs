//! Cell-level consistency test between two exposures.

use std::f32::consts::LN_2;

use crate::classify::grid::GridLayout;
use crate::config::ClassifierConfig;
use crate::frame::ExposureItem;

/// Parameters of one patch comparison between a reference and a donor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchComparison {
    /// Largest tolerated `|ln L2 - ln L1 - ΔEV·ln 2|`.
    pub threshold: f32,
    /// `EV(donor) - EV(reference)`.
    pub delta_ev: f32,
    /// Donor pixel `(x + dx, y + dy)` matches reference pixel `(x, y)`.
    pub offset: (i32, i32),
    pub min_deviant_fraction: f32,
    pub min_comparable_fraction: f32,
    pub dark_limit: f32,
    pub saturation_limit: f32,
}

impl PatchComparison {
    pub fn new(config: &ClassifierConfig, delta_ev: f32, offset: (i32, i32)) -> Self {
        Self {
            threshold: config.threshold,
            delta_ev,
            offset,
            min_deviant_fraction: config.min_deviant_fraction,
            min_comparable_fraction: config.min_comparable_fraction,
            dark_limit: config.dark_limit,
            saturation_limit: config.saturation_limit,
        }
    }

    #[inline]
    fn usable(&self, lightness: f32) -> bool {
        lightness.is_finite() && lightness >= self.dark_limit && lightness <= self.saturation_limit
    }
}

/// Whether cell (`col`, `row`) differs between `item1` and `item2` by more
/// than the exposure difference explains.
///
/// Returns `true` for an inconsistent (ghosted) cell. Cells without enough
/// comparable pixels are reported consistent.
pub fn compare_patches(
    item1: &ExposureItem,
    item2: &ExposureItem,
    col: usize,
    row: usize,
    layout: &GridLayout,
    params: &PatchComparison,
) -> bool {
    cell_is_inconsistent(
        layout,
        col,
        row,
        params,
        |x, y| item1.frame.lightness_at(x, y),
        |x, y| item2.frame.lightness_at(x, y),
    )
}

/// Core of [`compare_patches`] over arbitrary lightness lookups, so the
/// classifier can feed precomputed lightness planes.
pub(crate) fn cell_is_inconsistent<R, D>(
    layout: &GridLayout,
    col: usize,
    row: usize,
    params: &PatchComparison,
    reference: R,
    donor: D,
) -> bool
where
    R: Fn(usize, usize) -> f32,
    D: Fn(usize, usize) -> f32,
{
    let xs = layout.cell_x_range(col);
    let ys = layout.cell_y_range(row);
    let total = xs.len() * ys.len();
    if total == 0 {
        return false;
    }

    let width = layout.width() as i64;
    let height = layout.height() as i64;
    let (dx, dy) = (params.offset.0 as i64, params.offset.1 as i64);
    let expected = params.delta_ev * LN_2;

    let mut comparable = 0usize;
    let mut deviant = 0usize;
    for y in ys {
        let sy = y as i64 + dy;
        if sy < 0 || sy >= height {
            continue;
        }
        for x in xs.clone() {
            let sx = x as i64 + dx;
            if sx < 0 || sx >= width {
                continue;
            }
            let l1 = reference(x, y);
            let l2 = donor(sx as usize, sy as usize);
            if !params.usable(l1) || !params.usable(l2) {
                continue;
            }
            comparable += 1;
            let residual = l2.ln() - l1.ln() - expected;
            if residual.abs() > params.threshold {
                deviant += 1;
            }
        }
    }

    if comparable == 0 || (comparable as f32) < params.min_comparable_fraction * total as f32 {
        return false;
    }
    deviant as f32 / comparable as f32 > params.min_deviant_fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::plane::Plane;

    fn item(plane: Plane, ev: f32) -> ExposureItem {
        ExposureItem::new(Frame::gray(plane), ev)
    }

    fn params(delta_ev: f32, offset: (i32, i32)) -> PatchComparison {
        PatchComparison::new(&ClassifierConfig::default(), delta_ev, offset)
    }

    #[test]
    fn test_exposure_ratio_is_compensated() {
        let layout = GridLayout::new(80, 80);
        let a = item(Plane::new_filled(80, 80, 0.2), 0.0);
        let b = item(Plane::new_filled(80, 80, 0.4), 1.0);
        assert!(!compare_patches(&a, &b, 5, 5, &layout, &params(1.0, (0, 0))));
        // same frames, but claimed to be two stops apart
        assert!(compare_patches(&a, &b, 5, 5, &layout, &params(2.0, (0, 0))));
    }

    #[test]
    fn test_moved_content_is_inconsistent() {
        let layout = GridLayout::new(80, 80);
        let a = item(Plane::new_filled(80, 80, 0.3), 0.0);
        let b = item(
            Plane::from_fn(80, 80, |x, y| if (10..12).contains(&x) && (10..12).contains(&y) { 0.05 } else { 0.3 }),
            0.0,
        );
        assert!(compare_patches(&a, &b, 5, 5, &layout, &params(0.0, (0, 0))));
        assert!(!compare_patches(&a, &b, 20, 20, &layout, &params(0.0, (0, 0))));
    }

    #[test]
    fn test_offset_registers_donor() {
        let layout = GridLayout::new(80, 80);
        let scene = |x: usize, y: usize| 0.1 + 0.005 * ((x * 7 + y * 13) % 50) as f32;
        let a = item(Plane::from_fn(80, 80, scene), 0.0);
        // donor content sits 3 pixels to the right
        let b = item(Plane::from_fn(80, 80, |x, y| scene(x.saturating_sub(3), y)), 0.0);
        assert!(!compare_patches(&a, &b, 10, 10, &layout, &params(0.0, (3, 0))));
        assert!(compare_patches(&a, &b, 10, 10, &layout, &params(0.0, (0, 0))));
    }

    #[test]
    fn test_saturated_cell_has_no_evidence() {
        let layout = GridLayout::new(80, 80);
        let a = item(Plane::new_filled(80, 80, 0.3), 0.0);
        let b = item(Plane::new_filled(80, 80, 1.0), 0.0);
        assert!(!compare_patches(&a, &b, 5, 5, &layout, &params(0.0, (0, 0))));
    }

    #[test]
    fn test_offset_beyond_image_leaves_cell_consistent() {
        let layout = GridLayout::new(80, 80);
        let a = item(Plane::new_filled(80, 80, 0.3), 0.0);
        let b = item(Plane::new_filled(80, 80, 0.05), 0.0);
        assert!(!compare_patches(&a, &b, 5, 5, &layout, &params(0.0, (500, 0))));
    }
}
