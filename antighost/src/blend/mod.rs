//! Gated merging of the reference and donor fields.
//!
//! A [`GhostMask`] decides, per pixel, how much of the donor to take. Grid
//! masks come from the classifier, pixel masks from the mask-painting tool;
//! both are turned into the same feathered weight plane once and then share
//! one blending routine.

mod feather;


use rayon::prelude::*;

use crate::bit_plane::BitPlane;
use crate::classify::{ClassificationGrid, GridLayout};
use crate::error::Result;
use crate::gradient::GradientField;
use crate::plane::Plane;

pub use feather::feather_weights;

/// Where a blended pixel's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PixelSource {
    Reference,
    Donor,
    /// Mixed, inside the feather ramp.
    Feather,
}

/// Per-pixel ghost mask with precomputed feather weights.
pub trait GhostMask: Sync {
    /// Pixels whose content must come from the donor.
    fn ghosted(&self) -> &BitPlane;

    /// Donor weight per pixel, in `[0, 1]`.
    fn weights(&self) -> &Plane;

    fn width(&self) -> usize {
        self.weights().width()
    }

    fn height(&self) -> usize {
        self.weights().height()
    }

    fn is_ghosted(&self, x: usize, y: usize) -> bool {
        self.ghosted().get_xy(x, y)
    }

    fn donor_weight(&self, x: usize, y: usize) -> f32 {
        self.weights().get(x, y)
    }

    fn pixel_source(&self, x: usize, y: usize) -> PixelSource {
        if self.is_ghosted(x, y) {
            PixelSource::Donor
        } else if self.donor_weight(x, y) > 0.0 {
            PixelSource::Feather
        } else {
            PixelSource::Reference
        }
    }

    fn has_ghosts(&self) -> bool {
        !self.ghosted().none()
    }

    fn ghosted_pixels(&self) -> usize {
        self.ghosted().count_ones()
    }
}

/// Mask produced by the classifier: whole grid cells are ghosted.
#[derive(Debug, Clone)]
pub struct GridMask {
    grid: ClassificationGrid,
    ghosted: BitPlane,
    weights: Plane,
}

impl GridMask {
    /// Upsample `grid` to the pixels of `layout` and feather it by `radius`.
    pub fn new(grid: &ClassificationGrid, layout: &GridLayout, radius: usize) -> Self {
        let mut ghosted = BitPlane::new_default(layout.width(), layout.height());
        for (row, col) in grid.ghosted_cells() {
            let xs = layout.cell_x_range(col);
            let ys = layout.cell_y_range(row);
            ghosted.fill_rect(xs.start, ys.start, xs.end, ys.end, true);
        }
        let weights = feather_weights(&ghosted, radius);
        Self {
            grid: grid.clone(),
            ghosted,
            weights,
        }
    }

    pub fn grid(&self) -> &ClassificationGrid {
        &self.grid
    }
}

impl GhostMask for GridMask {
    fn ghosted(&self) -> &BitPlane {
        &self.ghosted
    }

    fn weights(&self) -> &Plane {
        &self.weights
    }
}

/// Free-form mask painted by the user at full resolution.
#[derive(Debug, Clone)]
pub struct PixelMask {
    ghosted: BitPlane,
    weights: Plane,
}

impl PixelMask {
    pub fn new(mask: BitPlane, radius: usize) -> Self {
        let weights = feather_weights(&mask, radius);
        Self {
            ghosted: mask,
            weights,
        }
    }
}

impl GhostMask for PixelMask {
    fn ghosted(&self) -> &BitPlane {
        &self.ghosted
    }

    fn weights(&self) -> &Plane {
        &self.weights
    }
}

/// `(1 - w) * reference + w * donor` per component.
///
/// A forward difference at `(x, y)` spans the edge to `(x + 1, y)` (or
/// `(x, y + 1)` for `dy`), so its weight is the larger mask weight of the two
/// pixels. A step into the ghosted region is taken wholly from the donor.
pub fn blend_gradients<M: GhostMask + ?Sized>(
    reference: &GradientField,
    donor: &GradientField,
    mask: &M,
) -> Result<GradientField> {
    let weights = mask.weights();
    weights.ensure_same_size(&reference.dx, "reference gradient x")?;
    weights.ensure_same_size(&reference.dy, "reference gradient y")?;
    weights.ensure_same_size(&donor.dx, "donor gradient x")?;
    weights.ensure_same_size(&donor.dy, "donor gradient y")?;

    let (dx, dy) = rayon::join(
        || mix(&reference.dx, &donor.dx, &edge_weights(weights, (1, 0)), 1.0),
        || mix(&reference.dy, &donor.dy, &edge_weights(weights, (0, 1)), 1.0),
    );
    Ok(GradientField { dx, dy })
}

/// Pixel-domain blend: donor pixels are multiplied by `scale` (the exposure
/// ratio to the reference) and mixed in with the mask's weights.
pub fn blend_pixels<M: GhostMask + ?Sized>(
    reference: &Plane,
    donor: &Plane,
    scale: f32,
    mask: &M,
) -> Result<Plane> {
    let weights = mask.weights();
    weights.ensure_same_size(reference, "reference plane")?;
    weights.ensure_same_size(donor, "donor plane")?;
    Ok(mix(reference, donor, weights, scale))
}

/// `max(w(p), w(p + step))`; the last column or row keeps its own weight.
fn edge_weights(weights: &Plane, (sx, sy): (usize, usize)) -> Plane {
    let (width, height) = (weights.width(), weights.height());
    Plane::from_fn(width, height, |x, y| {
        let w = weights.get(x, y);
        let (nx, ny) = (x + sx, y + sy);
        if nx < width && ny < height {
            w.max(weights.get(nx, ny))
        } else {
            w
        }
    })
}

fn mix(reference: &Plane, donor: &Plane, weights: &Plane, scale: f32) -> Plane {
    let mut out = reference.clone();
    out.pixels_mut()
        .par_iter_mut()
        .zip(donor.pixels().par_iter())
        .zip(weights.pixels().par_iter())
        .for_each(|((r, &d), &w)| {
            if w > 0.0 {
                *r = (1.0 - w) * *r + w * d * scale;
            }
        });
    out
}
