//! Patch classification: which grid cells of an exposure pair contain ghosting.
//!
//! Every cell of the [`GRID_SIZE`]² grid is tested independently with
//! [`compare_patches`]: after compensating for the exposure difference, the
//! donor's lightness must agree with the reference's. Cells where enough
//! pixels disagree contain moving content and are flagged. Cells touching the
//! image border are never flagged.

mod donor;
mod grid;
mod patches;

#[cfg(test)]
mod tests;

use rayon::prelude::*;

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::frame::{ExposureItem, ExposureStack};

pub use donor::{find_min_index, hue_statistics, rank_donors, select_good_frame};
pub use grid::{ClassificationGrid, GRID_SIZE, GridLayout};
pub use patches::{PatchComparison, compare_patches};

/// Result of classifying one reference/donor pair.
#[derive(Debug, Clone)]
pub struct PairClassification {
    pub reference: usize,
    pub donor: usize,
    /// `EV(donor) - EV(reference)` as used by the comparison.
    pub delta_ev: f32,
    /// Donor pixel `(x + dx, y + dy)` matches reference pixel `(x, y)`.
    pub offset: (i32, i32),
    pub layout: GridLayout,
    pub grid: ClassificationGrid,
}

impl PairClassification {
    pub fn has_ghosts(&self) -> bool {
        self.grid.has_ghosts()
    }
}

/// Classify every grid cell of `reference` against `donor`.
pub fn classify_pair(
    stack: &ExposureStack,
    reference: usize,
    donor: usize,
    config: &ClassifierConfig,
) -> Result<PairClassification> {
    let ref_item = stack.get(reference)?;
    let donor_item = stack.get(donor)?;
    if reference == donor {
        return Err(Error::DonorIsReference { index: donor });
    }
    let dims = stack.dimensions();
    if dims.is_degenerate() {
        return Err(Error::DegenerateInput {
            width: dims.width,
            height: dims.height,
        });
    }

    let delta_ev = resolve_delta_ev(ref_item, donor_item, config);
    let offset = ref_item.relative_offset(donor_item);
    let params = PatchComparison::new(config, delta_ev, offset);
    let layout = GridLayout::new(dims.width, dims.height);

    let ref_lightness = ref_item.frame.lightness();
    let donor_lightness = donor_item.frame.lightness();

    let flags: Vec<bool> = (0..GRID_SIZE * GRID_SIZE)
        .into_par_iter()
        .map(|idx| {
            let (row, col) = (idx / GRID_SIZE, idx % GRID_SIZE);
            !layout.is_border_cell(col, row)
                && patches::cell_is_inconsistent(
                    &layout,
                    col,
                    row,
                    &params,
                    |x, y| ref_lightness.get(x, y),
                    |x, y| donor_lightness.get(x, y),
                )
        })
        .collect();
    let grid = ClassificationGrid::from_flags(&flags);

    tracing::debug!(
        reference,
        donor,
        delta_ev,
        ghosted_cells = grid.ghosted_count(),
        "Classified exposure pair"
    );

    Ok(PairClassification {
        reference,
        donor,
        delta_ev,
        offset,
        layout,
        grid,
    })
}

/// `EV(donor) - EV(reference)`, from metadata or measured from average lightness.
pub fn resolve_delta_ev(
    reference: &ExposureItem,
    donor: &ExposureItem,
    config: &ClassifierConfig,
) -> f32 {
    let metadata = donor.ev - reference.ev;
    if !config.estimate_delta_ev {
        return metadata;
    }

    let ref_avg = reference.average_lightness();
    let donor_avg = donor.average_lightness();
    let measured = (donor_avg / ref_avg).log2();
    if ref_avg > 0.0 && donor_avg > 0.0 && measured.is_finite() {
        measured
    } else {
        tracing::warn!(
            ref_avg,
            donor_avg,
            metadata,
            "Cannot measure exposure difference, falling back to EV metadata"
        );
        metadata
    }
}
