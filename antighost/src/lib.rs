//! Antighost - gradient-domain anti-ghosting for HDR exposure brackets.
//!
//! When the scene moves between the exposures of a bracket, merging them
//! produces "ghosts": semi-transparent copies of the moving content. This
//! library detects the affected regions and rebuilds them from a single
//! donor exposure, blending in the gradient domain so the seam is invisible:
//!
//! - Patch classification on a fixed 40x40 grid
//! - Log-irradiance gradient fields and feathered gated blending
//! - DCT-based Poisson reconstruction with Neumann boundary
//! - Tail-matching colour rebalance against the reference exposure
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use antighost::prelude::*;
//!
//! let stack = ExposureStack::new(vec![
//!     ExposureItem::new(Frame::rgb(r0, g0, b0)?, -1.0),
//!     ExposureItem::new(Frame::rgb(r1, g1, b1)?, 0.0),
//!     ExposureItem::new(Frame::rgb(r2, g2, b2)?, 1.0),
//! ])?;
//!
//! let engine = Antighoster::new(AntighostConfig::default())?;
//! match engine.run(&stack, &Request::automatic(1))? {
//!     Outcome::Corrected(result) => println!("replaced {} pixels", result.ghosted_pixels),
//!     Outcome::NoGhostingDetected(_) => println!("nothing to do"),
//! }
//! ```

mod bit_plane;
mod color;
pub(crate) mod common;
mod config;
mod error;
mod frame;
pub mod logging;
mod plane;
mod progress;

pub mod blend;
pub mod classify;
pub mod gradient;
pub mod pipeline;
pub mod poisson;
pub mod rebalance;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Core image types
// ============================================================================

pub use bit_plane::BitPlane;
pub use frame::{Dimensions, ExposureItem, ExposureStack, Frame};
pub use plane::Plane;

// ============================================================================
// Lightness and hue statistics
// ============================================================================

pub use color::{
    LUMA_WEIGHTS, average_cell_lightness, average_lightness, average_lightness_rgb, hue,
    hue_squared_mean, lightness, lightness_plane,
};

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{
    Anchor, AntighostConfig, BlendConfig, BlendDomain, ClassifierConfig, ClipCounts,
    RebalanceConfig,
};
pub use error::{Error, Result};

// ============================================================================
// Classification
// ============================================================================

pub use classify::{
    ClassificationGrid, GRID_SIZE, GridLayout, PairClassification, PatchComparison,
    classify_pair, compare_patches, find_min_index, hue_statistics, rank_donors,
    select_good_frame,
};

// ============================================================================
// Gradient domain
// ============================================================================

pub use blend::{GhostMask, GridMask, PixelMask, PixelSource, blend_gradients, blend_pixels};
pub use gradient::{
    GradientField, compute_divergence, compute_gradient, compute_irradiance,
    compute_log_irradiance,
};
pub use poisson::{PoissonSolver, clamp_to_zero, plane_max, plane_min, solve_poisson};
pub use rebalance::{
    anchor_to_reference, color_balance, colorbalance_rgb_f32, rebalance_to_reference,
    rebalance_unblended, tail_values, unblended_tail_values,
};

// ============================================================================
// Orchestration
// ============================================================================

pub use pipeline::{
    Antighoster, Deghosted, DeghostedStack, Mode, Outcome, Request, deghost,
};
pub use progress::{Progress, ProgressCallback, Stage};
