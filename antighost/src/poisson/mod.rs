//! Spectral Poisson solver with Neumann boundary.
//!
//! Solves `Δu = f` where `Δ` is the 5-point Laplacian with mirrored borders,
//! i.e. exactly `divergence(gradient(u))` from [`crate::gradient`]. The 2-D
//! DCT-II diagonalises that operator:
//!
//! ```text
//! û(p, q) = F(p, q) / (2cos(πp/W) + 2cos(πq/H) - 4)
//! ```
//!
//! The `(0, 0)` term is undetermined (any constant solves the equation) and
//! is set to zero, so the solution has zero mean. Callers restore the level
//! afterwards (see [`crate::rebalance::anchor_to_reference`]).

mod dct;


use std::f64::consts::PI;

use rayon::prelude::*;
use rustfft::FftPlanner;

use crate::error::{Error, Result};
use crate::plane::Plane;

use dct::Dct;

struct Transforms {
    rows: Dct,
    cols: Dct,
    /// `2cos(πp/W) - 2` per column frequency.
    eigen_x: Vec<f64>,
    /// `2cos(πq/H) - 2` per row frequency.
    eigen_y: Vec<f64>,
}

/// Poisson solver for one image size, with cached FFT plans.
pub struct PoissonSolver {
    width: usize,
    height: usize,
    /// `None` when the field has fewer than two pixels.
    transforms: Option<Transforms>,
}

impl std::fmt::Debug for PoissonSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoissonSolver")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl PoissonSolver {
    pub fn new(width: usize, height: usize) -> Self {
        if width * height < 2 {
            return Self {
                width,
                height,
                transforms: None,
            };
        }

        let mut planner = FftPlanner::new();
        let rows = Dct::new(width, &mut planner);
        let cols = Dct::new(height, &mut planner);
        Self {
            width,
            height,
            transforms: Some(Transforms {
                rows,
                cols,
                eigen_x: eigenvalues(width),
                eigen_y: eigenvalues(height),
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Zero-mean `u` with `Δu = divergence`.
    pub fn solve(&self, divergence: &Plane) -> Result<Plane> {
        if divergence.width() != self.width || divergence.height() != self.height {
            return Err(Error::DimensionMismatch {
                what: "divergence".to_string(),
                expected: crate::frame::Dimensions::new(self.width, self.height, 1),
                actual: divergence.dimensions(),
            });
        }
        Ok(self.solve_unchecked(divergence))
    }

    fn solve_unchecked(&self, divergence: &Plane) -> Plane {
        let (width, height) = (self.width, self.height);
        let Some(t) = &self.transforms else {
            return Plane::zeros(width, height);
        };

        let mut sanitized = 0usize;
        let mut data: Vec<f64> = divergence
            .pixels()
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    v as f64
                } else {
                    sanitized += 1;
                    0.0
                }
            })
            .collect();
        if sanitized > 0 {
            tracing::warn!(sanitized, "Non-finite divergence replaced by zero");
        }

        data.par_chunks_mut(width)
            .for_each_init(|| t.rows.make_scratch(), |s, row| t.rows.forward(row, s));

        // columns become rows of length `height`; the spectrum is divided
        // and transformed back before transposing again
        let mut columns = transpose(&data, width, height);
        columns.par_chunks_mut(height).enumerate().for_each_init(
            || t.cols.make_scratch(),
            |s, (p, column)| {
                t.cols.forward(column, s);
                for (q, v) in column.iter_mut().enumerate() {
                    *v = if p == 0 && q == 0 {
                        0.0
                    } else {
                        *v / (t.eigen_x[p] + t.eigen_y[q])
                    };
                }
                t.cols.inverse(column, s);
            },
        );

        let mut data = transpose(&columns, height, width);
        data.par_chunks_mut(width)
            .for_each_init(|| t.rows.make_scratch(), |s, row| t.rows.inverse(row, s));

        Plane::new(width, height, data.into_iter().map(|v| v as f32).collect())
    }
}

/// One-off solve; builds a [`PoissonSolver`] for the plane's size.
pub fn solve_poisson(divergence: &Plane) -> Plane {
    PoissonSolver::new(divergence.width(), divergence.height()).solve_unchecked(divergence)
}

/// Set every value below `floor` to zero, in every channel.
pub fn clamp_to_zero(channels: &mut [Plane], floor: f32) {
    for plane in channels {
        plane.map_inplace(|v| if v < floor || v.is_nan() { 0.0 } else { v });
    }
}

/// Smallest finite value over all channels.
pub fn plane_min(channels: &[Plane]) -> Option<f32> {
    channels.iter().filter_map(Plane::min).reduce(f32::min)
}

/// Largest finite value over all channels.
pub fn plane_max(channels: &[Plane]) -> Option<f32> {
    channels.iter().filter_map(Plane::max).reduce(f32::max)
}

fn eigenvalues(len: usize) -> Vec<f64> {
    (0..len)
        .map(|k| 2.0 * (PI * k as f64 / len as f64).cos() - 2.0)
        .collect()
}

fn transpose(src: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut out = vec![0.0; src.len()];
    out.par_chunks_mut(height).enumerate().for_each(|(x, column)| {
        for (y, v) in column.iter_mut().enumerate() {
            *v = src[y * width + x];
        }
    });
    out
}
