//! Discrete gradients, divergence and the log-irradiance transform.
//!
//! The difference operators are chosen so that `divergence(gradient(u))` is
//! exactly the 5-point Laplacian with Neumann boundary that the spectral solver
//! inverts:
//!
//! - gradient: forward differences, zero in the last column (∂x) / last row (∂y)
//! - divergence: backward differences, with the field treated as zero outside
//!   the image


use rayon::prelude::*;

use crate::error::Result;
use crate::plane::Plane;

/// Smallest irradiance fed to `ln`.
pub const EPSILON: f32 = 1e-6;

/// `exp` argument bounds that keep f32 output finite and non-zero.
const MIN_LOG: f32 = -87.0;
const MAX_LOG: f32 = 88.0;

/// Horizontal and vertical derivatives of a plane.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    pub dx: Plane,
    pub dy: Plane,
}

impl GradientField {
    pub fn width(&self) -> usize {
        self.dx.width()
    }

    pub fn height(&self) -> usize {
        self.dx.height()
    }

    /// Divergence of this field; see [`compute_divergence`].
    pub fn divergence(&self) -> Result<Plane> {
        compute_divergence(&self.dx, &self.dy)
    }
}

/// Forward-difference gradient.
pub fn compute_gradient(plane: &Plane) -> GradientField {
    let width = plane.width();
    let height = plane.height();

    let mut dx = Plane::zeros(width, height);
    dx.par_rows_mut().for_each(|(y, row)| {
        let src = plane.row(y);
        for x in 0..width.saturating_sub(1) {
            row[x] = src[x + 1] - src[x];
        }
    });

    let mut dy = Plane::zeros(width, height);
    dy.par_rows_mut().for_each(|(y, row)| {
        if y + 1 >= height {
            return;
        }
        let (src, next) = (plane.row(y), plane.row(y + 1));
        for x in 0..width {
            row[x] = next[x] - src[x];
        }
    });

    GradientField { dx, dy }
}

/// Backward-difference divergence `∂x gx + ∂y gy`.
///
/// Values outside the image are taken as zero, so no boundary term wraps
/// around to the opposite edge.
pub fn compute_divergence(gx: &Plane, gy: &Plane) -> Result<Plane> {
    gx.ensure_same_size(gy, "gradient y component")?;
    let width = gx.width();

    let mut div = Plane::zeros(width, gx.height());
    div.par_rows_mut().for_each(|(y, row)| {
        let gx_row = gx.row(y);
        let gy_row = gy.row(y);
        for x in 0..width {
            let mut v = gx_row[x] + gy_row[x];
            if x > 0 {
                v -= gx_row[x - 1];
            }
            if y > 0 {
                v -= gy.get(x, y - 1);
            }
            row[x] = v;
        }
    });
    Ok(div)
}

/// `ln(max(v, EPSILON))` per pixel. Non-finite input maps to `ln(EPSILON)`.
pub fn compute_log_irradiance(plane: &Plane) -> Plane {
    let sanitized = plane.pixels().par_iter().filter(|v| !v.is_finite()).count();
    if sanitized > 0 {
        tracing::warn!(sanitized, "Non-finite irradiance replaced by epsilon");
    }
    plane.map(log_irradiance)
}

/// `exp(v)` per pixel, with the exponent clamped so the result stays finite and positive.
pub fn compute_irradiance(log_plane: &Plane) -> Plane {
    log_plane.map(irradiance)
}

#[inline]
fn log_irradiance(v: f32) -> f32 {
    if v.is_finite() { v.max(EPSILON).ln() } else { EPSILON.ln() }
}

#[inline]
fn irradiance(v: f32) -> f32 {
    if v.is_nan() {
        return EPSILON;
    }
    v.clamp(MIN_LOG, MAX_LOG).exp()
}
