//! Lightness and hue statistics shared by the classifier and the rebalancer.
//!
//! Lightness is Rec. 709 relative luminance of linear RGB. Staying linear
//! keeps the ratio between two exposures equal to `2^ΔEV`, which is what the
//! patch comparison relies on. One-channel frames use the plane directly.

use rayon::prelude::*;

use crate::classify::GridLayout;
use crate::frame::Frame;
use crate::plane::Plane;

pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Below this chroma (max - min) a pixel has no meaningful hue.
const ACHROMATIC_CHROMA: f32 = 1e-6;

#[inline]
pub fn lightness(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

pub fn lightness_plane(r: &Plane, g: &Plane, b: &Plane) -> Plane {
    debug_assert!(r.same_size(g) && r.same_size(b));
    let mut out = Plane::zeros(r.width(), r.height());
    out.pixels_mut()
        .par_iter_mut()
        .zip(r.pixels().par_iter())
        .zip(g.pixels().par_iter())
        .zip(b.pixels().par_iter())
        .for_each(|(((v, &r), &g), &b)| *v = lightness(r, g, b));
    out
}

/// Mean lightness of three planes.
pub fn average_lightness_rgb(r: &Plane, g: &Plane, b: &Plane) -> f32 {
    lightness_plane(r, g, b).mean()
}

/// Mean lightness of a frame.
pub fn average_lightness(frame: &Frame) -> f32 {
    match frame.planes() {
        [gray] => gray.mean(),
        [r, g, b] => average_lightness_rgb(r, g, b),
        _ => unreachable!("frames hold 1 or 3 planes"),
    }
}

/// Mean lightness of grid cell (`col`, `row`). Empty cells report 0.
pub fn average_cell_lightness(frame: &Frame, layout: &GridLayout, col: usize, row: usize) -> f32 {
    let xs = layout.cell_x_range(col);
    let ys = layout.cell_y_range(row);
    let count = xs.len() * ys.len();
    if count == 0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for y in ys {
        for x in xs.clone() {
            sum += frame.lightness_at(x, y) as f64;
        }
    }
    (sum / count as f64) as f32
}

/// HSL hue in `[0, 1)`, or `None` for grey or non-finite pixels.
pub fn hue(r: f32, g: f32, b: f32) -> Option<f32> {
    if !(r.is_finite() && g.is_finite() && b.is_finite()) {
        return None;
    }
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;
    if !chroma.is_finite() || chroma <= ACHROMATIC_CHROMA {
        return None;
    }

    let sector = if max == r {
        ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        (b - r) / chroma + 2.0
    } else {
        (r - g) / chroma + 4.0
    };
    Some((sector / 6.0).rem_euclid(1.0))
}

/// Mean of squared hue over the chromatic pixels of a frame.
///
/// Grey frames and one-channel frames have no hue and report 0.
pub fn hue_squared_mean(frame: &Frame) -> f32 {
    let [r, g, b] = frame.planes() else {
        return 0.0;
    };

    let (sum, count) = r
        .pixels()
        .par_iter()
        .zip(g.pixels().par_iter())
        .zip(b.pixels().par_iter())
        .filter_map(|((&r, &g), &b)| hue(r, g, b))
        .map(|h| ((h * h) as f64, 1usize))
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}
