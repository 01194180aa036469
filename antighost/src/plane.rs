//! Dense single-channel `f32` image plane.
//!
//! Every stage of the engine (gradients, divergence, Poisson solutions, feather
//! weights) exchanges data as [`Plane`]s. Storage is row-major; `(x, y)` indexes
//! column `x` of row `y`.

use std::ops::{Deref, DerefMut, Index, IndexMut};

use rayon::prelude::*;

use crate::common::{parallel_map_f32, parallel_sum_f64};
use crate::error::{Error, Result};
use crate::frame::Dimensions;

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pixels: Vec<f32>,
    width: usize,
    height: usize,
}

impl Plane {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, 0.0)
    }

    pub fn new_filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    /// Build a plane by evaluating `f(x, y)` for every pixel, in parallel.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f32 + Sync + Send,
    {
        if width == 0 {
            return Self::new(0, height, Vec::new());
        }
        let pixels = parallel_map_f32(width * height, |idx| f(idx % width, idx / width));
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut f32 {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    /// Value at `(x, y)` with coordinates clamped into the plane.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.pixels[cy * self.width + cx]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height, 1)
    }

    #[inline]
    pub fn same_size(&self, other: &Plane) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Fails with [`Error::DimensionMismatch`] unless `other` has this plane's size.
    pub fn ensure_same_size(&self, other: &Plane, what: &str) -> Result<()> {
        if self.same_size(other) {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                what: what.to_string(),
                expected: self.dimensions(),
                actual: other.dimensions(),
            })
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f32> {
        self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Parallel iterator over mutable rows, paired with their row index.
    pub fn par_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = (usize, &mut [f32])> {
        // chunks of zero width would panic; an empty plane simply yields no rows
        let width = self.width.max(1);
        self.pixels.par_chunks_mut(width).enumerate()
    }

    /// Smallest finite value, or `None` for an empty plane.
    pub fn min(&self) -> Option<f32> {
        self.pixels
            .par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce_with(f32::min)
    }

    /// Largest finite value, or `None` for an empty plane.
    pub fn max(&self) -> Option<f32> {
        self.pixels
            .par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce_with(f32::max)
    }

    pub fn mean(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        (parallel_sum_f64(&self.pixels) / self.pixels.len() as f64) as f32
    }

    /// Apply `f` to every pixel in place.
    pub fn map_inplace<F>(&mut self, f: F)
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        self.pixels.par_iter_mut().for_each(|v| *v = f(*v));
    }

    /// Return a new plane with `f` applied to every pixel.
    pub fn map<F>(&self, f: F) -> Plane
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        let mut out = self.clone();
        out.map_inplace(f);
        out
    }

    /// Translate the plane: output `(x, y)` reads input `(x + dx, y + dy)`.
    ///
    /// Positions that fall outside the source replicate the nearest edge pixel,
    /// so a shifted plane never contains artificial black borders.
    pub fn shifted(&self, dx: i32, dy: i32) -> Plane {
        if (dx == 0 && dy == 0) || self.pixels.is_empty() {
            return self.clone();
        }
        Plane::from_fn(self.width, self.height, |x, y| {
            self.get_clamped(x as isize + dx as isize, y as isize + dy as isize)
        })
    }
}

impl Index<(usize, usize)> for Plane {
    type Output = f32;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl IndexMut<(usize, usize)> for Plane {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl Deref for Plane {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl DerefMut for Plane {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

impl From<Plane> for Vec<f32> {
    #[inline]
    fn from(plane: Plane) -> Self {
        plane.pixels
    }
}
