//! Bit-packed boolean plane used for full-resolution ghost masks.
//!
//! The mask-painting tool hands the engine one bit per pixel; `true` marks a
//! pixel whose content must come from the donor exposure.

use std::ops::Index;

use crate::frame::Dimensions;
use crate::plane::Plane;

const BITS_PER_WORD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPlane {
    words: Vec<u64>,
    width: usize,
    height: usize,
    len: usize,
}

impl BitPlane {
    pub fn new_filled(width: usize, height: usize, value: bool) -> Self {
        let len = width * height;
        let fill = if value { !0u64 } else { 0u64 };
        let mut plane = Self {
            words: vec![fill; len.div_ceil(BITS_PER_WORD)],
            width,
            height,
            len,
        };
        plane.clear_tail();
        plane
    }

    pub fn new_default(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, false)
    }

    /// Build a mask from a predicate evaluated at every `(x, y)`.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> bool,
    {
        let mut plane = Self::new_default(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    plane.set_xy(x, y, true);
                }
            }
        }
        plane
    }

    /// Binarize a painted coverage plane (e.g. a brush alpha channel).
    pub fn from_coverage(coverage: &Plane, threshold: f32) -> Self {
        Self::from_fn(coverage.width(), coverage.height(), |x, y| {
            coverage.get(x, y) > threshold
        })
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
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.words[idx / BITS_PER_WORD] >> (idx % BITS_PER_WORD)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        debug_assert!(idx < self.len);
        let bit = 1u64 << (idx % BITS_PER_WORD);
        if value {
            self.words[idx / BITS_PER_WORD] |= bit;
        } else {
            self.words[idx / BITS_PER_WORD] &= !bit;
        }
    }

    #[inline]
    pub fn get_xy(&self, x: usize, y: usize) -> bool {
        debug_assert!(x < self.width && y < self.height);
        self.get(y * self.width + x)
    }

    #[inline]
    pub fn set_xy(&mut self, x: usize, y: usize, value: bool) {
        debug_assert!(x < self.width && y < self.height);
        self.set(y * self.width + x, value);
    }

    /// Set every pixel of the axis-aligned rectangle `[x0, x1) x [y0, y1)`,
    /// clipped to the plane.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, value: bool) {
        for y in y0.min(self.height)..y1.min(self.height) {
            for x in x0.min(self.width)..x1.min(self.width) {
                self.set_xy(x, y, value);
            }
        }
    }

    /// Number of set pixels.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `true` when no pixel is set.
    pub fn none(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Expand to a `0.0` / `1.0` plane.
    pub fn to_plane(&self) -> Plane {
        Plane::from_fn(self.width, self.height, |x, y| {
            if self.get_xy(x, y) { 1.0 } else { 0.0 }
        })
    }

    // Bits past `len` in the last word must stay zero so `count_ones` is exact.
    fn clear_tail(&mut self) {
        let used = self.len % BITS_PER_WORD;
        if used == 0 {
            return;
        }
        if let Some(last) = self.words.last_mut() {
            *last &= (1u64 << used) - 1;
        }
    }
}

impl Index<(usize, usize)> for BitPlane {
    type Output = bool;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        if self.get_xy(x, y) { &true } else { &false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_filled_true_counts_only_real_pixels() {
        let plane = BitPlane::new_filled(10, 7, true);
        assert_eq!(plane.len(), 70);
        assert_eq!(plane.count_ones(), 70);
        assert!(!plane.none());
    }

    #[test]
    fn test_set_and_get_xy() {
        let mut plane = BitPlane::new_default(100, 3);
        plane.set_xy(99, 2, true);
        plane.set_xy(63, 0, true);
        assert!(plane.get_xy(99, 2));
        assert!(plane.get_xy(63, 0));
        assert!(!plane.get_xy(64, 0));
        assert!(plane[(99, 2)]);
        assert_eq!(plane.count_ones(), 2);

        plane.set_xy(63, 0, false);
        assert_eq!(plane.count_ones(), 1);
    }

    #[test]
    fn test_fill_rect_clips_to_plane() {
        let mut plane = BitPlane::new_default(8, 8);
        plane.fill_rect(6, 6, 20, 20, true);
        assert_eq!(plane.count_ones(), 4);
        assert!(plane.get_xy(7, 7));
        assert!(!plane.get_xy(5, 7));
    }

    #[test]
    fn test_from_coverage_thresholds() {
        let coverage = Plane::new(4, 1, vec![0.0, 0.4, 0.6, 1.0]);
        let mask = BitPlane::from_coverage(&coverage, 0.5);
        assert_eq!(mask.count_ones(), 2);
        assert!(!mask.get_xy(1, 0));
        assert!(mask.get_xy(2, 0));
    }

    #[test]
    fn test_to_plane() {
        let mask = BitPlane::from_fn(3, 1, |x, _| x == 1);
        assert_eq!(mask.to_plane().pixels(), &[0.0, 1.0, 0.0]);
    }
}
