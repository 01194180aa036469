//! 1-D DCT-II and its inverse on top of a complex FFT of the same length.
//!
//! Uses the even/odd reordering: with `v[i] = x[2i]` and
//! `v[N-1-i] = x[2i+1]`, the unnormalised DCT-II is
//! `X[k] = Re(e^{-iπk/2N} · FFT(v)[k])`.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Cached transform of one length.
pub(crate) struct Dct {
    len: usize,
    forward_fft: Arc<dyn Fft<f64>>,
    inverse_fft: Arc<dyn Fft<f64>>,
    /// `e^{-iπk/2N}` for `k` in `0..N`.
    twiddles: Vec<Complex<f64>>,
}

/// Per-thread working memory for [`Dct`].
pub(crate) struct DctScratch {
    buffer: Vec<Complex<f64>>,
    fft_scratch: Vec<Complex<f64>>,
}

impl Dct {
    pub fn new(len: usize, planner: &mut FftPlanner<f64>) -> Self {
        let forward_fft = planner.plan_fft_forward(len);
        let inverse_fft = planner.plan_fft_inverse(len);
        let twiddles = (0..len)
            .map(|k| Complex::from_polar(1.0, -PI * k as f64 / (2 * len) as f64))
            .collect();
        Self {
            len,
            forward_fft,
            inverse_fft,
            twiddles,
        }
    }

    pub fn make_scratch(&self) -> DctScratch {
        let scratch_len = self
            .forward_fft
            .get_inplace_scratch_len()
            .max(self.inverse_fft.get_inplace_scratch_len());
        DctScratch {
            buffer: vec![Complex::new(0.0, 0.0); self.len],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// In-place unnormalised DCT-II: `X[k] = Σ x[n] cos(πk(2n+1) / 2N)`.
    pub fn forward(&self, data: &mut [f64], scratch: &mut DctScratch) {
        let n = self.len;
        debug_assert_eq!(data.len(), n);
        let buffer = &mut scratch.buffer;

        for i in 0..n.div_ceil(2) {
            buffer[i] = Complex::new(data[2 * i], 0.0);
        }
        for i in 0..n / 2 {
            buffer[n - 1 - i] = Complex::new(data[2 * i + 1], 0.0);
        }

        self.forward_fft
            .process_with_scratch(buffer, &mut scratch.fft_scratch);

        for k in 0..n {
            data[k] = (self.twiddles[k] * buffer[k]).re;
        }
    }

    /// In-place inverse of [`Dct::forward`] (a scaled DCT-III).
    pub fn inverse(&self, data: &mut [f64], scratch: &mut DctScratch) {
        let n = self.len;
        debug_assert_eq!(data.len(), n);
        let buffer = &mut scratch.buffer;

        buffer[0] = Complex::new(data[0], 0.0);
        for k in 1..n {
            let w = Complex::new(data[k], -data[n - k]);
            buffer[k] = self.twiddles[k].conj() * w;
        }

        self.inverse_fft
            .process_with_scratch(buffer, &mut scratch.fft_scratch);

        let norm = 1.0 / n as f64;
        for i in 0..n.div_ceil(2) {
            data[2 * i] = buffer[i].re * norm;
        }
        for i in 0..n / 2 {
            data[2 * i + 1] = buffer[n - 1 - i].re * norm;
        }
    }
}
