//! Synthetic scenes shared by the unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::{ExposureItem, ExposureStack, Frame};
use crate::plane::Plane;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Smooth diagonal ramp from 0.2 at the top-left to 0.4 at the bottom-right.
pub fn ramp_scene(width: usize, height: usize) -> Plane {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    Plane::from_fn(width, height, |x, y| 0.2 + 0.2 * (x + y) as f32 / span)
}

/// Copy of `plane` with a `size` x `size` square of `value` at `(x0, y0)`.
pub fn with_square(plane: &Plane, x0: usize, y0: usize, size: usize, value: f32) -> Plane {
    let mut out = plane.clone();
    for y in y0..(y0 + size).min(plane.height()) {
        for x in x0..(x0 + size).min(plane.width()) {
            out[(x, y)] = value;
        }
    }
    out
}

/// Uniform noise in `[low, high)`, reproducible from `seed`.
pub fn random_plane(width: usize, height: usize, low: f32, high: f32, seed: u64) -> Plane {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels = (0..width * height).map(|_| rng.random_range(low..high)).collect();
    Plane::new(width, height, pixels)
}

/// RGB frame whose channels are `plane` scaled by `tint`.
pub fn tinted_frame(plane: &Plane, tint: [f32; 3]) -> Frame {
    let [r, g, b] = tint.map(|t| plane.map(|v| v * t));
    Frame::rgb(r, g, b).unwrap()
}

/// Two-frame gray bracket of a ramp scene where a dark square moves.
///
/// Frame 0 (EV 0) has the square at `(50, 50)`, frame 1 (EV +1, twice as
/// bright) has it at `(150, 150)`. Both squares are 20 pixels wide.
pub fn moving_square_stack() -> ExposureStack {
    let scene = ramp_scene(256, 256);
    let reference = with_square(&scene, 50, 50, 20, 0.05);
    let donor = with_square(&scene.map(|v| v * 2.0), 150, 150, 20, 0.1);
    ExposureStack::new(vec![
        ExposureItem::new(Frame::gray(reference), 0.0),
        ExposureItem::new(Frame::gray(donor), 1.0),
    ])
    .unwrap()
}

/// A bracket of the same static scene at the given EVs, in RGB.
pub fn static_rgb_stack(width: usize, height: usize, evs: &[f32]) -> ExposureStack {
    let scene = ramp_scene(width, height);
    let items = evs
        .iter()
        .map(|&ev| {
            let gain = 2f32.powf(ev);
            ExposureItem::new(tinted_frame(&scene.map(|v| v * gain), [0.9, 1.0, 0.8]), ev)
        })
        .collect();
    ExposureStack::new(items).unwrap()
}
