//! End-to-end: a dark square moves between two exposures of a ramp.

use antighost::prelude::*;
use antighost::{GRID_SIZE, classify_pair};

const SIZE: usize = 256;
const SQUARE: usize = 20;

fn background(x: usize, y: usize) -> f32 {
    0.2 + 0.2 * (x + y) as f32 / (2 * SIZE - 2) as f32
}

fn frame(gain: f32, square_at: usize, square_value: f32) -> Frame {
    let square = square_at..square_at + SQUARE;
    let pixels = (0..SIZE * SIZE)
        .map(|i| {
            let (x, y) = (i % SIZE, i / SIZE);
            if square.contains(&x) && square.contains(&y) {
                square_value
            } else {
                background(x, y) * gain
            }
        })
        .collect();
    Frame::gray(Plane::new(SIZE, SIZE, pixels))
}

fn stack() -> ExposureStack {
    ExposureStack::new(vec![
        ExposureItem::new(frame(1.0, 50, 0.05), 0.0),
        ExposureItem::new(frame(2.0, 150, 0.1), 1.0),
    ])
    .unwrap()
}

#[test]
fn classifier_flags_exactly_the_cells_under_both_squares() {
    let result = classify_pair(&stack(), 0, 1, &ClassifierConfig::default()).unwrap();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let under_first = (8..=11).contains(&row) && (8..=11).contains(&col);
            let under_second = (25..=28).contains(&row) && (25..=28).contains(&col);
            assert_eq!(
                result.grid.get(row, col),
                under_first || under_second,
                "cell (row {row}, col {col})"
            );
        }
    }
}

#[test]
fn composite_shows_one_square_without_seams() {
    let stack = stack();
    let outcome = Antighoster::new(AntighostConfig::default())
        .unwrap()
        .run(&stack, &Request::automatic(0))
        .unwrap();
    assert!(outcome.is_corrected());
    let result = outcome.frame().plane(0);

    // the reference's square is gone
    for y in 50..70 {
        for x in 50..70 {
            let bg = background(x, y);
            assert!((result.get(x, y) - bg).abs() < 2e-3, "({x}, {y}) = {}", result.get(x, y));
        }
    }

    // the donor's square appears at reference exposure
    for y in 150..170 {
        for x in 150..170 {
            assert!((result.get(x, y) - 0.05).abs() < 2e-3, "({x}, {y}) = {}", result.get(x, y));
        }
    }

    // seams: pixels along the boundary of each corrected block stay close to
    // the reference background
    let reference = stack.items()[0].frame.plane(0);
    for &(lo, hi) in &[(48usize, 72usize), (150, 174)] {
        for t in lo..hi {
            for &(x, y) in &[(t, lo - 1), (t, hi), (lo - 1, t), (hi, t)] {
                let diff = (result.get(x, y) - reference.get(x, y)).abs();
                assert!(diff < 0.01, "seam at ({x}, {y}) differs by {diff}");
            }
        }
    }
}

#[test]
fn static_scene_is_returned_pixel_exact() {
    let stack = ExposureStack::new(vec![
        ExposureItem::new(frame(1.0, 50, 0.05), 0.0),
        ExposureItem::new(frame(2.0, 50, 0.1), 1.0),
    ])
    .unwrap();
    let outcome = antighost::deghost(&stack, 0, AntighostConfig::default()).unwrap();
    assert!(!outcome.is_corrected());
    assert_eq!(outcome.frame(), &stack.items()[0].frame);
}
