use super::*;
use crate::frame::Frame;
use crate::plane::Plane;
use crate::testing::{init_tracing, moving_square_stack, ramp_scene, static_rgb_stack, with_square};

fn expected_cells() -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let first = (8..=11).contains(&row) && (8..=11).contains(&col);
            let second = (25..=28).contains(&row) && (25..=28).contains(&col);
            if first || second {
                cells.push((row, col));
            }
        }
    }
    cells
}

#[test]
fn test_moving_square_flags_both_positions() {
    init_tracing();
    let stack = moving_square_stack();
    let result = classify_pair(&stack, 0, 1, &ClassifierConfig::default()).unwrap();
    assert_eq!(result.delta_ev, 1.0);
    assert_eq!(result.grid.ghosted_cells().collect::<Vec<_>>(), expected_cells());
}

#[test]
fn test_static_bracket_has_no_ghosts() {
    let stack = static_rgb_stack(160, 120, &[-1.0, 0.0, 1.0]);
    for donor in [0, 2] {
        let result = classify_pair(&stack, 1, donor, &ClassifierConfig::default()).unwrap();
        assert!(!result.has_ghosts(), "donor {donor}: {:?}", result.grid);
    }
}

#[test]
fn test_border_cells_are_never_flagged() {
    // every pixel of the donor disagrees with the reference
    let reference = Frame::gray(Plane::new_filled(120, 120, 0.3));
    let donor = Frame::gray(Plane::new_filled(120, 120, 0.05));
    let stack = ExposureStack::new(vec![
        ExposureItem::new(reference, 0.0),
        ExposureItem::new(donor, 0.0),
    ])
    .unwrap();
    let result = classify_pair(&stack, 0, 1, &ClassifierConfig::default()).unwrap();

    for i in 0..GRID_SIZE {
        assert!(!result.grid.get(0, i));
        assert!(!result.grid.get(GRID_SIZE - 1, i));
        assert!(!result.grid.get(i, 0));
        assert!(!result.grid.get(i, GRID_SIZE - 1));
    }
    assert_eq!(result.grid.ghosted_count(), (GRID_SIZE - 2) * (GRID_SIZE - 2));
}

#[test]
fn test_estimated_delta_ev_ignores_wrong_metadata() {
    let scene = ramp_scene(200, 200);
    let stack = ExposureStack::new(vec![
        ExposureItem::new(Frame::gray(scene.clone()), 0.0),
        // metadata claims +2 EV, pixels say +1
        ExposureItem::new(Frame::gray(scene.map(|v| v * 2.0)), 2.0),
    ])
    .unwrap();

    let trusting = classify_pair(&stack, 0, 1, &ClassifierConfig::default()).unwrap();
    assert!(trusting.has_ghosts());

    let config = ClassifierConfig::default().with_estimated_delta_ev(true);
    let measuring = classify_pair(&stack, 0, 1, &config).unwrap();
    assert!((measuring.delta_ev - 1.0).abs() < 1e-4);
    assert!(!measuring.has_ghosts());
}

#[test]
fn test_offset_compensates_registration() {
    let scene = ramp_scene(200, 200);
    let textured = Plane::from_fn(200, 200, |x, y| {
        scene.get(x, y) * if (x / 3 + y / 5) % 2 == 0 { 1.0 } else { 1.5 }
    });
    let shifted = textured.shifted(-4, 0);
    let stack = ExposureStack::new(vec![
        ExposureItem::new(Frame::gray(textured), 0.0),
        ExposureItem::new(Frame::gray(shifted), 0.0).with_offset(4, 0),
    ])
    .unwrap();
    let result = classify_pair(&stack, 0, 1, &ClassifierConfig::default()).unwrap();
    assert_eq!(result.offset, (4, 0));
    assert!(!result.has_ghosts(), "{:?}", result.grid);
}

#[test]
fn test_classify_pair_rejects_same_frame() {
    let stack = moving_square_stack();
    assert!(matches!(
        classify_pair(&stack, 1, 1, &ClassifierConfig::default()),
        Err(Error::DonorIsReference { index: 1 })
    ));
}

#[test]
fn test_classify_pair_rejects_degenerate_input() {
    let stack = ExposureStack::new(vec![
        ExposureItem::new(Frame::gray(Plane::zeros(0, 5)), 0.0),
        ExposureItem::new(Frame::gray(Plane::zeros(0, 5)), 1.0),
    ])
    .unwrap();
    assert!(matches!(
        classify_pair(&stack, 0, 1, &ClassifierConfig::default()),
        Err(Error::DegenerateInput { width: 0, height: 5 })
    ));
}

#[test]
fn test_compare_patches_matches_classifier() {
    let stack = moving_square_stack();
    let config = ClassifierConfig::default();
    let result = classify_pair(&stack, 0, 1, &config).unwrap();
    let params = PatchComparison::new(&config, result.delta_ev, result.offset);
    let (a, b) = (&stack.items()[0], &stack.items()[1]);
    for (row, col) in [(9, 9), (26, 27), (20, 20), (2, 3)] {
        assert_eq!(
            compare_patches(a, b, col, row, &result.layout, &params),
            result.grid.get(row, col),
            "cell ({row}, {col})"
        );
    }
}

#[test]
fn test_small_square_below_deviant_fraction_is_ignored() {
    let scene = ramp_scene(240, 240);
    // one pixel out of a 36-pixel cell is under 5%
    let donor = with_square(&scene, 61, 61, 1, 0.01);
    let stack = ExposureStack::new(vec![
        ExposureItem::new(Frame::gray(scene), 0.0),
        ExposureItem::new(Frame::gray(donor), 0.0),
    ])
    .unwrap();
    let result = classify_pair(&stack, 0, 1, &ClassifierConfig::default()).unwrap();
    assert!(!result.has_ghosts());
}
