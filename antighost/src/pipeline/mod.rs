//! The anti-ghosting orchestrator.
//!
//! One composite runs through these stages:
//!
//! ```text
//! Automatic: Classifying -> Blending       -> Solving -> Rebalancing -> Done
//! Manual:                   ManualBlending -> Solving -> Rebalancing -> Done
//! ```
//!
//! Every channel is handled in the log-irradiance domain: the donor is
//! aligned to the reference, both are log-transformed, their gradients are
//! blended under the ghost mask, and the blended field is integrated back
//! with the Poisson solver. The solve is a barrier: all channels are solved
//! before any is rebalanced. The caller's stack is never modified.


use rayon::prelude::*;

use crate::bit_plane::BitPlane;
use crate::blend::{GhostMask, GridMask, PixelMask, blend_gradients, blend_pixels};
use crate::classify::{
    ClassificationGrid, classify_pair, rank_donors, resolve_delta_ev, select_good_frame,
};
use crate::config::{Anchor, AntighostConfig, BlendDomain};
use crate::error::{Error, Result};
use crate::frame::{Dimensions, ExposureItem, ExposureStack, Frame};
use crate::gradient::{compute_gradient, compute_irradiance, compute_log_irradiance};
use crate::plane::Plane;
use crate::poisson::{PoissonSolver, clamp_to_zero, plane_max, plane_min};
use crate::progress::{ProgressCallback, Stage};
use crate::rebalance::{anchor_to_reference, color_balance, rebalance_unblended};

/// How the ghost mask is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Classify the pair on the coarse grid. With `donor: None` the
    /// best-ranked donor is used.
    Automatic { donor: Option<usize> },
    /// Use a full-resolution mask painted by the user.
    Manual { mask: BitPlane, donor: usize },
}

/// One anti-ghosting request against a stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Frame whose ghosted regions are replaced.
    pub reference: usize,
    pub mode: Mode,
}

impl Request {
    pub fn automatic(reference: usize) -> Self {
        Self {
            reference,
            mode: Mode::Automatic { donor: None },
        }
    }

    pub fn with_donor(reference: usize, donor: usize) -> Self {
        Self {
            reference,
            mode: Mode::Automatic { donor: Some(donor) },
        }
    }

    pub fn manual(reference: usize, donor: usize, mask: BitPlane) -> Self {
        Self {
            reference,
            mode: Mode::Manual { mask, donor },
        }
    }
}

/// A ghost-corrected frame and how it was produced.
#[derive(Debug, Clone)]
pub struct Deghosted {
    pub frame: Frame,
    pub reference: usize,
    pub donor: usize,
    /// Classifier grid, in automatic mode.
    pub grid: Option<ClassificationGrid>,
    /// Pixels taken wholly from the donor.
    pub ghosted_pixels: usize,
}

/// Result of one request.
#[derive(Debug, Clone)]
pub enum Outcome {
    Corrected(Deghosted),
    /// Nothing to correct; carries an untouched copy of the reference frame.
    NoGhostingDetected(Frame),
}

impl Outcome {
    pub fn frame(&self) -> &Frame {
        match self {
            Outcome::Corrected(d) => &d.frame,
            Outcome::NoGhostingDetected(frame) => frame,
        }
    }

    pub fn into_frame(self) -> Frame {
        match self {
            Outcome::Corrected(d) => d.frame,
            Outcome::NoGhostingDetected(frame) => frame,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self, Outcome::Corrected(_))
    }
}

/// Every frame of a bracket corrected against one good frame.
#[derive(Debug, Clone)]
pub struct DeghostedStack {
    /// Frame used as donor for all others; returned unchanged.
    pub good_frame: usize,
    /// One frame per input frame, in stack order.
    pub frames: Vec<Frame>,
    /// Indices of the frames that were actually modified.
    pub corrected: Vec<usize>,
}

/// Anti-ghosting engine: configuration plus an optional progress sink.
#[derive(Debug, Clone, Default)]
pub struct Antighoster {
    config: AntighostConfig,
    progress: ProgressCallback,
}

impl Antighoster {
    pub fn new(config: AntighostConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress: ProgressCallback::none(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &AntighostConfig {
        &self.config
    }

    /// Run one request. Errors are structural; nothing partial is returned.
    pub fn run(&self, stack: &ExposureStack, request: &Request) -> Result<Outcome> {
        let reference = request.reference;
        let ref_item = stack.get(reference)?;
        let dims = stack.dimensions();
        if dims.is_degenerate() {
            return Err(Error::DegenerateInput {
                width: dims.width,
                height: dims.height,
            });
        }
        self.progress.report(Stage::Idle, 0, 1);

        let outcome = match &request.mode {
            Mode::Automatic { donor } => {
                let donor = match *donor {
                    Some(donor) => donor,
                    None => rank_donors(stack, reference)?[0],
                };
                let donor_item = checked_donor(stack, reference, donor)?;

                self.progress.report(Stage::Classifying, 0, 1);
                let classification =
                    classify_pair(stack, reference, donor, &self.config.classifier)?;
                self.progress.report(Stage::Classifying, 1, 1);
                if !classification.has_ghosts() {
                    tracing::info!(reference, donor, "No ghosting detected");
                    self.progress.report(Stage::Done, 1, 1);
                    return Ok(Outcome::NoGhostingDetected(ref_item.frame.clone()));
                }

                let mask = GridMask::new(
                    &classification.grid,
                    &classification.layout,
                    self.config.blend.feather_radius,
                );
                let frame = self.compose(
                    ref_item,
                    donor_item,
                    classification.delta_ev,
                    &mask,
                    Stage::Blending,
                )?;
                Outcome::Corrected(Deghosted {
                    frame,
                    reference,
                    donor,
                    ghosted_pixels: mask.ghosted_pixels(),
                    grid: Some(classification.grid),
                })
            }
            Mode::Manual { mask, donor } => {
                let donor = *donor;
                let donor_item = checked_donor(stack, reference, donor)?;
                if mask.width() != dims.width || mask.height() != dims.height {
                    return Err(Error::DimensionMismatch {
                        what: "ghost mask".to_string(),
                        expected: Dimensions::new(dims.width, dims.height, 1),
                        actual: mask.dimensions(),
                    });
                }
                if mask.none() {
                    tracing::info!(reference, donor, "Empty ghost mask, nothing to correct");
                    self.progress.report(Stage::Done, 1, 1);
                    return Ok(Outcome::NoGhostingDetected(ref_item.frame.clone()));
                }

                let delta_ev = resolve_delta_ev(ref_item, donor_item, &self.config.classifier);
                let mask = PixelMask::new(mask.clone(), self.config.blend.feather_radius);
                let frame =
                    self.compose(ref_item, donor_item, delta_ev, &mask, Stage::ManualBlending)?;
                Outcome::Corrected(Deghosted {
                    frame,
                    reference,
                    donor,
                    ghosted_pixels: mask.ghosted_pixels(),
                    grid: None,
                })
            }
        };

        if let Outcome::Corrected(d) = &outcome {
            tracing::info!(
                reference = d.reference,
                donor = d.donor,
                ghosted_pixels = d.ghosted_pixels,
                "Ghosting corrected"
            );
        }
        self.progress.report(Stage::Done, 1, 1);
        Ok(outcome)
    }

    /// Correct every frame against the stack's good frame, in parallel.
    pub fn deghost_stack(&self, stack: &ExposureStack) -> Result<DeghostedStack> {
        let good_frame = select_good_frame(stack);
        tracing::info!(good_frame, frames = stack.len(), "Deghosting stack");

        let outcomes: Vec<Outcome> = (0..stack.len())
            .into_par_iter()
            .map(|index| {
                if index == good_frame {
                    Ok(Outcome::NoGhostingDetected(stack.items()[index].frame.clone()))
                } else {
                    self.run(stack, &Request::with_donor(index, good_frame))
                }
            })
            .collect::<Result<_>>()?;

        let corrected = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_corrected())
            .map(|(i, _)| i)
            .collect();
        Ok(DeghostedStack {
            good_frame,
            frames: outcomes.into_iter().map(Outcome::into_frame).collect(),
            corrected,
        })
    }

    fn compose(
        &self,
        reference: &ExposureItem,
        donor: &ExposureItem,
        delta_ev: f32,
        mask: &dyn GhostMask,
        blend_stage: Stage,
    ) -> Result<Frame> {
        let donor_frame = donor.aligned_to(reference);
        let channels = reference.frame.channels();
        let ref_planes = reference.frame.planes();

        let mut planes = match self.config.blend.domain {
            BlendDomain::Gradient => {
                self.compose_gradient(ref_planes, donor_frame.planes(), mask, blend_stage)?
            }
            BlendDomain::Pixel => {
                let scale = (-delta_ev).exp2();
                ref_planes
                    .par_iter()
                    .zip(donor_frame.planes().par_iter())
                    .enumerate()
                    .map(|(c, (r, d))| {
                        let blended = blend_pixels(r, d, scale, mask);
                        self.progress.report(blend_stage, c + 1, channels);
                        blended
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        self.progress.report(Stage::Rebalancing, 0, 1);
        clamp_to_zero(&mut planes, self.config.rebalance.zero_floor);
        if self.config.rebalance.enabled {
            let weights = mask.weights();
            let unblended = weights.pixels().iter().filter(|&&w| w == 0.0).count();
            let (nb_min, nb_max) = self.config.rebalance.clip.resolve(unblended);
            rebalance_unblended(&mut planes, ref_planes, weights, nb_min, nb_max)?;
        }
        self.progress.report(Stage::Rebalancing, 1, 1);
        tracing::debug!(
            min = plane_min(&planes),
            max = plane_max(&planes),
            "Composite range after rebalancing"
        );

        Frame::from_planes(planes)
    }

    fn compose_gradient(
        &self,
        ref_planes: &[Plane],
        donor_planes: &[Plane],
        mask: &dyn GhostMask,
        blend_stage: Stage,
    ) -> Result<Vec<Plane>> {
        let channels = ref_planes.len();

        let blended: Vec<(Plane, Plane)> = ref_planes
            .par_iter()
            .zip(donor_planes.par_iter())
            .enumerate()
            .map(|(c, (r, d))| {
                let ref_log = compute_log_irradiance(r);
                let donor_log = compute_log_irradiance(d);
                let field = blend_gradients(
                    &compute_gradient(&ref_log),
                    &compute_gradient(&donor_log),
                    mask,
                )?;
                let divergence = field.divergence()?;
                self.progress.report(blend_stage, c + 1, channels);
                Ok((ref_log, divergence))
            })
            .collect::<Result<_>>()?;
        tracing::debug!(channels, "Blended gradient fields");

        let (width, height) = (ref_planes[0].width(), ref_planes[0].height());
        let solver = PoissonSolver::new(width, height);
        let solved: Vec<Plane> = blended
            .par_iter()
            .enumerate()
            .map(|(c, (_, divergence))| {
                let u = solver.solve(divergence);
                self.progress.report(Stage::Solving, c + 1, channels);
                u
            })
            .collect::<Result<_>>()?;
        tracing::debug!(channels, width, height, "Solved Poisson equations");

        solved
            .into_par_iter()
            .zip(blended.par_iter())
            .zip(ref_planes.par_iter())
            .map(|((mut u, (ref_log, _)), reference)| -> Result<Plane> {
                match self.config.blend.anchor {
                    Anchor::UnmaskedMean => {
                        let shift = anchor_to_reference(&mut u, ref_log, mask.weights())?;
                        tracing::debug!(shift, "Anchored reconstruction");
                        Ok(compute_irradiance(&u))
                    }
                    Anchor::Pixel { x, y } => {
                        let mut linear = compute_irradiance(&u);
                        color_balance(&mut linear, reference, x, y)?;
                        Ok(linear)
                    }
                }
            })
            .collect()
    }
}

/// Correct `reference` against an automatically chosen donor with `config`.
pub fn deghost(
    stack: &ExposureStack,
    reference: usize,
    config: AntighostConfig,
) -> Result<Outcome> {
    Antighoster::new(config)?.run(stack, &Request::automatic(reference))
}

fn checked_donor(stack: &ExposureStack, reference: usize, donor: usize) -> Result<&ExposureItem> {
    let item = stack.get(donor)?;
    if donor == reference {
        return Err(Error::DonorIsReference { index: donor });
    }
    Ok(item)
}
