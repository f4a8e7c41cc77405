//! The tour state machine.
//!
//! [`TourEngine`] walks an endless chain of rotation paths. Each external tick
//! calls [`TourEngine::advance`], which moves one step along the current path,
//! rests at the arrival frame if pausing is enabled, and asks the
//! [`FrameProvider`] for the next target once the current one is reached.
//!
//! # State Machine
//!
//! | State | Condition | Action |
//! |-------|-----------|--------|
//! | Moving | `step < move_steps` | `step += 1` |
//! | Moving | `step == move_steps`, pausing | `step = 1`, enter Paused |
//! | Moving | `step == move_steps`, no pausing | plan next path, stay Moving |
//! | Paused | `step < pause_steps` | `step += 1` |
//! | Paused | `step == pause_steps` | plan next path, enter Moving |
//!
//! Planning computes the whole next transition before touching any engine
//! state, so a failed `advance` leaves the engine exactly as it was. A
//! failure is final: the engine stores the error, later calls to
//! [`TourEngine::advance`] return it without consulting the provider, and
//! the query methods keep reporting the last valid state.
//!
//! # Example
//!
//! ```
//! use grand_tour::{Duration, FrameProvider, TourConfig, TourEngine};
//! use nalgebra::DMatrix;
//!
//! let data = DMatrix::from_fn(50, 5, |i, j| ((i * 7 + j * 3) % 11) as f64);
//! let provider = FrameProvider::random_seeded(5, 2, Duration::fixed(20)?, 1)?;
//! let mut tour = TourEngine::new(data, provider, TourConfig::default())?;
//!
//! for _ in 0..100 {
//!     let projection = tour.advance()?;
//!     assert_eq!(projection.shape(), (50, 2));
//! }
//! # Ok::<(), grand_tour::TourError>(())
//! ```

use std::sync::Arc;

use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::TourConfig;
use crate::error::{Result, TourError};
use crate::math::linalg::{check_frame, Frame};
use crate::path::{FramePath, PathInterpolator};
use crate::provider::FrameProvider;

/// Phase of the tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourState {
    /// Rotating from the last arrival frame towards the target.
    Moving,
    /// Resting at the target frame.
    Paused,
}

/// A fully validated next leg of the tour, ready to commit.
#[derive(Debug)]
struct Transition {
    target: Frame,
    path: FramePath,
    data_basis: DMatrix<f64>,
    move_steps: usize,
}

/// Everything needed to plan transitions.
#[derive(Debug)]
struct Planner {
    provider: FrameProvider,
    interpolator: PathInterpolator,
    rng: ChaCha8Rng,
    frame_tolerance: f64,
}

impl Planner {
    /// Validate a frame proposed by the provider against the expected shape.
    fn check(&self, frame: &Frame, expected: (usize, usize)) -> Result<()> {
        if frame.shape() != expected {
            return Err(TourError::frame_shape(expected, frame.shape()));
        }
        check_frame(frame, self.frame_tolerance)
    }

    fn plan(&mut self, data: &DMatrix<f64>, from: &Frame) -> Result<Transition> {
        let proposal = self.provider.next(Some(from))?;
        self.check(&proposal.frame, from.shape())?;

        let path = self
            .interpolator
            .interpolate(from, &proposal.frame, &mut self.rng)?;
        let move_steps = proposal.duration.resolve(path.angular_length());
        let data_basis = data * path.basis();

        Ok(Transition {
            target: proposal.frame,
            path,
            data_basis,
            move_steps,
        })
    }
}

/// Grand tour state machine over a fixed data matrix.
///
/// The engine owns the `n x p` data matrix read-only and produces `n x d`
/// projections whose row `i` always corresponds to row `i` of the data.
///
/// All mutation goes through `&mut self`; share an engine across threads
/// behind a `Mutex`.
#[derive(Debug)]
pub struct TourEngine {
    /// Ambient data `X` (`n x p`).
    data: Arc<DMatrix<f64>>,

    planner: Planner,

    /// Ticks to rest at each arrival frame.
    pause_steps: usize,

    /// Current path and its precomputed `X B`.
    path: FramePath,
    data_basis: DMatrix<f64>,

    /// Frame the current path arrives at.
    target: Frame,

    step: usize,
    move_steps: usize,
    state: TourState,

    /// Completed transitions.
    transitions: usize,

    /// First planning error, if any.
    fault: Option<TourError>,
}

impl TourEngine {
    /// Create a tour over `data` with path completion seeded from system
    /// entropy.
    ///
    /// # Errors
    ///
    /// See [`TourEngine::with_rng`].
    pub fn new(
        data: impl Into<Arc<DMatrix<f64>>>,
        provider: FrameProvider,
        config: TourConfig,
    ) -> Result<Self> {
        Self::with_rng(data, provider, config, ChaCha8Rng::from_entropy())
    }

    /// Create a tour over `data` using `rng` for path completion.
    ///
    /// Draws the initial frame from the provider, validates it and plans the
    /// first transition. The engine starts in [`TourState::Moving`] at step 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, `data` has no
    /// columns, a provider frame is not a valid `p x d` frame, or the first
    /// path cannot be built.
    pub fn with_rng(
        data: impl Into<Arc<DMatrix<f64>>>,
        provider: FrameProvider,
        config: TourConfig,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        config.validate()?;
        let data = data.into();
        let p = data.ncols();
        if p == 0 {
            return Err(TourError::invalid_config("data must have at least one column"));
        }

        let mut planner = Planner {
            provider,
            interpolator: PathInterpolator::from_config(&config),
            rng,
            frame_tolerance: config.frame_tolerance,
        };

        let initial = planner.provider.next(None)?.frame;
        let d = initial.ncols();
        planner.check(&initial, (p, d.clamp(1, p)))?;

        let first = planner.plan(&data, &initial)?;
        debug!(
            "tour started with {} provider: {p}x{d} frames, first path {} steps",
            planner.provider.name(),
            first.move_steps
        );

        Ok(Self {
            data,
            planner,
            pause_steps: config.pause_steps,
            path: first.path,
            data_basis: first.data_basis,
            target: first.target,
            step: 0,
            move_steps: first.move_steps,
            state: TourState::Moving,
            transitions: 0,
            fault: None,
        })
    }

    /// Advance one tick and return the new projection.
    ///
    /// # Errors
    ///
    /// Returns an error if planning the next transition fails. The engine
    /// keeps its previous state and stops: every later call returns the same
    /// error.
    pub fn advance(&mut self) -> Result<DMatrix<f64>> {
        if let Some(err) = &self.fault {
            return Err(err.clone());
        }

        match self.state {
            TourState::Moving if self.step < self.move_steps => self.step += 1,
            TourState::Moving if self.pause_steps > 0 => {
                self.step = 1;
                self.state = TourState::Paused;
                debug!(
                    "arrived at frame {}, pausing for {} steps",
                    self.transitions + 1,
                    self.pause_steps
                );
            }
            TourState::Paused if self.step < self.pause_steps => self.step += 1,
            TourState::Moving | TourState::Paused => {
                if let Err(err) = self.begin_transition() {
                    warn!("tour stopped after {} transitions: {err}", self.transitions);
                    self.fault = Some(err.clone());
                    return Err(err);
                }
            }
        }

        trace!("{:?} step {}", self.state, self.step);
        Ok(self.current_projection())
    }

    fn begin_transition(&mut self) -> Result<()> {
        let next = self.planner.plan(&self.data, &self.target)?;

        self.transitions += 1;
        debug!(
            "planned transition {}: {} steps, angular length {:.4}",
            self.transitions,
            next.move_steps,
            next.path.angular_length()
        );

        self.path = next.path;
        self.data_basis = next.data_basis;
        self.target = next.target;
        self.move_steps = next.move_steps;
        self.step = 0;
        self.state = TourState::Moving;
        Ok(())
    }

    /// Plane angles for the current step.
    fn tau(&self) -> DVector<f64> {
        match self.state {
            TourState::Moving => self
                .path
                .angles_at(self.step as f64 / self.move_steps as f64),
            TourState::Paused => self.path.thetas().clone(),
        }
    }

    /// The current `n x d` projection of the data.
    #[must_use]
    pub fn current_projection(&self) -> DMatrix<f64> {
        &self.data_basis * self.path.coords_at(&self.tau())
    }

    /// The current `p x d` frame.
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.path.frame_at(&self.tau())
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> TourState {
        self.state
    }

    /// Step counter within the current phase.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    /// Total steps of the current path.
    #[must_use]
    pub const fn move_steps(&self) -> usize {
        self.move_steps
    }

    /// Ticks to rest at each arrival frame.
    #[must_use]
    pub const fn pause_steps(&self) -> usize {
        self.pause_steps
    }

    /// Number of transitions completed since construction.
    #[must_use]
    pub const fn transitions(&self) -> usize {
        self.transitions
    }

    /// The path currently being traversed.
    #[must_use]
    pub const fn path(&self) -> &FramePath {
        &self.path
    }

    /// The frame the current path arrives at.
    #[must_use]
    pub const fn target_frame(&self) -> &Frame {
        &self.target
    }

    /// The data matrix being toured.
    #[must_use]
    pub const fn data(&self) -> &Arc<DMatrix<f64>> {
        &self.data
    }

    /// The provider choosing target frames.
    #[must_use]
    pub const fn provider(&self) -> &FrameProvider {
        &self.planner.provider
    }

    /// The error that stopped the tour, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&TourError> {
        self.fault.as_ref()
    }

    /// Projection dimension `d`.
    #[must_use]
    pub fn projection_dim(&self) -> usize {
        self.target.ncols()
    }

    /// Data dimension `p`.
    #[must_use]
    pub fn ambient_dim(&self) -> usize {
        self.data.ncols()
    }
}
