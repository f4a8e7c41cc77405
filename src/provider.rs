//! Frame selection policies.
//!
//! A [`FrameProvider`] decides where the tour travels next. Each call to
//! [`FrameProvider::next`] proposes a target frame together with the
//! [`Duration`] of the transition towards it; the engine resolves that duration
//! into a step count once the path to the target is known.
//!
//! | Variant | Behaviour |
//! |---------|-----------|
//! | [`FrameProvider::Random`] | Independent uniformly random frames (grand tour) |
//! | [`FrameProvider::FixedSequence`] | A preset list of frames, cycled forever |
//! | [`FrameProvider::Perturbation`] | Frames spanning a subset of named axes, one axis swapped per call |
//! | [`FrameProvider::Custom`] | A user-supplied closure |

use std::fmt;

use log::warn;
use nalgebra::DMatrix;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::Duration;
use crate::error::{Result, TourError};
use crate::math::linalg::{orthonormalize, random_frame, Frame};

/// Target frame proposed by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameProposal {
    /// Frame to travel to. Must be orthonormal; the engine checks.
    pub frame: Frame,

    /// How long the transition towards `frame` should take.
    pub duration: Duration,
}

/// Independent random frames.
#[derive(Debug, Clone)]
pub struct RandomFrames {
    ambient_dim: usize,
    projection_dim: usize,
    duration: Duration,
    rng: ChaCha8Rng,
}

impl RandomFrames {
    /// Create a random frame source for `p x d` frames.
    ///
    /// # Errors
    ///
    /// Returns an error if `d` is zero or larger than `p`, or if the duration
    /// is invalid.
    pub fn new(p: usize, d: usize, duration: Duration, rng: ChaCha8Rng) -> Result<Self> {
        if d == 0 || d > p {
            return Err(TourError::invalid_config(format!(
                "projection dimension must be in 1..={p}, got {d}"
            )));
        }
        duration.validate()?;
        Ok(Self {
            ambient_dim: p,
            projection_dim: d,
            duration,
            rng,
        })
    }

    fn next(&mut self) -> Result<FrameProposal> {
        Ok(FrameProposal {
            frame: random_frame(self.ambient_dim, self.projection_dim, &mut self.rng)?,
            duration: self.duration,
        })
    }
}

/// A preset, cyclic list of frames.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    index: usize,
    duration: Duration,
}

impl FrameSequence {
    /// Create a sequence that starts at `frames[0]` and wraps around.
    ///
    /// # Errors
    ///
    /// Returns an error if `frames` is empty, the frames differ in shape, or
    /// the duration is invalid.
    pub fn new(frames: Vec<Frame>, duration: Duration) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(TourError::invalid_config("frame sequence must not be empty"));
        };
        let shape = first.shape();
        if let Some(i) = frames.iter().position(|f| f.shape() != shape) {
            return Err(TourError::invalid_config(format!(
                "frame {i} is {}x{}, expected {}x{}",
                frames[i].nrows(),
                frames[i].ncols(),
                shape.0,
                shape.1
            )));
        }
        duration.validate()?;
        Ok(Self {
            frames,
            index: 0,
            duration,
        })
    }

    fn next(&mut self) -> FrameProposal {
        let frame = self.frames[self.index].clone();
        self.index = (self.index + 1) % self.frames.len();
        FrameProposal {
            frame,
            duration: self.duration,
        }
    }
}

/// Frames spanning a working subset of axes, perturbed one axis at a time.
#[derive(Debug, Clone)]
pub struct AxisPerturbation {
    /// Candidate axes as columns (`p x n`).
    axes: DMatrix<f64>,
    names: Option<Vec<String>>,
    active: Vec<usize>,
    duration: Duration,
    rng: ChaCha8Rng,
}

impl AxisPerturbation {
    /// Create a perturbation source over the columns of `axes`, keeping
    /// `k` of them active at a time.
    ///
    /// The starting subset is drawn uniformly from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < k < n` and `k <= p` for a `p x n` axis
    /// pool, or if the duration is invalid.
    pub fn new(axes: DMatrix<f64>, k: usize, duration: Duration, mut rng: ChaCha8Rng) -> Result<Self> {
        let (p, n) = axes.shape();
        if k == 0 || k >= n {
            return Err(TourError::invalid_config(format!(
                "subset size must satisfy 0 < k < {n}, got {k}"
            )));
        }
        if k > p {
            return Err(TourError::invalid_config(format!(
                "cannot span {k} axes in {p} dimensions"
            )));
        }
        duration.validate()?;

        let active = sample(&mut rng, n, k).into_vec();
        Ok(Self {
            axes,
            names: None,
            active,
            duration,
            rng,
        })
    }

    /// Attach a name to every axis column.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of names differs from the number of axes.
    pub fn with_axis_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.axes.ncols() {
            return Err(TourError::invalid_config(format!(
                "got {} axis names for {} axes",
                names.len(),
                self.axes.ncols()
            )));
        }
        self.names = Some(names);
        Ok(self)
    }

    /// Indices of the axes the current frame spans, in slot order.
    #[must_use]
    pub fn active_axes(&self) -> &[usize] {
        &self.active
    }

    /// Names of the active axes, if names were attached.
    #[must_use]
    pub fn active_axis_names(&self) -> Option<Vec<&str>> {
        let names = self.names.as_ref()?;
        Some(self.active.iter().map(|&i| names[i].as_str()).collect())
    }

    /// Replace one active axis with an inactive one.
    fn perturb(&mut self) {
        let n = self.axes.ncols();
        let slot = self.rng.gen_range(0..self.active.len());
        let mut replacement = self.active[slot];
        while self.active.contains(&replacement) {
            replacement = self.rng.gen_range(0..n);
        }
        self.active[slot] = replacement;
    }

    fn next(&mut self) -> Result<FrameProposal> {
        self.perturb();
        let selected = self.axes.select_columns(self.active.iter());
        Ok(FrameProposal {
            frame: orthonormalize(&selected)?.q,
            duration: self.duration,
        })
    }
}

/// Signature of user-supplied frame generators: given the last frame reached
/// (`None` on the first call), return the next frame and the number of steps
/// to reach it.
pub type FrameGenerator = dyn FnMut(Option<&Frame>) -> (Frame, usize) + Send;

/// Frames from a user-supplied closure.
pub struct CustomFrames {
    generator: Box<FrameGenerator>,
}

impl CustomFrames {
    /// Wrap a frame generator.
    pub fn new<F>(generator: F) -> Self
    where
        F: FnMut(Option<&Frame>) -> (Frame, usize) + Send + 'static,
    {
        Self {
            generator: Box::new(generator),
        }
    }

    fn next(&mut self, last: Option<&Frame>) -> FrameProposal {
        let (frame, steps) = (self.generator)(last);
        if steps == 0 {
            warn!("custom frame generator returned 0 steps; using 1");
        }
        FrameProposal {
            frame,
            duration: Duration::Fixed(steps.max(1)),
        }
    }
}

impl fmt::Debug for CustomFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFrames").finish_non_exhaustive()
    }
}

/// Policy choosing each next target frame.
#[derive(Debug)]
pub enum FrameProvider {
    /// Grand tour: independent uniformly random frames.
    Random(RandomFrames),
    /// Preset tour: cycle through a fixed list of frames.
    FixedSequence(FrameSequence),
    /// Checkpoint tour: frames over a perturbed subset of axes.
    Perturbation(AxisPerturbation),
    /// Frames from a user closure.
    Custom(CustomFrames),
}

impl FrameProvider {
    /// Grand tour over `p x d` frames drawing from `rng`.
    ///
    /// # Errors
    ///
    /// See [`RandomFrames::new`].
    pub fn random(p: usize, d: usize, duration: Duration, rng: ChaCha8Rng) -> Result<Self> {
        RandomFrames::new(p, d, duration, rng).map(Self::Random)
    }

    /// Grand tour with a reproducible random source.
    ///
    /// # Errors
    ///
    /// See [`RandomFrames::new`].
    pub fn random_seeded(p: usize, d: usize, duration: Duration, seed: u64) -> Result<Self> {
        Self::random(p, d, duration, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Preset tour cycling through `frames`.
    ///
    /// # Errors
    ///
    /// See [`FrameSequence::new`].
    pub fn fixed_sequence(frames: Vec<Frame>, duration: Duration) -> Result<Self> {
        FrameSequence::new(frames, duration).map(Self::FixedSequence)
    }

    /// Checkpoint tour over `k` of the columns of `axes`.
    ///
    /// # Errors
    ///
    /// See [`AxisPerturbation::new`].
    pub fn perturbation(
        axes: DMatrix<f64>,
        k: usize,
        duration: Duration,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        AxisPerturbation::new(axes, k, duration, rng).map(Self::Perturbation)
    }

    /// Checkpoint tour with a reproducible random source.
    ///
    /// # Errors
    ///
    /// See [`AxisPerturbation::new`].
    pub fn perturbation_seeded(
        axes: DMatrix<f64>,
        k: usize,
        duration: Duration,
        seed: u64,
    ) -> Result<Self> {
        Self::perturbation(axes, k, duration, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Tour driven by a user closure.
    pub fn custom<F>(generator: F) -> Self
    where
        F: FnMut(Option<&Frame>) -> (Frame, usize) + Send + 'static,
    {
        Self::Custom(CustomFrames::new(generator))
    }

    /// Propose the next target frame.
    ///
    /// `last` is the frame most recently arrived at, or `None` on the very
    /// first call. Frames are returned unvalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if building the frame fails.
    pub fn next(&mut self, last: Option<&Frame>) -> Result<FrameProposal> {
        match self {
            Self::Random(source) => source.next(),
            Self::FixedSequence(source) => Ok(source.next()),
            Self::Perturbation(source) => source.next(),
            Self::Custom(source) => Ok(source.next(last)),
        }
    }

    /// Short name of the variant, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Random(_) => "random",
            Self::FixedSequence(_) => "fixed-sequence",
            Self::Perturbation(_) => "perturbation",
            Self::Custom(_) => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::orthonormality_error;
    use std::collections::HashSet;

    fn steps(n: usize) -> Duration {
        Duration::fixed(n).unwrap()
    }

    fn basis_frames(p: usize, count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let mut frame = DMatrix::zeros(p, 1);
                frame[(i % p, 0)] = 1.0;
                frame
            })
            .collect()
    }

    #[test]
    fn test_random_frames() {
        let mut provider = FrameProvider::random_seeded(6, 2, steps(10), 1).unwrap();
        let first = provider.next(None).unwrap();
        let second = provider.next(Some(&first.frame)).unwrap();

        assert_eq!(first.frame.shape(), (6, 2));
        assert!(orthonormality_error(&first.frame) < 1e-10);
        assert!(orthonormality_error(&second.frame) < 1e-10);
        assert_ne!(first.frame, second.frame);
        assert_eq!(first.duration, Duration::Fixed(10));
        assert_eq!(provider.name(), "random");
    }

    #[test]
    fn test_random_frames_reproducible() {
        let mut a = FrameProvider::random_seeded(5, 3, steps(4), 77).unwrap();
        let mut b = FrameProvider::random_seeded(5, 3, steps(4), 77).unwrap();
        for _ in 0..5 {
            assert_eq!(a.next(None).unwrap(), b.next(None).unwrap());
        }
    }

    #[test]
    fn test_random_rejects_bad_dims() {
        assert!(FrameProvider::random_seeded(3, 4, steps(4), 0)
            .unwrap_err()
            .is_configuration());
        assert!(FrameProvider::random_seeded(3, 0, steps(4), 0).is_err());
        assert!(FrameProvider::random_seeded(3, 2, Duration::Fixed(0), 0).is_err());
    }

    #[test]
    fn test_fixed_sequence_cycles() {
        for len in 1..=5 {
            let frames = basis_frames(5, len);
            let mut provider = FrameProvider::fixed_sequence(frames.clone(), steps(3)).unwrap();

            // Initial frame, then `len` transitions back around to the start
            let initial = provider.next(None).unwrap();
            assert_eq!(initial.frame, frames[0]);

            let mut last = initial.frame;
            for i in 1..=len {
                let proposal = provider.next(Some(&last)).unwrap();
                assert_eq!(proposal.frame, frames[i % len]);
                last = proposal.frame;
            }
            assert_eq!(last, frames[0]);
        }
    }

    #[test]
    fn test_fixed_sequence_validation() {
        let err = FrameProvider::fixed_sequence(Vec::new(), steps(3)).unwrap_err();
        assert!(err.is_configuration());

        let mixed = vec![DMatrix::identity(4, 2), DMatrix::identity(4, 1)];
        let err = FrameProvider::fixed_sequence(mixed, steps(3)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_perturbation_subset_invariant() {
        let axes = DMatrix::identity(10, 10);
        let mut source =
            AxisPerturbation::new(axes, 3, steps(5), ChaCha8Rng::seed_from_u64(9)).unwrap();

        let mut previous: Vec<usize> = source.active_axes().to_vec();
        for _ in 0..500 {
            let proposal = source.next().unwrap();
            let active = source.active_axes();

            assert_eq!(active.len(), 3);
            assert!(active.iter().all(|&i| i < 10));
            let distinct: HashSet<_> = active.iter().collect();
            assert_eq!(distinct.len(), 3);

            // Exactly one slot changed
            let changed = active
                .iter()
                .zip(previous.iter())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(changed, 1);

            // The frame spans exactly the active coordinate axes
            assert_eq!(proposal.frame.shape(), (10, 3));
            assert!(orthonormality_error(&proposal.frame) < 1e-10);
            for (slot, &axis) in active.iter().enumerate() {
                assert!((proposal.frame[(axis, slot)].abs() - 1.0).abs() < 1e-10);
            }

            previous = active.to_vec();
        }
    }

    #[test]
    fn test_perturbation_validation() {
        let axes = DMatrix::<f64>::identity(4, 6);
        let err = FrameProvider::perturbation_seeded(axes.clone(), 0, steps(5), 1).unwrap_err();
        assert!(err.is_configuration());
        let err = FrameProvider::perturbation_seeded(axes.clone(), 6, steps(5), 1).unwrap_err();
        assert!(err.is_configuration());
        let err = FrameProvider::perturbation_seeded(axes.clone(), 5, steps(5), 1).unwrap_err();
        assert!(err.is_configuration());
        assert!(FrameProvider::perturbation_seeded(axes, 3, steps(5), 1).is_ok());
    }

    #[test]
    fn test_perturbation_axis_names() {
        let axes = DMatrix::identity(4, 4);
        let names: Vec<String> = ["sepal_l", "sepal_w", "petal_l", "petal_w"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let source = AxisPerturbation::new(axes.clone(), 2, steps(5), ChaCha8Rng::seed_from_u64(3))
            .unwrap()
            .with_axis_names(names.clone())
            .unwrap();
        let active_names = source.active_axis_names().unwrap();
        assert_eq!(active_names.len(), 2);
        for (&i, name) in source.active_axes().iter().zip(active_names) {
            assert_eq!(names[i], name);
        }

        let err = AxisPerturbation::new(axes, 2, steps(5), ChaCha8Rng::seed_from_u64(3))
            .unwrap()
            .with_axis_names(names[..3].to_vec())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_custom_provider() {
        let mut calls = 0usize;
        let mut provider = FrameProvider::custom(move |last: Option<&Frame>| {
            calls += 1;
            let steps = if last.is_none() { 0 } else { 7 };
            (DMatrix::identity(3, 1), steps)
        });

        let first = provider.next(None).unwrap();
        assert_eq!(first.duration, Duration::Fixed(1));
        let second = provider.next(Some(&first.frame)).unwrap();
        assert_eq!(second.duration, Duration::Fixed(7));
        assert_eq!(provider.name(), "custom");
    }
}
