//! Property tests for the geometric core and the tour state machine.
//!
//! Every case is driven by a seeded `ChaCha8Rng`, so failures shrink to a
//! reproducible seed.

use grand_tour::math::linalg::{gaussian_matrix, givens_in, orthonormality_error, SIGN_EPS};
use grand_tour::math::{orthonormalize, random_frame};
use grand_tour::{Duration, FrameProvider, PathInterpolator, TourConfig, TourEngine};
use nalgebra::DMatrix;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Ambient and projection dimension with `p > d`, including `p < 2d`.
fn gen_dims() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=3, 1usize..=4).prop_map(|(d, extra)| (d + extra, d))
}

fn sample_data(n: usize, p: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, p, |i, j| ((i * 5 + j * 11) % 9) as f64 - 4.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_orthonormalize(seed in any::<u64>(), d in 1usize..=5, extra in 0usize..=4) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = gaussian_matrix(d + extra, d, &mut rng);
        let qr = orthonormalize(&a).unwrap();

        prop_assert!((qr.product() - &a).norm() < 1e-6);
        prop_assert!(orthonormality_error(&qr.q) < 1e-8);
        for j in 0..d {
            prop_assert!(qr.r[(j, j)] >= -SIGN_EPS, "R[{j},{j}] = {}", qr.r[(j, j)]);
        }
    }

    #[test]
    fn proptest_path_endpoints((p, d) in gen_dims(), seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let fa = random_frame(p, d, &mut rng).unwrap();
        let fz = random_frame(p, d, &mut rng).unwrap();

        let path = PathInterpolator::default().interpolate(&fa, &fz, &mut rng).unwrap();
        let basis = path.basis();
        let source = basis * path.source_coords();
        let target = basis * (givens_in(path.thetas(), basis.ncols()) * path.source_coords());

        prop_assert!((source - &fa).norm() < 1e-6);
        prop_assert!((target - &fz).norm() < 1e-6);
        prop_assert!(orthonormality_error(path.basis()) < 1e-6);
        prop_assert!(orthonormality_error(path.source_coords()) < 1e-6);

        for step in 0..=8 {
            let frame = path.frame_at(&path.angles_at(f64::from(step) / 8.0));
            prop_assert!(orthonormality_error(&frame) < 1e-6);
        }
    }

    #[test]
    fn proptest_projection_follows_frame((p, d) in gen_dims(), seed in any::<u64>(), steps in 1usize..=6) {
        let data = sample_data(15, p);
        let provider = FrameProvider::random_seeded(p, d, Duration::Fixed(steps), seed).unwrap();
        let mut tour = TourEngine::with_rng(
            data.clone(),
            provider,
            TourConfig::default(),
            ChaCha8Rng::seed_from_u64(seed ^ 0x5eed),
        ).unwrap();

        for _ in 0..3 * (steps + 1) {
            let projection = tour.advance().unwrap();
            prop_assert_eq!(projection.shape(), (15, d));
            let frame = tour.current_frame();
            prop_assert!(orthonormality_error(&frame) < 1e-6);
            prop_assert!((&data * frame - &projection).norm() < 1e-6);
            prop_assert_eq!(tour.current_projection(), projection);
        }
        prop_assert_eq!(tour.transitions(), 3);
    }

    #[test]
    fn proptest_fixed_sequence_cycles(len in 1usize..=8, seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let frames: Vec<_> = (0..len).map(|_| random_frame(4, 2, &mut rng).unwrap()).collect();
        let mut provider = FrameProvider::fixed_sequence(frames.clone(), Duration::Fixed(3)).unwrap();

        let mut last = provider.next(None).unwrap().frame;
        prop_assert_eq!(&last, &frames[0]);
        for _ in 0..len {
            last = provider.next(Some(&last)).unwrap().frame;
        }
        prop_assert_eq!(&last, &frames[0]);
    }

    #[test]
    fn proptest_perturbation_subset(n in 2usize..=12, k_seed in any::<usize>(), seed in any::<u64>(), calls in 1usize..=50) {
        let k = 1 + k_seed % (n - 1);
        let axes = DMatrix::identity(n, n);
        let mut provider = FrameProvider::perturbation_seeded(axes, k, Duration::Fixed(5), seed).unwrap();

        let mut last = None;
        for _ in 0..calls {
            let frame = provider.next(last.as_ref()).unwrap().frame;
            prop_assert_eq!(frame.shape(), (n, k));
            last = Some(frame);
        }

        let FrameProvider::Perturbation(source) = &provider else {
            unreachable!("built as a perturbation provider");
        };
        let active = source.active_axes();
        let distinct: HashSet<_> = active.iter().copied().collect();
        prop_assert_eq!(active.len(), k);
        prop_assert_eq!(distinct.len(), k);
        prop_assert!(active.iter().all(|&i| i < n));
    }
}
