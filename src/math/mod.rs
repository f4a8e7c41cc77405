//! Linear algebra for frame paths.
//!
//! This module provides:
//! - [`linalg`]: sign-stabilized QR, frame checks, Givens blocks, random frames
//! - [`rotation`]: decomposition of rotations into independent planes

pub mod linalg;
pub mod rotation;

pub use linalg::{check_frame, givens, orthonormalize, random_frame, Frame, QrFactors};
pub use rotation::{PlaneRotations, RotationDecomposer};
