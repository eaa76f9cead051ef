//! Fourier-shear rigid-body rotation of complex 3D volumes.
//!
//! A rotation given as a unit quaternion, plus a translation, is applied to
//! a volume by decomposing it into a short sequence of axis-aligned shears,
//! each realized losslessly in the frequency domain as a 1D FFT, a linear
//! phase ramp, and the inverse FFT. Several algebraically equivalent
//! decompositions exist; the engine scores their numerical safety and picks
//! the best conditioned one, falling back to a small corrective rotation
//! when every pattern is singular.

pub mod apply;
pub mod engine;
pub mod error;
pub mod fft;
pub mod motion;
pub mod quat;
pub mod shear;
pub mod volume;

pub use engine::{FourierRotator, RotateConfig, ShearCounts, ShearMode};
pub use error::RotateError;
pub use fft::{Direction, FftWorkspace};
pub use motion::{parse_motion_file, write_motion_file, MotionParams};
pub use quat::{Quaternion, Transform};
pub use shear::{QualityMeasure, ShearParams, ShearPattern, Shift};
pub use volume::{Axis3, Volume};
