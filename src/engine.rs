//! The rotation engine: dispatches a rigid-body rotation plus shift into a
//! sequence of frequency-domain shear passes over a volume.

use crate::apply;
use crate::error::RotateError;
use crate::fft::{Direction, FftWorkspace};
use crate::quat::{euler5_decompose, Quaternion};
use crate::shear::{
    best_decomposition, best_long_decomposition, find_repairing_quat, find_repairing_quat_long,
    shear_sequence, trans_shear_adjust, QualityMeasure, ShearParams, Shift, CANCELLATION_TOL,
};
use crate::volume::{Axis3, Volume};

/// How many shear passes a full decomposition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShearMode {
    /// One elementary decomposition, four shears.
    Four,
    /// A long half-angle decomposition, seven shears; better conditioned
    /// for large rotation angles at roughly double the FFT cost.
    Seven,
    /// Fully symmetric five-angle Euler form, thirteen shears; does not
    /// support translations.
    Thirteen,
}

/// Engine configuration, set once per batch of calls.
#[derive(Debug, Clone, Copy)]
pub struct RotateConfig {
    pub mode: ShearMode,
    pub measure: QualityMeasure,
    pub verbose: bool,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            mode: ShearMode::Four,
            measure: QualityMeasure::Cox,
            verbose: false,
        }
    }
}

/// Diagnostic counters over the engine's lifetime, reset explicitly
/// between registration runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShearCounts {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub phase_sets: usize,
    pub calls: usize,
}

impl ShearCounts {
    pub fn total_shears(&self) -> usize {
        self.x + self.y + self.z + self.phase_sets
    }

    pub fn mean_shears_per_call(&self) -> f64 {
        self.total_shears() as f64 / self.calls as f64
    }
}

/// Depth guard on the repair recursion. The repaired factor is safe by
/// construction, so depth 1 suffices unless its conjugate is itself
/// unsafe.
const MAX_REPAIR_DEPTH: usize = 4;

/// Rotates and shifts complex volumes of one fixed geometry.
///
/// Owns the FFT workspace, the configuration and the diagnostic counters;
/// one volume is processed fully before the next (single threaded, no
/// state shared across instances).
pub struct FourierRotator {
    config: RotateConfig,
    fft: FftWorkspace,
    counts: ShearCounts,
}

impl FourierRotator {
    pub fn new(nx: usize, ny: usize, nz: usize, config: RotateConfig) -> Self {
        Self {
            config,
            fft: FftWorkspace::new(nx, ny, nz),
            counts: ShearCounts::default(),
        }
    }

    pub fn config(&self) -> &RotateConfig {
        &self.config
    }

    pub fn counts(&self) -> ShearCounts {
        self.counts
    }

    pub fn reset_counts(&mut self) {
        self.counts = ShearCounts::default();
    }

    /// Rotate `orig` by `q` and then shift it by `shift`, writing the
    /// result to `moved`. The convention is rotation before shift: the
    /// whole transform is `T * R`.
    ///
    /// `real_input` asserts that the volume is real valued in image space,
    /// allowing the Nyquist planes to be left unchanged.
    pub fn rotate_into(
        &mut self,
        q: &Quaternion,
        shift: Shift,
        orig: &Volume,
        moved: &mut Volume,
        real_input: bool,
    ) -> Result<(), RotateError> {
        if orig.dims() != moved.dims() {
            return Err(RotateError::DegenerateInput(format!(
                "input dims {:?} do not match output dims {:?}",
                orig.dims(),
                moved.dims()
            )));
        }
        moved.data.assign(&orig.data);
        moved.lengths = orig.lengths;
        self.rotate_in_place(q, shift, moved, real_input)
    }

    /// As `rotate_into`, mutating the volume in place.
    pub fn rotate_in_place(
        &mut self,
        q: &Quaternion,
        shift: Shift,
        vol: &mut Volume,
        real_input: bool,
    ) -> Result<(), RotateError> {
        if vol.is_empty() {
            return Err(RotateError::DegenerateInput(
                "volume has a zero dimension".into(),
            ));
        }
        if vol.dims() != self.fft.dims() {
            return Err(RotateError::DegenerateInput(format!(
                "volume dims {:?} do not match workspace dims {:?}",
                vol.dims(),
                self.fft.dims()
            )));
        }

        self.counts.calls += 1;

        if q.x == 0.0 && q.y == 0.0 && q.z == 0.0 {
            self.shift_only(shift, vol, real_input);
            Ok(())
        } else if q.x == 0.0 && q.y == 0.0 && q.w.abs() >= CANCELLATION_TOL {
            self.rot_z(q, shift, vol, real_input);
            Ok(())
        } else if q.y == 0.0 && q.z == 0.0 && q.w.abs() >= CANCELLATION_TOL {
            self.rot_x(q, shift, vol, real_input);
            Ok(())
        } else if q.z == 0.0 && q.x == 0.0 && q.w.abs() >= CANCELLATION_TOL {
            self.rot_y(q, shift, vol, real_input);
            Ok(())
        } else {
            match self.config.mode {
                ShearMode::Thirteen => self.rot_13_shears(q, shift, vol, real_input),
                ShearMode::Seven => self.rot_7_shears(q, shift, vol, real_input, 0),
                ShearMode::Four => self.rot_4_shears(q, shift, vol, real_input, 0),
            }
        }
    }

    /// Apply only the phase ramps for a shift to a volume already in
    /// frequency space; `upcoming` is the direction of the transform that
    /// will bring it back.
    pub fn set_shift_phases(
        &mut self,
        shift: Shift,
        vol: &mut Volume,
        upcoming: Direction,
        real_input: bool,
    ) {
        if apply::set_shift_phases(vol, shift, upcoming, real_input) {
            self.counts.phase_sets += 1;
        }
    }

    fn shear(&mut self, vol: &mut Volume, axis: Axis3, a: f64, b: f64, delta: f64, real: bool) {
        if apply::shear_axis(&mut self.fft, vol, axis, a, b, delta, real) {
            match axis {
                Axis3::X => self.counts.x += 1,
                Axis3::Y => self.counts.y += 1,
                Axis3::Z => self.counts.z += 1,
            }
        }
    }

    /// Pure translation; the three single-axis shifts commute, so any
    /// order works.
    fn shift_only(&mut self, t: Shift, vol: &mut Volume, real: bool) {
        self.shear(vol, Axis3::X, 0.0, 0.0, t.dx, real);
        self.shear(vol, Axis3::Y, 0.0, 0.0, t.dy, real);
        self.shear(vol, Axis3::Z, 0.0, 0.0, t.dz, real);
    }

    /// Rotation about the x axis alone: four shears, no pattern search.
    fn rot_x(&mut self, q: &Quaternion, t: Shift, vol: &mut Volume, real: bool) {
        let alpha = -(q.x / q.w);
        let delta = 2.0 * q.x * q.w;
        let dy = t.dy - alpha * t.dz;

        self.shear(vol, Axis3::Y, alpha, 0.0, 0.0, real);
        self.shear(vol, Axis3::Z, 0.0, delta, t.dz, real);
        self.shear(vol, Axis3::Y, alpha, 0.0, dy, real);
        self.shear(vol, Axis3::X, 0.0, 0.0, t.dx, real);
    }

    fn rot_y(&mut self, q: &Quaternion, t: Shift, vol: &mut Volume, real: bool) {
        let alpha = -(q.y / q.w);
        let delta = 2.0 * q.y * q.w;
        let dz = t.dz - alpha * t.dx;

        self.shear(vol, Axis3::Z, alpha, 0.0, 0.0, real);
        self.shear(vol, Axis3::X, 0.0, delta, t.dx, real);
        self.shear(vol, Axis3::Z, alpha, 0.0, dz, real);
        self.shear(vol, Axis3::Y, 0.0, 0.0, t.dy, real);
    }

    fn rot_z(&mut self, q: &Quaternion, t: Shift, vol: &mut Volume, real: bool) {
        let alpha = -(q.z / q.w);
        let delta = 2.0 * q.z * q.w;
        let dx = t.dx - alpha * t.dy;

        self.shear(vol, Axis3::X, alpha, 0.0, 0.0, real);
        self.shear(vol, Axis3::Y, 0.0, delta, t.dy, real);
        self.shear(vol, Axis3::X, alpha, 0.0, dx, real);
        self.shear(vol, Axis3::Z, 0.0, 0.0, t.dz, real);
    }

    fn apply_decomposition(
        &mut self,
        params: &ShearParams,
        t: Shift,
        vol: &mut Volume,
        real: bool,
    ) {
        let adjusted = trans_shear_adjust(params, t);
        if self.config.verbose {
            eprintln!(
                "decomp {:>7}: quality {:.6} ({:?}), adjusted trans {:.4} {:.4} {:.4}",
                params.pattern.name(),
                params.quality,
                params.measure,
                adjusted.dx,
                adjusted.dy,
                adjusted.dz
            );
        }
        for (axis, a, b, delta) in shear_sequence(params, adjusted) {
            self.shear(vol, axis, a, b, delta, real);
        }
    }

    fn rot_4_shears(
        &mut self,
        q: &Quaternion,
        t: Shift,
        vol: &mut Volume,
        real: bool,
        depth: usize,
    ) -> Result<(), RotateError> {
        if let Some(params) = best_decomposition(q, self.config.measure) {
            self.apply_decomposition(&params, t, vol, real);
            return Ok(());
        }
        if depth >= MAX_REPAIR_DEPTH {
            return Err(RotateError::SingularDecomposition(*q));
        }
        // Frame the rotation with a repairing quaternion and its inverse;
        // this costs two extra full shear passes.
        if self.config.verbose {
            eprintln!("all decompositions singular for {:?}; repairing", q);
        }
        let repair = find_repairing_quat(q, self.config.measure)?;
        let repaired = repair * *q;
        self.rot_4_shears(&repaired, Shift::zero(), vol, real, depth + 1)?;
        self.rot_4_shears(&repair.conjugate(), t, vol, real, depth + 1)
    }

    fn rot_7_shears(
        &mut self,
        q: &Quaternion,
        t: Shift,
        vol: &mut Volume,
        real: bool,
        depth: usize,
    ) -> Result<(), RotateError> {
        if let Some(params) = best_long_decomposition(q, self.config.measure) {
            self.apply_decomposition(&params, t, vol, real);
            return Ok(());
        }
        if depth >= MAX_REPAIR_DEPTH {
            return Err(RotateError::SingularDecomposition(*q));
        }
        if self.config.verbose {
            eprintln!("all long decompositions singular for {:?}; repairing", q);
        }
        let repair = find_repairing_quat_long(q, self.config.measure)?;
        let repaired = repair * *q;
        self.rot_7_shears(&repaired, Shift::zero(), vol, real, depth + 1)?;
        self.rot_7_shears(&repair.conjugate(), t, vol, real, depth + 1)
    }

    /// Fully symmetric rotation from the five-angle Euler decomposition,
    /// thirteen elementary shears. Translations are not supported here.
    fn rot_13_shears(
        &mut self,
        q: &Quaternion,
        t: Shift,
        vol: &mut Volume,
        real: bool,
    ) -> Result<(), RotateError> {
        if !t.is_zero() {
            return Err(RotateError::UnsupportedMode(
                "translations are not supported in 13-shear mode",
            ));
        }

        let (theta_x, theta_y, theta_z) = euler5_decompose(q)?;
        let xa = -(0.5 * theta_x).tan();
        let xb = theta_x.sin();
        let ya = -(0.5 * theta_y).tan();
        let yb = theta_y.sin();
        let za = -(0.5 * theta_z).tan();
        let zb = theta_z.sin();

        self.shear(vol, Axis3::X, za, 0.0, 0.0, real);
        self.shear(vol, Axis3::Y, 0.0, zb, 0.0, real);
        self.shear(vol, Axis3::X, za, 0.0, 0.0, real);
        self.shear(vol, Axis3::Z, ya, 0.0, 0.0, real);
        self.shear(vol, Axis3::X, 0.0, yb, 0.0, real);
        self.shear(vol, Axis3::Z, ya, -xa, 0.0, real);
        self.shear(vol, Axis3::Y, -xb, 0.0, 0.0, real);
        self.shear(vol, Axis3::Z, ya, -xa, 0.0, real);
        self.shear(vol, Axis3::X, 0.0, yb, 0.0, real);
        self.shear(vol, Axis3::Z, ya, 0.0, 0.0, real);
        self.shear(vol, Axis3::X, za, 0.0, 0.0, real);
        self.shear(vol, Axis3::Y, 0.0, zb, 0.0, real);
        self.shear(vol, Axis3::X, za, 0.0, 0.0, real);
        Ok(())
    }
}
