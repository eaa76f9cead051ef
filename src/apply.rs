//! Frequency-domain application of one axis-aligned shear to a volume.
//!
//! A shear pass is: forward FFT along the sheared axis, a per-sample phase
//! rotation whose angle is linear in the axis's signed frequency and
//! bilinear in the other two axes' spatial offsets from the volume centre,
//! then the inverse FFT. The per-axis signs encode the relation between
//! the data index order and the geometric coordinate system; the
//! decomposition formulas assume exactly these signs.

use num_complex::Complex64;

use crate::fft::{nyquist_bin, signed_freq, Direction, FftWorkspace};
use crate::shear::Shift;
use crate::volume::{Axis3, Volume};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Phase divisor for one dimension; odd dimensions above one use `n - 1`.
#[inline]
fn dim_mod(n: usize) -> f64 {
    if n > 1 && n % 2 == 1 {
        (n - 1) as f64
    } else {
        n as f64
    }
}

/// Shear the volume along `axis` with slopes `a`, `b` against the other two
/// axes and translation `delta` (voxels) along the sheared axis.
///
/// Returns false without touching the volume when `a`, `b` and `delta` are
/// all zero. When `real_input` is set and the sheared dimension is even,
/// the Nyquist bin is left untouched; that frequency carries no usable
/// phase for real data.
pub fn shear_axis(
    ws: &mut FftWorkspace,
    vol: &mut Volume,
    axis: Axis3,
    a: f64,
    b: f64,
    delta: f64,
    real_input: bool,
) -> bool {
    if a == 0.0 && b == 0.0 && delta == 0.0 {
        return false;
    }

    let (nx, ny, nz) = vol.dims();
    let [lx, ly, lz] = vol.lengths;
    let (nx_mod, ny_mod, nz_mod) = (dim_mod(nx), dim_mod(ny), dim_mod(nz));
    let half_x = (nx / 2) as f64;
    let half_y = (ny / 2) as f64;
    let half_z = (nz / 2) as f64;

    ws.transform(&mut vol.data, axis, Direction::Forward);

    // delta is in voxels, a and b are fractional shears (typical range
    // -1 to 1)
    match axis {
        Axis3::X => {
            let x_scale = TWO_PI * delta / nx_mod;
            let y_scale = TWO_PI * a * ly / (lx * ny_mod);
            let z_scale = TWO_PI * b * lz / (lx * nz_mod);
            let skip = if real_input && nx % 2 == 0 {
                Some(nyquist_bin(nx))
            } else {
                None
            };
            for ((i, j, k), v) in vol.data.indexed_iter_mut() {
                if skip == Some(i) {
                    continue;
                }
                let f = signed_freq(i, nx);
                let theta = f * x_scale - (j as f64 - half_y) * f * y_scale
                    + (k as f64 - half_z) * f * z_scale;
                *v *= Complex64::new(theta.cos(), theta.sin());
            }
        }
        Axis3::Y => {
            let y_scale = TWO_PI * delta / ny_mod;
            let z_scale = TWO_PI * a * lz / (ly * nz_mod);
            let x_scale = TWO_PI * b * lx / (ly * nx_mod);
            let skip = if real_input && ny % 2 == 0 {
                Some(nyquist_bin(ny))
            } else {
                None
            };
            for ((i, j, k), v) in vol.data.indexed_iter_mut() {
                if skip == Some(j) {
                    continue;
                }
                let f = signed_freq(j, ny);
                let theta = -f * y_scale
                    - (k as f64 - half_z) * f * z_scale
                    - (i as f64 - half_x) * f * x_scale;
                *v *= Complex64::new(theta.cos(), theta.sin());
            }
        }
        Axis3::Z => {
            let z_scale = TWO_PI * delta / nz_mod;
            let x_scale = TWO_PI * a * lx / (lz * nx_mod);
            let y_scale = TWO_PI * b * ly / (lz * ny_mod);
            let skip = if real_input && nz % 2 == 0 {
                Some(nyquist_bin(nz))
            } else {
                None
            };
            for ((i, j, k), v) in vol.data.indexed_iter_mut() {
                if skip == Some(k) {
                    continue;
                }
                let f = signed_freq(k, nz);
                let theta = f * z_scale + (i as f64 - half_x) * f * x_scale
                    - (j as f64 - half_y) * f * y_scale;
                *v *= Complex64::new(theta.cos(), theta.sin());
            }
        }
    }

    ws.transform(&mut vol.data, axis, Direction::Inverse);
    true
}

/// Apply the phase ramps that shift a volume already sitting in frequency
/// space, without any FFT.
///
/// `upcoming` names the direction of the transform the caller will run
/// next to bring the data back to image space; the ramp signs flip when
/// that transform is a forward one. Returns false for a zero shift.
pub fn set_shift_phases(
    vol: &mut Volume,
    shift: Shift,
    upcoming: Direction,
    real_input: bool,
) -> bool {
    if shift.is_zero() {
        return false;
    }

    let (nx, ny, nz) = vol.dims();
    let (nx_mod, ny_mod, nz_mod) = (dim_mod(nx), dim_mod(ny), dim_mod(nz));
    let flip = match upcoming {
        Direction::Inverse => 1.0,
        Direction::Forward => -1.0,
    };
    let x_scale = flip * TWO_PI * shift.dx / nx_mod;
    let y_scale = flip * TWO_PI * shift.dy / ny_mod;
    let z_scale = flip * TWO_PI * shift.dz / nz_mod;

    let skip_x = if real_input && nx % 2 == 0 {
        Some(nyquist_bin(nx))
    } else {
        None
    };
    let skip_y = if real_input && ny % 2 == 0 {
        Some(nyquist_bin(ny))
    } else {
        None
    };
    let skip_z = if real_input && nz % 2 == 0 {
        Some(nyquist_bin(nz))
    } else {
        None
    };

    for ((i, j, k), v) in vol.data.indexed_iter_mut() {
        let mut theta = 0.0;
        if skip_x != Some(i) {
            theta += signed_freq(i, nx) * x_scale;
        }
        if skip_y != Some(j) {
            theta -= signed_freq(j, ny) * y_scale;
        }
        if skip_z != Some(k) {
            theta += signed_freq(k, nz) * z_scale;
        }
        *v *= Complex64::new(theta.cos(), theta.sin());
    }
    true
}
