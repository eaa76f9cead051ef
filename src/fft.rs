//! Axis-wise FFT over a complex volume, wrapping rustfft.
//!
//! Plans are created once per dimension and reused, with a shared scratch
//! buffer and a copy-through lane buffer for axes that are not contiguous
//! in memory.

use std::sync::Arc;

use ndarray::{Array3, Axis};
use num_complex::Complex64;
use num_traits::Zero;
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::volume::Axis3;

/// Transform direction. `Forward` applies `exp(+2*pi*i*f*x/n)` along the
/// axis, `Inverse` applies `exp(-2*pi*i*f*x/n)`; the shear phase formulas
/// assume exactly this sign convention. Both directions scale by
/// `1/sqrt(n)`, so a forward/inverse pair is unit gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// Cached FFT plans and buffers for one volume geometry.
pub struct FftWorkspace {
    dims: (usize, usize, usize),
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
    scratch: Vec<Complex64>,
    lane: Vec<Complex64>,
}

impl FftWorkspace {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        let mut planner = FftPlanner::new();
        // rustfft's Inverse is exp(+2 pi i), our Forward
        let forward = [
            planner.plan_fft(nx, FftDirection::Inverse),
            planner.plan_fft(ny, FftDirection::Inverse),
            planner.plan_fft(nz, FftDirection::Inverse),
        ];
        let inverse = [
            planner.plan_fft(nx, FftDirection::Forward),
            planner.plan_fft(ny, FftDirection::Forward),
            planner.plan_fft(nz, FftDirection::Forward),
        ];
        let scratch_len = forward
            .iter()
            .chain(inverse.iter())
            .map(|p| p.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);
        Self {
            dims: (nx, ny, nz),
            forward,
            inverse,
            scratch: vec![Complex64::zero(); scratch_len],
            lane: vec![Complex64::zero(); nx.max(ny).max(nz)],
        }
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        self.dims
    }

    /// Transform the volume along one axis, in place.
    pub fn transform(&mut self, data: &mut Array3<Complex64>, axis: Axis3, dir: Direction) {
        let ax = axis.index();
        let n = data.shape()[ax];
        if n < 2 {
            return;
        }
        let plan = match dir {
            Direction::Forward => Arc::clone(&self.forward[ax]),
            Direction::Inverse => Arc::clone(&self.inverse[ax]),
        };
        let scale = 1.0 / (n as f64).sqrt();

        for mut lane in data.lanes_mut(Axis(ax)) {
            if let Some(slice) = lane.as_slice_mut() {
                plan.process_with_scratch(slice, &mut self.scratch);
                for v in slice.iter_mut() {
                    *v *= scale;
                }
            } else {
                let buf = &mut self.lane[..n];
                for (b, v) in buf.iter_mut().zip(lane.iter()) {
                    *b = *v;
                }
                plan.process_with_scratch(buf, &mut self.scratch);
                for (v, b) in lane.iter_mut().zip(buf.iter()) {
                    *v = *b * scale;
                }
            }
        }
    }
}

/// Signed frequency of bin `i` for an n-point transform: bins in the upper
/// half alias to negative frequencies, the Nyquist bin (even n) to `-n/2`.
#[inline]
pub fn signed_freq(i: usize, n: usize) -> f64 {
    if i < (n + 1) / 2 {
        i as f64
    } else {
        i as f64 - n as f64
    }
}

/// Index of the Nyquist bin for an even n-point transform.
#[inline]
pub fn nyquist_bin(n: usize) -> usize {
    n / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_unit_gain() {
        let mut data = Array3::from_shape_fn((4, 3, 5), |(i, j, k)| {
            Complex64::new((i + 2 * j) as f64, k as f64 - 1.0)
        });
        let orig = data.clone();
        let mut ws = FftWorkspace::new(4, 3, 5);
        for axis in [Axis3::X, Axis3::Y, Axis3::Z] {
            ws.transform(&mut data, axis, Direction::Forward);
            ws.transform(&mut data, axis, Direction::Inverse);
        }
        for (a, b) in data.iter().zip(orig.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_signed_freq_layout() {
        assert_eq!(signed_freq(0, 8), 0.0);
        assert_eq!(signed_freq(3, 8), 3.0);
        assert_eq!(signed_freq(4, 8), -4.0);
        assert_eq!(signed_freq(7, 8), -1.0);
        assert_eq!(signed_freq(2, 5), 2.0);
        assert_eq!(signed_freq(3, 5), -2.0);
        assert_eq!(nyquist_bin(8), 4);
    }
}
