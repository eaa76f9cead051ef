use crate::error::RotateError;
use crate::quat::Quaternion;

/// Iteration cap for the fixed-point Euler angle searches.
pub const EULER_DECOMP_MAX_ITER: usize = 100;

/// Residual rotation angle below which the search is considered converged.
/// The quaternion products put a rounding floor of a few 1e-16 under the
/// residual's scalar part, so an exact zero is not reachable in general.
const EULER_CONVERGENCE_TOL: f64 = 1e-9;

/// Quaternion of the rotation `Rz(z) * Ry(y) * Rx(x)` (x applied first).
pub fn from_euler_rz_ry_rx(x_angle: f64, y_angle: f64, z_angle: f64) -> Quaternion {
    let rx = Quaternion::from_axis_angle([1.0, 0.0, 0.0], x_angle);
    let ry = Quaternion::from_axis_angle([0.0, 1.0, 0.0], y_angle);
    let rz = Quaternion::from_axis_angle([0.0, 0.0, 1.0], z_angle);
    rz * ry * rx
}

/// Find Euler angles such that `Rz(z) * Ry(y) * Rx(x)` equals the rotation
/// of `q`, by fixed-point iteration on the residual rotation.
///
/// The update step only contracts for modest rotation angles (head-motion
/// scale); large rotations fail with `ConvergenceFailure`.
pub fn to_euler_rz_ry_rx(q: &Quaternion) -> Result<(f64, f64, f64), RotateError> {
    let mut theta_x = 0.0;
    let mut theta_y = 0.0;
    let mut theta_z = 0.0;
    let mut iter = 0usize;

    loop {
        let rx = Quaternion::from_axis_angle([1.0, 0.0, 0.0], theta_x);
        let ry = Quaternion::from_axis_angle([0.0, 1.0, 0.0], theta_y);
        let rz = Quaternion::from_axis_angle([0.0, 0.0, 1.0], theta_z);

        let residual = q.conjugate() * rz * ry * rx;
        let ([x, y, z], phi) = residual.to_axis_angle();
        theta_x -= x * phi;
        theta_y -= y * phi;
        theta_z -= z * phi;

        if phi <= EULER_CONVERGENCE_TOL {
            break;
        }
        if iter >= EULER_DECOMP_MAX_ITER {
            return Err(RotateError::ConvergenceFailure {
                iterations: EULER_DECOMP_MAX_ITER,
            });
        }
        iter += 1;
    }

    Ok((theta_x, theta_y, theta_z))
}

/// Find angles such that the symmetric series `Rz(z) * Ry(y) * Rx(x) *
/// Ry(y) * Rz(z)` equals the rotation of `q`, with the y and z rotations
/// each split over two half-weight steps. The returned x angle covers both
/// central x rotations.
pub fn euler5_decompose(q: &Quaternion) -> Result<(f64, f64, f64), RotateError> {
    let mut theta_x = 0.0;
    let mut theta_y = 0.0;
    let mut theta_z = 0.0;
    let mut iter = 0usize;

    loop {
        let rx = Quaternion::from_axis_angle([1.0, 0.0, 0.0], theta_x);
        let ry = Quaternion::from_axis_angle([0.0, 1.0, 0.0], theta_y);
        let rz = Quaternion::from_axis_angle([0.0, 0.0, 1.0], theta_z);

        let residual = q.conjugate() * rz * ry * rx * rx * ry * rz;
        let ([x, y, z], phi) = residual.to_axis_angle();
        theta_x -= 0.5 * x * phi;
        theta_y -= 0.5 * y * phi;
        theta_z -= 0.5 * z * phi;

        if phi <= EULER_CONVERGENCE_TOL {
            break;
        }
        if iter >= EULER_DECOMP_MAX_ITER {
            return Err(RotateError::ConvergenceFailure {
                iterations: EULER_DECOMP_MAX_ITER,
            });
        }
        iter += 1;
    }

    Ok((2.0 * theta_x, theta_y, theta_z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rz_ry_rx_round_trip() {
        for &(x, y, z) in &[(0.2, -0.3, 0.25), (0.0, 0.0, 0.0), (-0.15, 0.1, 0.3)] {
            let q = from_euler_rz_ry_rx(x, y, z);
            let (xo, yo, zo) = to_euler_rz_ry_rx(&q).unwrap();
            let back = from_euler_rz_ry_rx(xo, yo, zo);
            assert_relative_eq!(back.x, q.x, epsilon = 1e-7);
            assert_relative_eq!(back.y, q.y, epsilon = 1e-7);
            assert_relative_eq!(back.z, q.z, epsilon = 1e-7);
            assert_relative_eq!(back.w, q.w, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_euler5_reproduces_rotation() {
        for &(axis, theta) in &[
            ([1.0, 0.0, 0.0], 0.3),
            ([0.0, 0.6, 0.8], -0.35),
            (
                [0.577350269189626, 0.577350269189626, 0.577350269189626],
                0.4,
            ),
        ] {
            let q = Quaternion::from_axis_angle(axis, theta);
            let (x, y, z) = euler5_decompose(&q).unwrap();
            let rx = Quaternion::from_axis_angle([1.0, 0.0, 0.0], x);
            let ry = Quaternion::from_axis_angle([0.0, 1.0, 0.0], y);
            let rz = Quaternion::from_axis_angle([0.0, 0.0, 1.0], z);
            let back = rz * ry * rx * ry * rz;
            let sign = if back.w * q.w < 0.0 { -1.0 } else { 1.0 };
            assert_relative_eq!(sign * back.x, q.x, epsilon = 1e-7);
            assert_relative_eq!(sign * back.y, q.y, epsilon = 1e-7);
            assert_relative_eq!(sign * back.z, q.z, epsilon = 1e-7);
            assert_relative_eq!(sign * back.w, q.w, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_convergence_failure_reported() {
        // a near-180 degree rotation about a skew axis sits outside the
        // contraction region of the update step
        let q = Quaternion::from_axis_angle([0.6, 0.48, 0.64], 3.1);
        assert!(matches!(
            to_euler_rz_ry_rx(&q),
            Err(RotateError::ConvergenceFailure { .. })
        ));
    }
}
