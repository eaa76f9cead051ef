//! Search for a small corrective rotation when every shear decomposition
//! of the input quaternion is singular.

use crate::error::RotateError;
use crate::quat::Quaternion;
use crate::shear::decompose::{best_decomposition, best_long_decomposition};
use crate::shear::params::QualityMeasure;

/// Step budget of the repair search.
pub const REPAIR_QUAT_MAX_STEPS: usize = 10;

/// Size of one corrective step, in the quaternion's imaginary part.
pub const REPAIR_QUAT_STEPSIZE: f64 = 0.01;

fn step_quat(step: usize) -> Quaternion {
    match step % 3 {
        0 => Quaternion::from_vector_part(REPAIR_QUAT_STEPSIZE, 0.0, 0.0, true),
        1 => Quaternion::from_vector_part(0.0, REPAIR_QUAT_STEPSIZE, 0.0, true),
        _ => Quaternion::from_vector_part(0.0, 0.0, REPAIR_QUAT_STEPSIZE, true),
    }
}

fn find(q: &Quaternion, measure: QualityMeasure, long: bool) -> Result<Quaternion, RotateError> {
    let mut repair = Quaternion::identity();
    for step in 0..=REPAIR_QUAT_MAX_STEPS {
        repair = repair * step_quat(step);
        let candidate = repair * *q;
        let safe = if long {
            best_long_decomposition(&candidate, measure).is_some()
        } else {
            best_decomposition(&candidate, measure).is_some()
        };
        if safe {
            return Ok(repair);
        }
    }
    Err(RotateError::RepairExhausted {
        steps: REPAIR_QUAT_MAX_STEPS,
    })
}

/// Accumulate 0.01 radian steps about x, y, z cyclically until composing
/// the accumulated rotation with `q` admits a non-singular elementary
/// decomposition.
pub fn find_repairing_quat(q: &Quaternion, measure: QualityMeasure) -> Result<Quaternion, RotateError> {
    find(q, measure, false)
}

/// As `find_repairing_quat`, testing against the long decompositions.
pub fn find_repairing_quat_long(
    q: &Quaternion,
    measure: QualityMeasure,
) -> Result<Quaternion, RotateError> {
    find(q, measure, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_fixes_planar_2pi_rotation() {
        // w ~ 0 with the imaginary part on a coordinate axis defeats every
        // elementary pattern
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::PI - 0.001);
        assert!(best_decomposition(&q, QualityMeasure::Cox).is_none());

        let repair = find_repairing_quat(&q, QualityMeasure::Cox).unwrap();
        let repaired = repair * q;
        assert!(best_decomposition(&repaired, QualityMeasure::Cox).is_some());
    }
}
