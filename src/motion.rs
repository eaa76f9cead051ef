//! Reading and writing of per-timepoint motion parameter files.
//!
//! Each data line carries a timepoint index, a unit quaternion, a shift in
//! voxel units and optionally the registration residual:
//! `t qx qy qz qw dx dy dz [mse]`. Comment lines start with `#`; a
//! `##Format: names:(...)` header announces whether the records are in
//! forward (`3d_q_*`) or inverse (`3d_qbar_*`) convention. Inverse records
//! are converted on load by inverting the full homogeneous transform.

use crate::error::RotateError;
use crate::quat::{Quaternion, Transform};
use crate::shear::Shift;

/// Registration parameters for one timepoint, always held in forward
/// convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub t: i64,
    pub q: Quaternion,
    pub shift: Shift,
    pub mse: Option<f64>,
}

impl MotionParams {
    /// The inverse motion: rotate and shift such that applying both maps
    /// the moved volume back onto the original.
    pub fn inverted(&self) -> Result<Self, RotateError> {
        let t = Transform::from_quat(&self.q, self.shift.dx, self.shift.dy, self.shift.dz);
        let inv = t.inverse()?;
        let [dx, dy, dz] = inv.translation();
        Ok(Self {
            t: self.t,
            q: inv.to_quat(),
            shift: Shift::new(dx, dy, dz),
            mse: self.mse,
        })
    }
}

const FORWARD_NAMES: [&str; 7] = [
    "3d_q_x",
    "3d_q_y",
    "3d_q_z",
    "3d_q_w",
    "3d_deltax",
    "3d_deltay",
    "3d_deltaz",
];

const INVERSE_NAMES: [&str; 7] = [
    "3d_qbar_x",
    "3d_qbar_y",
    "3d_qbar_z",
    "3d_qbar_w",
    "3d_deltabarx",
    "3d_deltabary",
    "3d_deltabarz",
];

fn detect_convention(header: &str, line_no: usize) -> Result<Option<bool>, RotateError> {
    let names = match header.find("names:") {
        Some(at) => &header[at..],
        None => return Ok(None),
    };
    let open = names.find('(');
    let close = names.find(')');
    let range = match (open, close) {
        (Some(o), Some(c)) if o < c => &names[o + 1..c],
        _ => {
            return Err(RotateError::ParseError {
                line: line_no,
                reason: "badly formatted Format:names: entry".into(),
            })
        }
    };
    let inverse_hits = INVERSE_NAMES.iter().filter(|n| range.contains(*n)).count();
    let forward_hits = FORWARD_NAMES.iter().filter(|n| range.contains(*n)).count();
    if inverse_hits == 7 {
        Ok(Some(true))
    } else if forward_hits == 7 {
        Ok(Some(false))
    } else {
        Err(RotateError::ParseError {
            line: line_no,
            reason: "unrecognized field names in parameter file".into(),
        })
    }
}

/// Parse a whole parameter file. Records in inverse convention are
/// converted to forward convention. Data lines shorter than eight fields
/// are skipped, as the sibling tools do.
pub fn parse_motion_file(text: &str) -> Result<Vec<MotionParams>, RotateError> {
    let mut inverse_mode: Option<bool> = None;
    let mut out = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            if trimmed.contains("##Format:") {
                if let Some(mode) = detect_convention(trimmed, line_no)? {
                    inverse_mode = Some(mode);
                }
            }
            continue;
        }

        let inverse = inverse_mode.ok_or_else(|| RotateError::ParseError {
            line: line_no,
            reason: "parameter file lacks the needed format information".into(),
        })?;

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 8 {
            continue;
        }
        let mut nums = [0.0f64; 8];
        for (slot, field) in nums.iter_mut().zip(&fields[..8]) {
            *slot = field.parse().map_err(|_| RotateError::ParseError {
                line: line_no,
                reason: format!("unparsable field {:?}", field),
            })?;
        }
        let mse: Option<f64> = if fields.len() > 8 {
            Some(fields[8].parse().map_err(|_| RotateError::ParseError {
                line: line_no,
                reason: format!("unparsable mse field {:?}", fields[8]),
            })?)
        } else {
            None
        };

        let (x, y, z) = (nums[1], nums[2], nums[3]);
        let rsqr = x * x + y * y + z * z;
        if rsqr > 1.0 {
            return Err(RotateError::ParseError {
                line: line_no,
                reason: "quaternion imaginary part exceeds unit magnitude".into(),
            });
        }
        // The stored w is the least accurate component; rebuild it from
        // the unit constraint keeping only its sign.
        let q = Quaternion::from_vector_part(x, y, z, nums[4] >= 0.0);

        let mut record = MotionParams {
            t: nums[0] as i64,
            q,
            shift: Shift::new(nums[5], nums[6], nums[7]),
            mse,
        };
        if inverse {
            record = record.inverted()?;
        }
        out.push(record);
    }
    Ok(out)
}

/// Render parameters as a file in forward convention.
pub fn write_motion_file(records: &[MotionParams]) -> String {
    let mut out = String::from("##Format: order:index_t, type:raw\n");
    out.push_str(
        "##Format: names:(3d_q_x,3d_q_y,3d_q_z,3d_q_w,3d_deltax,3d_deltay,3d_deltaz,mse)\n",
    );
    for r in records {
        out.push_str(&format!(
            "{} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15}\n",
            r.t,
            r.q.x,
            r.q.y,
            r.q.z,
            r.q.w,
            r.shift.dx,
            r.shift.dy,
            r.shift.dz,
            r.mse.unwrap_or(0.0)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_forward_file() {
        let text = "\
##Format: order:index_t, type:raw
##Format: names:(3d_q_x,3d_q_y,3d_q_z,3d_q_w,3d_deltax,3d_deltay,3d_deltaz,mse)
# comment line
0 0.0 0.0 0.0 1.0 0.0 0.0 0.0 0.5
1 0.1 0.0 0.0 0.99498743710662 1.5 -0.5 2.0 0.25
";
        let records = parse_motion_file(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].t, 0);
        assert_relative_eq!(records[0].q.w, 1.0);
        assert_relative_eq!(records[1].q.x, 0.1);
        assert_relative_eq!(records[1].q.magnitude(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(records[1].shift.dx, 1.5);
        assert_eq!(records[1].mse, Some(0.25));
    }

    #[test]
    fn test_missing_header_is_error() {
        let text = "0 0.0 0.0 0.0 1.0 0.0 0.0 0.0\n";
        assert!(matches!(
            parse_motion_file(text),
            Err(RotateError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_short_lines_skipped() {
        let text = "\
##Format: names:(3d_q_x,3d_q_y,3d_q_z,3d_q_w,3d_deltax,3d_deltay,3d_deltaz)
0 0.0 0.0
1 0.0 0.0 0.0 1.0 1.0 2.0 3.0
";
        let records = parse_motion_file(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].t, 1);
    }

    #[test]
    fn test_inverse_convention_round_trip() {
        let q = Quaternion::from_axis_angle([0.0, 0.6, 0.8], 0.4);
        let forward = MotionParams {
            t: 3,
            q,
            shift: Shift::new(1.0, -2.0, 0.5),
            mse: None,
        };
        let inverse = forward.inverted().unwrap();
        let back = inverse.inverted().unwrap();
        assert_relative_eq!(back.q.x, q.x, epsilon = 1e-10);
        assert_relative_eq!(back.q.y, q.y, epsilon = 1e-10);
        assert_relative_eq!(back.q.z, q.z, epsilon = 1e-10);
        assert_relative_eq!(back.q.w, q.w, epsilon = 1e-10);
        assert_relative_eq!(back.shift.dx, forward.shift.dx, epsilon = 1e-10);
        assert_relative_eq!(back.shift.dy, forward.shift.dy, epsilon = 1e-10);
        assert_relative_eq!(back.shift.dz, forward.shift.dz, epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_file_converts_to_forward() {
        let q = Quaternion::from_axis_angle([1.0, 0.0, 0.0], 0.3);
        let forward = MotionParams {
            t: 0,
            q,
            shift: Shift::new(0.5, 1.0, -1.0),
            mse: Some(0.125),
        };
        let inverse = forward.inverted().unwrap();
        let text = format!(
            "##Format: names:(3d_qbar_x,3d_qbar_y,3d_qbar_z,3d_qbar_w,3d_deltabarx,3d_deltabary,3d_deltabarz,mse)\n\
             {} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15} {:.15}\n",
            inverse.t,
            inverse.q.x,
            inverse.q.y,
            inverse.q.z,
            inverse.q.w,
            inverse.shift.dx,
            inverse.shift.dy,
            inverse.shift.dz,
            0.125
        );
        let records = parse_motion_file(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_relative_eq!(records[0].q.x, q.x, epsilon = 1e-9);
        assert_relative_eq!(records[0].q.w, q.w, epsilon = 1e-9);
        assert_relative_eq!(records[0].shift.dx, forward.shift.dx, epsilon = 1e-9);
        assert_relative_eq!(records[0].shift.dy, forward.shift.dy, epsilon = 1e-9);
        assert_relative_eq!(records[0].shift.dz, forward.shift.dz, epsilon = 1e-9);
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let records = vec![
            MotionParams {
                t: 0,
                q: Quaternion::identity(),
                shift: Shift::zero(),
                mse: Some(0.0),
            },
            MotionParams {
                t: 1,
                q: Quaternion::from_axis_angle([0.0, 0.0, 1.0], -0.2),
                shift: Shift::new(0.25, 0.5, -0.75),
                mse: Some(1.5),
            },
        ];
        let text = write_motion_file(&records);
        let back = parse_motion_file(&text).unwrap();
        assert_eq!(back.len(), 2);
        for (a, b) in back.iter().zip(records.iter()) {
            assert_eq!(a.t, b.t);
            assert_relative_eq!(a.q.x, b.q.x, epsilon = 1e-12);
            assert_relative_eq!(a.q.w, b.q.w, epsilon = 1e-12);
            assert_relative_eq!(a.shift.dx, b.shift.dx, epsilon = 1e-12);
        }
    }
}
