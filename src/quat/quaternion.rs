use std::ops::{Mul, Neg};

use crate::error::RotateError;

/// Unit quaternion representing a 3D rotation.
///
/// Vector-first convention: `(x, y, z)` is the imaginary part, `w` the
/// scalar part. The unit invariant `x² + y² + z² + w² = 1` is maintained by
/// explicit normalization after composition, not enforced by the type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Identity quaternion (no rotation).
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Build a unit quaternion from its imaginary part, deriving `w` from
    /// the unit constraint. Requires `x² + y² + z² <= 1`.
    #[inline]
    pub fn from_vector_part(x: f64, y: f64, z: f64, w_positive: bool) -> Self {
        let w = (1.0 - (x * x + y * y + z * z)).sqrt();
        Self {
            x,
            y,
            z,
            w: if w_positive { w } else { -w },
        }
    }

    /// Rotation by `theta` radians about `axis`. The axis must be unit
    /// length.
    pub fn from_axis_angle(axis: [f64; 3], theta: f64) -> Self {
        let (sin_a, cos_a) = (0.5 * theta).sin_cos();
        let q = Self {
            x: axis[0] * sin_a,
            y: axis[1] * sin_a,
            z: axis[2] * sin_a,
            w: cos_a,
        };
        let mag = q.magnitude();
        Self {
            x: q.x / mag,
            y: q.y / mag,
            z: q.z / mag,
            w: q.w / mag,
        }
    }

    /// Axis and angle of the rotation. A degenerate imaginary part yields
    /// the z axis with angle given by `w` alone.
    pub fn to_axis_angle(&self) -> ([f64; 3], f64) {
        let mag = self.magnitude();
        let (x, y, z, w) = (self.x / mag, self.y / mag, self.z / mag, self.w / mag);
        let len = (x * x + y * y + z * z).sqrt();
        let axis = if len > 0.0 {
            [x / len, y / len, z / len]
        } else {
            [0.0, 0.0, 1.0]
        };
        (axis, 2.0 * w.clamp(-1.0, 1.0).acos())
    }

    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit magnitude. A zero quaternion has no direction and is
    /// reported as degenerate input.
    pub fn normalized(&self) -> Result<Self, RotateError> {
        let mag = self.magnitude();
        if mag == 0.0 {
            return Err(RotateError::DegenerateInput(
                "cannot normalize a zero quaternion".into(),
            ));
        }
        Ok(Self {
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
            w: self.w / mag,
        })
    }

    /// Normalized quaternion square root.
    ///
    /// For `w >= 0` this is the direct half-angle formula. For `w < 0` the
    /// square root of the negated quaternion is taken and the result is
    /// reassembled by multiplying with the imaginary unit along the root's
    /// own imaginary direction, so the returned `w` is `-|v|` of that root.
    /// At the `w = -1` symmetry point the x axis is used as the default
    /// direction.
    pub fn nrm_sqrt(&self) -> Self {
        if self.w >= 0.0 {
            let k = 1.0 / (2.0 * (1.0 + self.w)).sqrt();
            let rsqr = self.x * self.x + self.y * self.y + self.z * self.z;
            Self {
                x: k * self.x,
                y: k * self.y,
                z: k * self.z,
                w: (1.0 - k * k * rsqr).sqrt(),
            }
        } else {
            let root = (-*self).nrm_sqrt();
            let mag = (root.x * root.x + root.y * root.y + root.z * root.z).sqrt();
            let v = if mag == 0.0 {
                [1.0, 0.0, 0.0]
            } else {
                [root.x / mag, root.y / mag, root.z / mag]
            };
            Self {
                x: root.w * v[0],
                y: root.w * v[1],
                z: root.w * v[2],
                w: -mag,
            }
        }
    }
}

/// Hamilton product. Order matters: `a * b` rotates by `b` first, then `a`.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, f: Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * f.w - (self.x * f.x + self.y * f.y + self.z * f.z),
            x: self.y * f.z - self.z * f.y + self.w * f.x + self.x * f.w,
            y: self.z * f.x - self.x * f.z + self.w * f.y + self.y * f.w,
            z: self.x * f.y - self.y * f.x + self.w * f.z + self.z * f.w,
        }
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;

    fn neg(self) -> Quaternion {
        Quaternion {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w,
        }
    }
}
