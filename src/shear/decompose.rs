//! Closed-form decomposition of a unit quaternion into axis-aligned shear
//! coefficients.
//!
//! The YZXY order is the algebraic primitive. The other five elementary
//! orders reuse it through component permutations and sign flips of the
//! quaternion, remapping the eight outputs. The long orders concatenate the
//! forward and reversed elementary decompositions of the rotation's square
//! root.

use crate::quat::Quaternion;
use crate::shear::params::{QualityMeasure, ShearCoeffs, ShearParams, ShearPattern, Shift};
use crate::shear::quality::scored;
use crate::volume::Axis3;

/// Magnitude below which a denominator term is treated as cancellation
/// prone. Empirically tuned against registration data rather than derived.
pub const CANCELLATION_TOL: f64 = 0.01;

/// Shear coefficients for the YZXY order, or `None` when the quaternion
/// sits on (or too close to) a singularity of every usable branch.
///
/// Branches, in order: exact identity; small `W` (Taylor expansion in `W`,
/// singular when any imaginary component is also small); exact `Y == 0`
/// closed form; general closed form when both `R = XY - ZW` and
/// `S = YZ - XW` are comfortably nonzero; expansion in small `Y` when `R/Y`
/// and `S/Y` stay usable.
fn shears_yzxy(q: &Quaternion) -> Option<ShearCoeffs> {
    let x = q.x;
    let y = q.y;
    let z = q.z;
    let w = q.w;
    let r = x * y - z * w;
    let s = y * z - x * w;

    if x == 0.0 && y == 0.0 && z == 0.0 {
        return Some(ShearCoeffs::default());
    }

    if w.abs() < CANCELLATION_TOL {
        if x.abs() < CANCELLATION_TOL || y.abs() < CANCELLATION_TOL || z.abs() < CANCELLATION_TOL {
            // rotation by ~2 pi in a coordinate plane; no usable expansion
            return None;
        }
        return Some(ShearCoeffs {
            a: (y * y + x * x)
                * (1.0 / (y * z) + (x * w) / (y * y * z * z)
                    + (x * x * w * w) / (y * y * y * z * z * z)),
            b: (-1.0 - x * x) / (x * y)
                - w * (1.0 - y * y + x * x * x * x + x * x * y * y) / (x * x * y * y * z)
                - (1.0 - x * x - 2.0 * y * y
                    + y * y * y * y
                    + x * x * x * x * y * y
                    + x * x * x * x * x * x
                    + x * x * x * x
                    + x * x * y * y)
                    * w
                    * w
                    / (x * x * x * y * y * y * z * z),
            c: (2.0 * z / x)
                + (2.0 * z * z * w) / (x * x * y)
                + (2.0 * z * z * z * w * w) / (x * x * x * y * y),
            d: 2.0 * (x * w - y * z),
            e: 2.0 * (x * y - z * w),
            f: -(2.0 * x / z)
                - (2.0 * x * x * w) / (z * z * y)
                - (2.0 * x * x * x * w * w) / (z * z * z * y * y),
            g: (2.0 - (x * x + y * y)) / (y * z)
                + ((2.0 - 2.0 * (x * x + y * y) + x * x * (y * y + x * x)) * w)
                    / (x * y * y * z * z)
                - ((-2.0
                    + 4.0 * x * x
                    + 4.0 * y * y
                    + 2.0 * x * x * y * y * y * y
                    - 2.0 * y * y * y * y
                    + 3.0 * x * x * x * x * y * y
                    + x * x * x * x * x * x
                    - 4.0 * x * x * x * x
                    - 6.0 * x * x * y * y)
                    * w
                    * w)
                    / (z * z * z * x * x * y * y * y)
                - (2.0 * w * w) / (y * z),
            h: -(y * y + z * z)
                * (1.0 / (x * y) + (z * w) / (x * x * y * y)
                    + (z * z * w * w) / (x * x * x * y * y * y)),
        });
    }

    if y == 0.0 {
        return Some(ShearCoeffs {
            a: -x / w,
            b: z / w,
            c: 0.0,
            d: 2.0 * x * w,
            e: -2.0 * z * w,
            f: 0.0,
            g: -x / w,
            h: z / w,
        });
    }

    let d = -2.0 * s;
    let e = 2.0 * r;

    if s.abs() >= CANCELLATION_TOL && r.abs() >= CANCELLATION_TOL {
        return Some(ShearCoeffs {
            a: (x * x + y * y) / s,
            b: (-1.0 + w * w - x * x) / r - 2.0 * x * w * (x * x + y * y) / (r * s),
            c: 2.0 * y * z / r,
            d,
            e,
            f: -2.0 * x * y / s,
            g: (x * x - y * y) / s + 2.0 * x * y * (y * y + z * z) / (r * s),
            h: -(y * y + z * z) / r,
        });
    }

    if y.abs() < CANCELLATION_TOL
        && (r.abs() >= CANCELLATION_TOL || (r / y).abs() >= CANCELLATION_TOL)
        && (s.abs() >= CANCELLATION_TOL || (s / y).abs() >= CANCELLATION_TOL)
    {
        // expansion in small Y, in terms of R and S
        let w2 = w * w;
        let w3 = w2 * w;
        let w4 = w2 * w2;
        let w5 = w4 * w;
        return Some(ShearCoeffs {
            a: s / w2
                + (2.0 * y * r) / w3
                + (2.0 * y * y * s) / w4
                + y * (y / s)
                + (y * (y / s) * r * r) / w4,
            b: -r / w2
                + ((y / r) * y * s * s) / w4
                + (2.0 * y * y * r) / w4
                + y * (y / r)
                + (2.0 * y * y * (y / s) * r * r) / w5
                + (2.0 * y * y * (y / s)) / w,
            c: -2.0 * y / w - (2.0 * y * (y / r) * s) / w2 - (2.0 * y * y * y) / w3,
            d,
            e,
            f: 2.0 * y / w + (2.0 * y * (y / s) * r) / w2 + (2.0 * y * y * y) / w3,
            g: s / w2
                - (2.0 * y * y * s) / w4
                - (y * (y / s) * r * r) / w4
                - y * (y / s)
                - (6.0 * y * y * y * r) / w5
                - 2.0 * y * y * (y / r) * s * s / w5
                - (2.0 * y * y * (y / r)) / w,
            h: -r / w2
                - (2.0 * y * s) / w3
                - (2.0 * y * y * r) / w4
                - (y * (y / r) * s * s) / w4
                - y * (y / r),
        });
    }

    None
}

/// Remap a YZXY coefficient set into the reversed order obtained by
/// negating `w`: the sequence reverses and every coefficient flips sign.
fn reversed(c: ShearCoeffs) -> ShearCoeffs {
    ShearCoeffs {
        a: -c.g,
        b: -c.h,
        c: -c.e,
        d: -c.f,
        e: -c.c,
        f: -c.d,
        g: -c.a,
        h: -c.b,
    }
}

/// Raw coefficients of one elementary pattern.
fn elementary(pattern: ShearPattern, q: &Quaternion) -> Option<ShearCoeffs> {
    match pattern {
        ShearPattern::Yzxy => shears_yzxy(q),
        ShearPattern::Yxzy => shears_yzxy(&Quaternion::new(q.x, q.y, q.z, -q.w)).map(reversed),
        ShearPattern::Zxyz => shears_yzxy(&Quaternion::new(q.y, q.z, q.x, q.w)),
        ShearPattern::Zyxz => shears_yzxy(&Quaternion::new(q.y, q.z, q.x, -q.w)).map(reversed),
        ShearPattern::Xyzx => shears_yzxy(&Quaternion::new(q.z, q.x, q.y, q.w)),
        ShearPattern::Xzyx => shears_yzxy(&Quaternion::new(q.z, q.x, q.y, -q.w)).map(reversed),
        _ => unreachable!("elementary() called with a long pattern"),
    }
}

/// Decompose `q` following one named pattern and score the result.
pub fn decompose(
    pattern: ShearPattern,
    q: &Quaternion,
    measure: QualityMeasure,
) -> Option<ShearParams> {
    if !pattern.is_long() {
        return elementary(pattern, q).map(|main| scored(pattern, main, None, measure));
    }

    // Work with the sign that minimizes the rotation angle before taking
    // the square root.
    let qpos = if q.w < 0.0 { -*q } else { *q };
    let half = qpos.nrm_sqrt();
    let (fwd_pat, bkwd_pat) = match pattern {
        ShearPattern::Yzxyxzy => (ShearPattern::Yzxy, ShearPattern::Yxzy),
        ShearPattern::Zxyzyxz => (ShearPattern::Zxyz, ShearPattern::Zyxz),
        ShearPattern::Xyzxzyx => (ShearPattern::Xyzx, ShearPattern::Xzyx),
        _ => unreachable!(),
    };
    let fwd = elementary(fwd_pat, &half)?;
    let bkwd = elementary(bkwd_pat, &half)?;
    Some(scored(pattern, fwd, Some(bkwd), measure))
}

/// Best-scoring non-singular elementary decomposition, if any.
pub fn best_decomposition(q: &Quaternion, measure: QualityMeasure) -> Option<ShearParams> {
    let mut best: Option<ShearParams> = None;
    for pattern in ShearPattern::ELEMENTARY {
        if let Some(candidate) = decompose(pattern, q, measure) {
            if best.map_or(true, |b| candidate.quality < b.quality) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Best-scoring non-singular long decomposition, if any.
pub fn best_long_decomposition(q: &Quaternion, measure: QualityMeasure) -> Option<ShearParams> {
    let mut best: Option<ShearParams> = None;
    for pattern in ShearPattern::LONG {
        if let Some(candidate) = decompose(pattern, q, measure) {
            if best.map_or(true, |b| candidate.quality < b.quality) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Recompute the per-step translations so that interleaving them with the
/// pattern's shears composes to the requested net shift. Long patterns
/// share the formula of the elementary order they end with.
pub fn trans_shear_adjust(params: &ShearParams, t: Shift) -> Shift {
    let s = &params.main;
    match params.pattern {
        ShearPattern::Yzxyxzy | ShearPattern::Yzxy => Shift {
            dx: t.dx,
            dy: t.dy - s.b * t.dx - s.a * t.dz,
            dz: t.dz - s.c * t.dx,
        },
        ShearPattern::Yxzy => Shift {
            dx: t.dx - s.d * t.dz,
            dy: t.dy - s.b * t.dx - s.a * t.dz,
            dz: t.dz,
        },
        ShearPattern::Zxyzyxz | ShearPattern::Zxyz => Shift {
            dx: t.dx - s.c * t.dy,
            dy: t.dy,
            dz: t.dz - s.b * t.dy - s.a * t.dx,
        },
        ShearPattern::Zyxz => Shift {
            dx: t.dx,
            dy: t.dy - s.d * t.dx,
            dz: t.dz - s.b * t.dy - s.a * t.dx,
        },
        ShearPattern::Xyzxzyx | ShearPattern::Xyzx => Shift {
            dx: t.dx - s.b * t.dz - s.a * t.dy,
            dy: t.dy - s.c * t.dz,
            dz: t.dz,
        },
        ShearPattern::Xzyx => Shift {
            dx: t.dx - s.b * t.dz - s.a * t.dy,
            dy: t.dy,
            dz: t.dz - s.d * t.dy,
        },
    }
}

/// The ordered shear passes realizing a decomposition, first applied pass
/// first. Each entry is `(axis, a, b, delta)`; `adj` must already be the
/// output of `trans_shear_adjust` for the same parameters.
pub fn shear_sequence(params: &ShearParams, adj: Shift) -> Vec<(Axis3, f64, f64, f64)> {
    use Axis3::{X, Y, Z};
    let s = &params.main;
    match params.pattern {
        ShearPattern::Yzxy => vec![
            (Y, s.g, s.h, 0.0),
            (X, s.e, s.f, adj.dx),
            (Z, s.c, s.d, adj.dz),
            (Y, s.a, s.b, adj.dy),
        ],
        ShearPattern::Yxzy => vec![
            (Y, s.g, s.h, 0.0),
            (Z, s.e, s.f, adj.dz),
            (X, s.c, s.d, adj.dx),
            (Y, s.a, s.b, adj.dy),
        ],
        ShearPattern::Zxyz => vec![
            (Z, s.g, s.h, 0.0),
            (Y, s.e, s.f, adj.dy),
            (X, s.c, s.d, adj.dx),
            (Z, s.a, s.b, adj.dz),
        ],
        ShearPattern::Zyxz => vec![
            (Z, s.g, s.h, 0.0),
            (X, s.e, s.f, adj.dx),
            (Y, s.c, s.d, adj.dy),
            (Z, s.a, s.b, adj.dz),
        ],
        ShearPattern::Xyzx => vec![
            (X, s.g, s.h, 0.0),
            (Z, s.e, s.f, adj.dz),
            (Y, s.c, s.d, adj.dy),
            (X, s.a, s.b, adj.dx),
        ],
        ShearPattern::Xzyx => vec![
            (X, s.g, s.h, 0.0),
            (Y, s.e, s.f, adj.dy),
            (Z, s.c, s.d, adj.dz),
            (X, s.a, s.b, adj.dx),
        ],
        ShearPattern::Yzxyxzy => {
            let bar = params.bar.expect("long pattern carries a bar set");
            vec![
                (Y, bar.g, bar.h, 0.0),
                (Z, bar.e, bar.f, 0.0),
                (X, bar.c, bar.d, 0.0),
                (Y, s.g + bar.a, s.h + bar.b, 0.0),
                (X, s.e, s.f, adj.dx),
                (Z, s.c, s.d, adj.dz),
                (Y, s.a, s.b, adj.dy),
            ]
        }
        ShearPattern::Zxyzyxz => {
            let bar = params.bar.expect("long pattern carries a bar set");
            vec![
                (Z, bar.g, bar.h, 0.0),
                (X, bar.e, bar.f, 0.0),
                (Y, bar.c, bar.d, 0.0),
                (Z, s.g + bar.a, s.h + bar.b, 0.0),
                (Y, s.e, s.f, adj.dy),
                (X, s.c, s.d, adj.dx),
                (Z, s.a, s.b, adj.dz),
            ]
        }
        ShearPattern::Xyzxzyx => {
            let bar = params.bar.expect("long pattern carries a bar set");
            vec![
                (X, bar.g, bar.h, 0.0),
                (Y, bar.e, bar.f, 0.0),
                (Z, bar.c, bar.d, 0.0),
                (X, s.g + bar.a, s.h + bar.b, 0.0),
                (Z, s.e, s.f, adj.dz),
                (Y, s.c, s.d, adj.dy),
                (X, s.a, s.b, adj.dx),
            ]
        }
    }
}
