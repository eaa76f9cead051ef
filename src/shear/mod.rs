pub mod decompose;
pub mod params;
pub mod quality;
pub mod repair;

pub use self::decompose::{
    best_decomposition, best_long_decomposition, decompose, shear_sequence, trans_shear_adjust,
    CANCELLATION_TOL,
};
pub use self::params::{QualityMeasure, ShearCoeffs, ShearParams, ShearPattern, Shift};
pub use self::repair::{find_repairing_quat, find_repairing_quat_long, REPAIR_QUAT_MAX_STEPS};
