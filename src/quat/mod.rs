pub mod euler;
pub mod quaternion;
pub mod transform;

pub use self::euler::{
    euler5_decompose, from_euler_rz_ry_rx, to_euler_rz_ry_rx, EULER_DECOMP_MAX_ITER,
};
pub use self::quaternion::Quaternion;
pub use self::transform::Transform;
