use ndarray::Array3;
use num_complex::Complex64;

/// One of the three volume axes. `X` is the slowest index in memory, `Z`
/// the fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis3 {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis3 {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Complex 3D image volume with its voxel geometry.
///
/// Samples are stored with dimensions `(nx, ny, nz)` and the z index
/// varying fastest in memory. The buffer is owned by the caller and mutated
/// in place by the rotation engine, never reallocated.
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: Array3<Complex64>,
    /// Physical voxel edge lengths along x, y, z.
    pub lengths: [f64; 3],
}

impl Volume {
    pub fn new(data: Array3<Complex64>, lengths: [f64; 3]) -> Self {
        Self { data, lengths }
    }

    /// All-zero volume of the given dimensions.
    pub fn zeros(nx: usize, ny: usize, nz: usize, lengths: [f64; 3]) -> Self {
        Self {
            data: Array3::zeros((nx, ny, nz)),
            lengths,
        }
    }

    /// Volume built from real samples, imaginary parts zero.
    pub fn from_real(real: &Array3<f64>, lengths: [f64; 3]) -> Self {
        Self {
            data: real.mapv(|r| Complex64::new(r, 0.0)),
            lengths,
        }
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        let (nx, ny, nz) = self.dims();
        nx == 0 || ny == 0 || nz == 0
    }
}
