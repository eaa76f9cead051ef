//! Volume-level tests of the Fourier-shear rotation engine.

use ndarray::Array3;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fourier_shear::{
    Direction, FourierRotator, Quaternion, QualityMeasure, RotateConfig, RotateError, ShearMode,
    Shift, Volume,
};

const N: usize = 8;
const UNIT: [f64; 3] = [1.0, 1.0, 1.0];

fn rotator(mode: ShearMode) -> FourierRotator {
    FourierRotator::new(
        N,
        N,
        N,
        RotateConfig {
            mode,
            measure: QualityMeasure::Cox,
            verbose: false,
        },
    )
}

fn random_volume(seed: u64) -> Volume {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = Array3::from_shape_fn((N, N, N), |_| {
        Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    });
    Volume::new(data, UNIT)
}

fn random_real_volume(seed: u64) -> Volume {
    let mut rng = StdRng::seed_from_u64(seed);
    let data =
        Array3::from_shape_fn((N, N, N), |_| Complex64::new(rng.gen_range(-1.0..1.0), 0.0));
    Volume::new(data, UNIT)
}

fn max_diff(a: &Volume, b: &Volume) -> f64 {
    a.data
        .iter()
        .zip(b.data.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

#[test]
fn test_identity_rotation_zero_shift_is_bit_identical() {
    let mut rot = rotator(ShearMode::Four);
    let orig = random_volume(3);
    let mut moved = Volume::zeros(N, N, N, UNIT);
    rot.rotate_into(
        &Quaternion::identity(),
        Shift::zero(),
        &orig,
        &mut moved,
        false,
    )
    .unwrap();
    // every shear pass short-circuits, so not even FFT roundoff appears
    assert_eq!(orig.data, moved.data);
}

#[test]
fn test_integer_x_shift_wraps_circularly() {
    let mut rot = rotator(ShearMode::Four);
    let orig = random_volume(4);
    let mut moved = Volume::zeros(N, N, N, UNIT);
    rot.rotate_into(
        &Quaternion::identity(),
        Shift::new(2.0, 0.0, 0.0),
        &orig,
        &mut moved,
        false,
    )
    .unwrap();
    // content moves toward +x; sample i comes from i - 2 with wraparound
    for ((i, j, k), v) in moved.data.indexed_iter() {
        let expect = orig.data[[(i + N - 2) % N, j, k]];
        assert!((v - expect).norm() < 1e-10, "mismatch at ({i},{j},{k})");
    }
}

#[test]
fn test_integer_y_shift_runs_against_the_data_index() {
    // the data y index runs opposite to the geometric y axis, so a +3
    // geometric shift moves samples toward lower j
    let mut rot = rotator(ShearMode::Four);
    let orig = random_volume(5);
    let mut moved = Volume::zeros(N, N, N, UNIT);
    rot.rotate_into(
        &Quaternion::identity(),
        Shift::new(0.0, 3.0, 0.0),
        &orig,
        &mut moved,
        false,
    )
    .unwrap();
    for ((i, j, k), v) in moved.data.indexed_iter() {
        let expect = orig.data[[i, (j + 3) % N, k]];
        assert!((v - expect).norm() < 1e-10, "mismatch at ({i},{j},{k})");
    }
}

#[test]
fn test_round_trip_four_shear() {
    let mut rot = rotator(ShearMode::Four);
    for (seed, axis, theta) in [
        (6, [0.48, 0.6, 0.64], 0.5),
        (7, [0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2),
        (8, [0.6, 0.48, 0.64], 170.0_f64.to_radians()),
        (9, [1.0, 0.0, 0.0], -0.02),
    ] {
        let q = Quaternion::from_axis_angle(axis, theta);
        let orig = random_volume(seed);
        let mut vol = orig.clone();
        rot.rotate_in_place(&q, Shift::zero(), &mut vol, false).unwrap();
        rot.rotate_in_place(&q.conjugate(), Shift::zero(), &mut vol, false)
            .unwrap();
        let err = max_diff(&vol, &orig);
        assert!(err < 1e-10, "round trip error {} for theta {}", err, theta);
    }
}

#[test]
fn test_round_trip_seven_shear() {
    let mut rot = rotator(ShearMode::Seven);
    let q = Quaternion::from_axis_angle([0.48, 0.6, 0.64], 0.8);
    let orig = random_volume(9);
    let mut vol = orig.clone();
    rot.rotate_in_place(&q, Shift::zero(), &mut vol, false).unwrap();
    rot.rotate_in_place(&q.conjugate(), Shift::zero(), &mut vol, false)
        .unwrap();
    assert!(max_diff(&vol, &orig) < 1e-10);
}

#[test]
fn test_round_trip_thirteen_shear() {
    let mut rot = rotator(ShearMode::Thirteen);
    let q = Quaternion::from_axis_angle(
        [0.267261241912424, 0.534522483824849, 0.801783725737273],
        0.35,
    );
    let orig = random_volume(10);
    let mut vol = orig.clone();
    rot.rotate_in_place(&q, Shift::zero(), &mut vol, false).unwrap();
    rot.rotate_in_place(&q.conjugate(), Shift::zero(), &mut vol, false)
        .unwrap();
    // the five-angle extraction converges to ~1e-9 in angle, not to
    // machine precision
    assert!(max_diff(&vol, &orig) < 1e-4);
}

#[test]
fn test_real_input_stays_real() {
    let mut rot = rotator(ShearMode::Four);
    let mut vol = random_real_volume(13);
    let q = Quaternion::from_axis_angle([0.6, 0.48, 0.64], 0.4);
    rot.rotate_in_place(&q, Shift::new(0.5, 0.0, -0.25), &mut vol, true)
        .unwrap();
    let max_imag = vol.data.iter().map(|v| v.im.abs()).fold(0.0, f64::max);
    assert!(max_imag < 1e-10, "imaginary leakage {}", max_imag);
}

#[test]
fn test_singular_rotation_repairs_or_reports() {
    // ~180 degrees about z: every elementary decomposition is singular, so
    // the engine must go through the repair path; NaNs must never appear
    let mut rot = rotator(ShearMode::Four);
    let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::PI - 0.001);
    let orig = random_volume(11);
    let mut vol = orig.clone();
    match rot.rotate_in_place(&q, Shift::zero(), &mut vol, false) {
        Ok(()) => {
            for v in vol.data.iter() {
                assert!(v.re.is_finite() && v.im.is_finite());
            }
        }
        Err(RotateError::SingularDecomposition(_)) | Err(RotateError::RepairExhausted { .. }) => {}
        Err(other) => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_thirteen_shear_rejects_translation() {
    let mut rot = rotator(ShearMode::Thirteen);
    let q = Quaternion::from_axis_angle([0.6, 0.48, 0.64], 0.3);
    let mut vol = random_volume(12);
    let err = rot
        .rotate_in_place(&q, Shift::new(1.0, 0.0, 0.0), &mut vol, false)
        .unwrap_err();
    assert!(matches!(err, RotateError::UnsupportedMode(_)));
}

#[test]
fn test_thirteen_shear_large_angle_fails_to_converge() {
    let mut rot = rotator(ShearMode::Thirteen);
    let q = Quaternion::from_axis_angle([0.6, 0.48, 0.64], 2.5);
    let mut vol = random_volume(14);
    let err = rot
        .rotate_in_place(&q, Shift::zero(), &mut vol, false)
        .unwrap_err();
    assert!(matches!(err, RotateError::ConvergenceFailure { .. }));
}

#[test]
fn test_set_shift_phases_matches_shift_only() {
    let mut rot = rotator(ShearMode::Four);
    let shift = Shift::new(1.5, -2.0, 0.5);

    let mut via_kspace = random_volume(15);
    let mut via_shears = via_kspace.clone();

    let mut ws = fourier_shear::FftWorkspace::new(N, N, N);
    for axis in [
        fourier_shear::Axis3::X,
        fourier_shear::Axis3::Y,
        fourier_shear::Axis3::Z,
    ] {
        ws.transform(&mut via_kspace.data, axis, Direction::Forward);
    }
    rot.set_shift_phases(shift, &mut via_kspace, Direction::Inverse, false);
    for axis in [
        fourier_shear::Axis3::X,
        fourier_shear::Axis3::Y,
        fourier_shear::Axis3::Z,
    ] {
        ws.transform(&mut via_kspace.data, axis, Direction::Inverse);
    }

    rot.rotate_in_place(&Quaternion::identity(), shift, &mut via_shears, false)
        .unwrap();

    assert!(max_diff(&via_kspace, &via_shears) < 1e-10);
    assert_eq!(rot.counts().phase_sets, 1);
}

#[test]
fn test_shear_counts_track_passes() {
    let mut rot = rotator(ShearMode::Four);
    let mut vol = random_volume(16);

    rot.rotate_in_place(&Quaternion::identity(), Shift::zero(), &mut vol, false)
        .unwrap();
    let counts = rot.counts();
    assert_eq!(counts.calls, 1);
    assert_eq!(counts.total_shears(), 0);

    let q = Quaternion::from_axis_angle([0.48, 0.6, 0.64], 0.5);
    rot.rotate_in_place(&q, Shift::zero(), &mut vol, false).unwrap();
    let counts = rot.counts();
    assert_eq!(counts.calls, 2);
    assert!(counts.total_shears() >= 3);

    rot.reset_counts();
    assert_eq!(rot.counts(), Default::default());
}

#[test]
fn test_dimension_mismatch_is_degenerate_input() {
    let mut rot = rotator(ShearMode::Four);
    let orig = Volume::zeros(4, 4, 4, UNIT);
    let mut moved = Volume::zeros(4, 4, 4, UNIT);
    let err = rot
        .rotate_into(
            &Quaternion::identity(),
            Shift::zero(),
            &orig,
            &mut moved,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, RotateError::DegenerateInput(_)));

    let mut empty = Volume::zeros(0, 0, 0, UNIT);
    let err = rot
        .rotate_in_place(&Quaternion::identity(), Shift::zero(), &mut empty, false)
        .unwrap_err();
    assert!(matches!(err, RotateError::DegenerateInput(_)));
}

#[test]
fn test_anisotropic_voxels_round_trip() {
    let mut rot = rotator(ShearMode::Four);
    let mut rng = StdRng::seed_from_u64(17);
    let data = Array3::from_shape_fn((N, N, N), |_| {
        Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    });
    let orig = Volume::new(data, [3.0, 3.0, 5.0]);
    let q = Quaternion::from_axis_angle([0.0, 0.6, 0.8], 0.45);
    let mut vol = orig.clone();
    rot.rotate_in_place(&q, Shift::zero(), &mut vol, false).unwrap();
    rot.rotate_in_place(&q.conjugate(), Shift::zero(), &mut vol, false)
        .unwrap();
    assert!(max_diff(&vol, &orig) < 1e-10);
}
