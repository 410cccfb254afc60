use condensa_solid::materials::{LameParameters, PlaneStressMaterial, YoungPoisson};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{matrix, Matrix2, Vector2};
use proptest::prelude::*;

#[test]
fn lame_from_young_poisson() {
    let young_poisson = YoungPoisson {
        young: 1e3,
        poisson: 0.3,
    };
    let lame = LameParameters::from(young_poisson);

    assert_scalar_eq!(lame.mu, 384.6153846153846, comp = float);
    assert_scalar_eq!(lame.lambda, 576.9230769230769, comp = float);
}

#[test]
fn plane_stress_lame_parameters() {
    let material = PlaneStressMaterial::new(1.0, 1.0 / 3.0);
    let lame = material.lame_parameters();
    assert_scalar_eq!(lame.mu, 0.375, comp = abs, tol = 1e-15);
    assert_scalar_eq!(lame.lambda, 0.375, comp = abs, tol = 1e-15);
}

#[test]
fn plane_stress_uniaxial_strain() {
    let material = PlaneStressMaterial::new(2.0, 0.25);
    let strain = matrix![1.0, 0.0;
                         0.0, 0.0];
    let sigma = material.stress(&strain);
    // E / (1 - nu^2) * [1, nu]
    let scale = 2.0 / (1.0 - 0.0625);
    let expected = matrix![scale, 0.0;
                           0.0, scale * 0.25];
    assert_matrix_eq!(sigma, expected, comp = abs, tol = 1e-14);
}

#[test]
fn stress_ignores_skew_part_of_displacement_gradient() {
    let material = PlaneStressMaterial::new(1.0, 0.3);
    let rotation = matrix![0.0, -1.0;
                           1.0, 0.0];
    assert_matrix_eq!(
        material.stress_from_displacement_gradient(&rotation),
        Matrix2::zeros(),
        comp = abs,
        tol = 1e-15
    );
}

#[test]
#[should_panic]
fn invalid_poisson_ratio_panics() {
    PlaneStressMaterial::new(1.0, 1.0);
}

proptest! {
    #[test]
    fn stress_contraction_matches_stress_of_rank_one_gradient(
        a in prop::array::uniform2(-5.0f64..5.0),
        b in prop::array::uniform2(-5.0f64..5.0),
        young in 0.1f64..10.0,
        poisson in -0.9f64..0.49,
    ) {
        let material = PlaneStressMaterial::new(young, poisson);
        let a = Vector2::from(a);
        let b = Vector2::from(b);
        let contraction = material.stress_contraction(&a, &b);

        for l in 0..2 {
            for m in 0..2 {
                // grad u = e_m ⊗ b, grad v = e_l ⊗ a
                let grad_u = Vector2::ith(m, 1.0) * b.transpose();
                let grad_v = Vector2::ith(l, 1.0) * a.transpose();
                let expected = material.stress_from_displacement_gradient(&grad_u).dot(&grad_v);
                prop_assert!((contraction[(l, m)] - expected).abs() <= 1e-10 * (1.0 + expected.abs()));
            }
        }
    }
}
