use condensa::cook::{solve_cook_membrane, CookMembraneConfig, TIP_POINT};
use condensa::sparse::frobenius_norm;
use nalgebra::Point2;

/// Reference vertical tip displacement of Cook's membrane for E = 1, nu = 1/3 and a unit total
/// shear load on the free end.
const REFERENCE_TIP_DISPLACEMENT: f64 = 23.95;

#[test]
fn cook_membrane_tip_displacement() {
    let solution = solve_cook_membrane(&CookMembraneConfig::default()).unwrap();
    let tip = solution.tip_displacement().unwrap();
    let relative_error = (tip.y - REFERENCE_TIP_DISPLACEMENT).abs() / REFERENCE_TIP_DISPLACEMENT;
    assert!(
        relative_error < 0.01,
        "tip displacement {} deviates from reference {} by {:.3}%",
        tip.y,
        REFERENCE_TIP_DISPLACEMENT,
        100.0 * relative_error
    );
    assert!(solution.cg_iterations > 0);
}

#[test]
fn condensed_matrix_equals_displacement_matrix() {
    let solution = solve_cook_membrane(&CookMembraneConfig::default()).unwrap();
    let norm = frobenius_norm(&solution.displacement_matrix);
    assert!(norm > 0.0);
    assert!(
        solution.matrix_difference_norm() <= 1e-10 * norm,
        "difference {} exceeds tolerance for matrix norm {}",
        solution.matrix_difference_norm(),
        norm
    );
}

#[test]
fn coarse_cook_membrane_is_stiffer() {
    let coarse = solve_cook_membrane(&CookMembraneConfig {
        cells_per_side: 2,
        ..Default::default()
    })
    .unwrap();
    assert!(coarse.matrix_difference_norm() <= 1e-10 * frobenius_norm(&coarse.displacement_matrix));

    // Conforming displacement discretizations approach the tip displacement from below
    let tip = coarse.tip_displacement().unwrap();
    assert!(tip.y > 0.0);
    assert!(tip.y < REFERENCE_TIP_DISPLACEMENT);
}

#[test]
fn clamped_end_does_not_move() {
    let solution = solve_cook_membrane(&CookMembraneConfig {
        cells_per_side: 4,
        ..Default::default()
    })
    .unwrap();
    for y in [0.0, 11.0, 22.0, 33.0, 44.0] {
        let u = solution.displacement_at(&Point2::new(0.0, y)).unwrap();
        assert!(u.norm() < 1e-12);
    }
}

#[test]
fn displacement_scales_linearly_with_load() {
    let base = CookMembraneConfig {
        cells_per_side: 4,
        ..Default::default()
    };
    let doubled = CookMembraneConfig {
        traction: [2.0 * base.traction[0], 2.0 * base.traction[1]],
        ..base.clone()
    };
    let u1 = solve_cook_membrane(&base).unwrap().tip_displacement().unwrap();
    let u2 = solve_cook_membrane(&doubled).unwrap().tip_displacement().unwrap();
    assert!((u2 - 2.0 * u1).norm() <= 1e-6 * u2.norm());
}

#[test]
fn tip_point_lies_on_the_mesh() {
    let solution = solve_cook_membrane(&CookMembraneConfig {
        cells_per_side: 2,
        ..Default::default()
    })
    .unwrap();
    assert!(solution
        .evaluator()
        .find_cell(&Point2::from(TIP_POINT))
        .is_some());
    assert!(solution.displacement_at(&Point2::new(60.0, 52.0)).is_none());
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = CookMembraneConfig {
        young: -1.0,
        ..Default::default()
    };
    assert!(solve_cook_membrane(&config).is_err());
}
