use condensa::quadrature::{gauss, triangle, QuadratureError};
use matrixcompare::assert_scalar_eq;

#[test]
fn triangle_rule_integrates_quadratics_exactly() {
    let (weights, points) = triangle::<f64>(2).unwrap();
    assert_eq!(weights.len(), points.len());
    let area: f64 = weights.iter().sum();
    assert_scalar_eq!(area, 0.5, comp = abs, tol = 1e-14);

    // Integrals of x^2 and x * y over the reference triangle
    let x2: f64 = weights.iter().zip(&points).map(|(w, p)| w * p.x * p.x).sum();
    let xy: f64 = weights.iter().zip(&points).map(|(w, p)| w * p.x * p.y).sum();
    assert_scalar_eq!(x2, 1.0 / 12.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(xy, 1.0 / 24.0, comp = abs, tol = 1e-14);
}

#[test]
fn triangle_rule_in_single_precision() {
    let (weights, _) = triangle::<f32>(2).unwrap();
    let area: f32 = weights.iter().sum();
    assert!((area - 0.5).abs() < 1e-6);
}

#[test]
fn unavailable_triangle_rule_is_an_error() {
    assert_eq!(triangle::<f64>(1000).unwrap_err(), QuadratureError::NoRuleAvailable);
}

#[test]
fn gauss_rule_integrates_quintics_exactly() {
    let (weights, points) = gauss::<f64>(3);
    assert_eq!(weights.len(), 3);
    let integral: f64 = weights.iter().zip(&points).map(|(w, p)| w * p.x.powi(4)).sum();
    assert_scalar_eq!(integral, 2.0 / 5.0, comp = abs, tol = 1e-14);
}
