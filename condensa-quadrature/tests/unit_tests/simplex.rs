use condensa_quadrature::simplex::triangle;
use condensa_quadrature::{integrate, Error};

use matrixcompare::assert_scalar_eq;

fn factorial(n: i32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Exact integral of `ξ^a η^b` over the reference triangle.
fn monomial_integral(a: i32, b: i32) -> f64 {
    factorial(a) * factorial(b) / factorial(a + b + 2)
}

#[test]
fn triangle_rules_integrate_monomials_exactly() {
    for strength in 0..=4 {
        let rule = triangle(strength).unwrap();
        for a in 0..=strength as i32 {
            for b in 0..=(strength as i32 - a) {
                let estimated = integrate(&rule, |p| p[0].powi(a) * p[1].powi(b));
                assert_scalar_eq!(estimated, monomial_integral(a, b), comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn triangle_rule_points_lie_inside_reference_triangle() {
    for strength in 0..=4 {
        let (weights, points) = triangle(strength).unwrap();
        assert!(weights.iter().all(|&w| w > 0.0));
        for [x, y] in points {
            assert!(x > 0.0 && y > 0.0 && x + y < 1.0);
        }
    }
}

#[test]
fn triangle_rule_with_too_high_strength_is_unavailable() {
    assert_eq!(triangle(5), Err(Error::NoRuleAvailable));
}
