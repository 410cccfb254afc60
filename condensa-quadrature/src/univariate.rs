//! Quadrature rules for the reference interval `[-1, 1]`.
use crate::Rule1d;
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Evaluates the Legendre polynomial `P_n` and its derivative at `x`, with `|x| < 1`.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    // Bonnet's recursion: (m + 1) P_{m+1} = (2m + 1) x P_m - m P_{m-1}
    let (mut p_prev, mut p) = (0.0, 1.0);
    for m in 0..n {
        let m = m as f64;
        let p_next = ((2.0 * m + 1.0) * x * p - m * p_prev) / (m + 1.0);
        p_prev = p;
        p = p_next;
    }
    let dp = if n == 0 {
        0.0
    } else {
        n as f64 * (x * p - p_prev) / (x * x - 1.0)
    };
    (p, dp)
}

/// Gauss–Legendre quadrature for the reference interval `[-1, 1]`.
///
/// Given `n` points, the rule integrates polynomials of degree up to `2n - 1` exactly.
/// Points are returned in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule1d {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    // Roots are symmetric about the origin, so we only compute the non-negative half
    for i in 0..(n + 1) / 2 {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (p, dp_new) = legendre_with_derivative(n, x);
            dp = dp_new;
            let dx = p / dp;
            x -= dx;
            if dx.abs() <= 1e-15 {
                dp = legendre_with_derivative(n, x).1;
                break;
            }
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        points[i] = [-x];
        weights[i] = w;
        points[n - 1 - i] = [x];
        weights[n - 1 - i] = w;
    }

    (weights, points)
}
