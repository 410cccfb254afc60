//! Quadrature rules in the scalar type of the finite element computations.
//!
//! Thin wrappers around [`condensa_quadrature`], which provides the rules in `f64`.
use nalgebra::{convert, Point1, Point2, RealField};

/// Errors returned by quadrature methods.
pub use condensa_quadrature::Error as QuadratureError;

pub type QuadraturePair1d<T> = (Vec<T>, Vec<Point1<T>>);
pub type QuadraturePair2d<T> = (Vec<T>, Vec<Point2<T>>);

/// Gauss-Legendre quadrature with `num_points` points on $[-1, 1]$.
pub fn gauss<T: RealField>(num_points: usize) -> QuadraturePair1d<T> {
    let (weights, points) = condensa_quadrature::univariate::gauss(num_points);
    let weights = weights.into_iter().map(convert).collect();
    let points = points.into_iter().map(Point1::from).map(convert).collect();
    (weights, points)
}

/// A rule on the reference triangle (0, 0), (1, 0), (0, 1), exact for polynomials of total degree
/// at most `strength`.
pub fn triangle<T: RealField>(strength: usize) -> Result<QuadraturePair2d<T>, QuadratureError> {
    let (weights, points) = condensa_quadrature::simplex::triangle(strength)?;
    let weights = weights.into_iter().map(convert).collect();
    let points = points.into_iter().map(Point2::from).map(convert).collect();
    Ok((weights, points))
}
