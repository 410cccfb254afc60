//! Reference elements and the affine triangle geometry.
//!
//! The reference triangle is spanned by the corners (0, 0), (1, 0), (0, 1), with barycentric
//! coordinates $\lambda_0 = 1 - \xi - \eta$, $\lambda_1 = \xi$, $\lambda_2 = \eta$. This matches
//! the reference domain of [`crate::quadrature::triangle`].
use crate::Real;
use nalgebra::{Matrix2, Matrix2x3, Matrix2x6, Point2, Scalar, Vector2, Vector3, Vector6};
use numeric_literals::replace_float_literals;

/// A triangle in two dimensions, mapped affinely from the reference triangle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AffineTriangle<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> AffineTriangle<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> AffineTriangle<T>
where
    T: Real,
{
    /// The Jacobian $J = [v_1 - v_0, v_2 - v_0]$ of the reference-to-physical map.
    pub fn jacobian(&self) -> Matrix2<T> {
        let [v0, v1, v2] = &self.vertices;
        Matrix2::from_columns(&[v1 - v0, v2 - v0])
    }

    /// The signed determinant of the Jacobian, positive for counter-clockwise triangles.
    pub fn determinant(&self) -> T {
        self.jacobian().determinant()
    }

    /// The inverse transpose $J^{-T}$, mapping reference gradients to physical gradients.
    ///
    /// Returns `None` if the triangle is degenerate.
    pub fn inverse_transpose(&self) -> Option<Matrix2<T>> {
        self.jacobian()
            .try_inverse()
            .map(|j_inv| j_inv.transpose())
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn area(&self) -> T {
        0.5 * self.determinant().abs()
    }

    pub fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        self.vertices[0] + self.jacobian() * xi.coords
    }

    /// Maps a physical point back to reference coordinates.
    pub fn map_physical_coords(&self, x: &Point2<T>) -> Option<Point2<T>> {
        let j_inv = self.jacobian().try_inverse()?;
        Some(Point2::from(j_inv * (x - self.vertices[0])))
    }

    /// Barycentric coordinates $(\lambda_0, \lambda_1, \lambda_2)$ of a physical point.
    pub fn barycentric_coordinates(&self, x: &Point2<T>) -> Option<Vector3<T>> {
        let xi = self.map_physical_coords(x)?;
        Some(Vector3::new(T::one() - xi.x - xi.y, xi.x, xi.y))
    }

    /// Tests whether the point lies inside the triangle, allowing each barycentric coordinate to be
    /// negative by at most `tolerance`.
    pub fn contains_point(&self, x: &Point2<T>, tolerance: T) -> bool {
        self.barycentric_coordinates(x)
            .map(|lambda| lambda.iter().all(|&lambda_i| lambda_i >= -tolerance))
            .unwrap_or(false)
    }

    pub fn centroid(&self) -> Point2<T> {
        let [v0, v1, v2] = &self.vertices;
        let third = T::one() / (T::one() + T::one() + T::one());
        Point2::from((v0.coords + v1.coords + v2.coords) * third)
    }

    /// The axis-aligned bounding box as `(min, max)` corners.
    pub fn bounding_box(&self) -> (Point2<T>, Point2<T>) {
        let [v0, v1, v2] = &self.vertices;
        let min = v0.coords.inf(&v1.coords).inf(&v2.coords);
        let max = v0.coords.sup(&v1.coords).sup(&v2.coords);
        (Point2::from(min), Point2::from(max))
    }
}

/// Linear Lagrange basis on the reference triangle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LagrangeP1;

impl LagrangeP1 {
    pub const NUM_NODES: usize = 3;

    pub fn evaluate_basis<T: Real>(&self, xi: &Point2<T>) -> Vector3<T> {
        Vector3::new(T::one() - xi.x - xi.y, xi.x, xi.y)
    }

    #[rustfmt::skip]
    pub fn gradients<T: Real>(&self, _xi: &Point2<T>) -> Matrix2x3<T> {
        let (zero, one) = (T::zero(), T::one());
        Matrix2x3::new(-one, one, zero,
                       -one, zero, one)
    }
}

/// Quadratic Lagrange basis on the reference triangle.
///
/// Nodes are ordered as the three vertices followed by the midpoints of the edges
/// (0, 1), (1, 2) and (2, 0).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LagrangeP2;

impl LagrangeP2 {
    pub const NUM_NODES: usize = 6;

    /// Local vertex pairs spanning the edges that carry the midpoint nodes 3, 4 and 5.
    pub const EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis<T: Real>(&self, xi: &Point2<T>) -> Vector6<T> {
        let l = barycentric(xi);
        Vector6::new(
            l[0] * (2.0 * l[0] - 1.0),
            l[1] * (2.0 * l[1] - 1.0),
            l[2] * (2.0 * l[2] - 1.0),
            4.0 * l[0] * l[1],
            4.0 * l[1] * l[2],
            4.0 * l[2] * l[0],
        )
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients<T: Real>(&self, xi: &Point2<T>) -> Matrix2x6<T> {
        let l = barycentric(xi);
        let grad_l = LagrangeP1.gradients(xi);
        let g = |i: usize| -> Vector2<T> { grad_l.column(i).into_owned() };
        Matrix2x6::from_columns(&[
            g(0) * (4.0 * l[0] - 1.0),
            g(1) * (4.0 * l[1] - 1.0),
            g(2) * (4.0 * l[2] - 1.0),
            (g(0) * l[1] + g(1) * l[0]) * 4.0,
            (g(1) * l[2] + g(2) * l[1]) * 4.0,
            (g(2) * l[0] + g(0) * l[2]) * 4.0,
        ])
    }

    /// Reference coordinates of the nodes.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn nodes<T: Real>(&self) -> [Point2<T>; 6] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.0),
            Point2::new(0.5, 0.5),
            Point2::new(0.0, 0.5),
        ]
    }
}

/// Quadratic Lagrange basis on the reference segment $[-1, 1]$.
///
/// Nodes are ordered as the endpoints $-1$ and $1$ followed by the midpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LagrangeP2Segment;

impl LagrangeP2Segment {
    pub const NUM_NODES: usize = 3;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis<T: Real>(&self, t: T) -> Vector3<T> {
        Vector3::new(0.5 * t * (t - 1.0), 0.5 * t * (t + 1.0), 1.0 - t * t)
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients<T: Real>(&self, t: T) -> Vector3<T> {
        Vector3::new(t - 0.5, t + 0.5, -2.0 * t)
    }
}

fn barycentric<T: Real>(xi: &Point2<T>) -> [T; 3] {
    [T::one() - xi.x - xi.y, xi.x, xi.y]
}
