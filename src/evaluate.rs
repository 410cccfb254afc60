//! Point evaluation of finite element functions.
use crate::element::LagrangeP2;
use crate::mesh::TriangleMesh2d;
use crate::space::VectorP2Space;
use crate::Real;
use nalgebra::{DVectorView, Point2, Vector2};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

/// Relative tolerance used for bounding boxes and barycentric containment tests.
const CONTAINMENT_TOLERANCE: f64 = 1e-10;

/// Evaluates functions in a [`VectorP2Space`] at arbitrary physical points.
///
/// Cells are located with an R-tree over their bounding boxes, after which the cell containing
/// the point is identified through its barycentric coordinates.
pub struct FunctionEvaluator<'a, T: Real> {
    mesh: &'a TriangleMesh2d<T>,
    space: &'a VectorP2Space,
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
}

fn to_f64<T: Real>(x: T) -> f64 {
    x.to_subset().unwrap_or(f64::NAN)
}

impl<'a, T: Real> FunctionEvaluator<'a, T> {
    pub fn new(mesh: &'a TriangleMesh2d<T>, space: &'a VectorP2Space) -> Self {
        let geometries = (0..mesh.num_cells())
            .map(|cell_index| {
                let (min, max) = mesh.cell_triangle(cell_index).bounding_box();
                let (min, max) = (min.map(to_f64), max.map(to_f64));
                // Enlarge boxes slightly to accommodate floating point errors
                let margin = CONTAINMENT_TOLERANCE * (1.0 + (max - min).amax());
                let corner_min = [min.x - margin, min.y - margin];
                let corner_max = [max.x + margin, max.y + margin];
                GeomWithData::new(Rectangle::from_corners(corner_min, corner_max), cell_index)
            })
            .collect();
        Self {
            mesh,
            space,
            tree: RTree::bulk_load(geometries),
        }
    }

    /// Finds the first cell (lowest index) containing the point, if any.
    pub fn find_cell(&self, x: &Point2<T>) -> Option<usize> {
        let tolerance = T::from_f64(CONTAINMENT_TOLERANCE).expect("Tolerance must fit in T");
        self.tree
            .locate_all_at_point(&[to_f64(x.x), to_f64(x.y)])
            .map(|geom| geom.data)
            .filter(|&cell_index| {
                self.mesh
                    .cell_triangle(cell_index)
                    .contains_point(x, tolerance)
            })
            .min()
    }

    /// Evaluates the function with the given global coefficients at a physical point.
    ///
    /// Returns `None` if the point lies outside the mesh.
    ///
    /// # Panics
    ///
    /// Panics if the number of coefficients does not match the number of dofs in the space.
    pub fn evaluate<'b>(&self, coefficients: impl Into<DVectorView<'b, T>>, x: &Point2<T>) -> Option<Vector2<T>> {
        let coefficients = coefficients.into();
        assert_eq!(
            coefficients.len(),
            2 * self.space.num_nodes(),
            "Coefficient vector must have one entry per dof"
        );
        let cell_index = self.find_cell(x)?;
        let xi = self
            .mesh
            .cell_triangle(cell_index)
            .map_physical_coords(x)?;
        let phi = LagrangeP2.evaluate_basis(&xi);

        let mut value = Vector2::zeros();
        for (k, &node) in self.space.cell_nodes(cell_index).iter().enumerate() {
            let u_node = Vector2::new(coefficients[2 * node], coefficients[2 * node + 1]);
            value += u_node * phi[k];
        }
        Some(value)
    }
}
