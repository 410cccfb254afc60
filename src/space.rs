//! Degree-of-freedom maps for the function spaces of the mixed elasticity formulation.
use crate::element::{LagrangeP1, LagrangeP2};
use crate::mesh::{MeshTopology, TriangleMesh2d};
use crate::Real;
use nalgebra::{Point2, Scalar};

/// A finite element space described by its global degrees of freedom per cell.
pub trait FiniteElementSpace {
    fn num_dofs(&self) -> usize;

    fn num_cells(&self) -> usize;

    /// Number of degrees of freedom on each cell.
    fn local_dim(&self) -> usize;

    /// Writes the global indices of the degrees of freedom of the given cell, in local order.
    ///
    /// # Panics
    ///
    /// Panics if `dofs` does not have length [`local_dim`](Self::local_dim).
    fn populate_cell_dofs(&self, cell_index: usize, dofs: &mut [usize]);
}

impl<S: FiniteElementSpace + ?Sized> FiniteElementSpace for &S {
    fn num_dofs(&self) -> usize {
        S::num_dofs(self)
    }

    fn num_cells(&self) -> usize {
        S::num_cells(self)
    }

    fn local_dim(&self) -> usize {
        S::local_dim(self)
    }

    fn populate_cell_dofs(&self, cell_index: usize, dofs: &mut [usize]) {
        S::populate_cell_dofs(self, cell_index, dofs)
    }
}

/// Continuous piecewise quadratic vector fields with two components.
///
/// Nodes are the mesh vertices followed by one node per facet, and the degrees of freedom are
/// interleaved: component `c` of node `n` has index `2 * n + c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorP2Space {
    num_vertices: usize,
    cell_nodes: Vec<[usize; 6]>,
    facet_nodes: Vec<[usize; 3]>,
}

impl VectorP2Space {
    pub const SOLUTION_DIM: usize = 2;

    pub fn new<T: Scalar>(mesh: &TriangleMesh2d<T>, topology: &MeshTopology) -> Self {
        let num_vertices = mesh.num_vertices();
        let cell_nodes = mesh
            .cells()
            .iter()
            .zip(topology.cell_facets())
            .map(|(cell, facets)| {
                [
                    cell[0],
                    cell[1],
                    cell[2],
                    num_vertices + facets[0],
                    num_vertices + facets[1],
                    num_vertices + facets[2],
                ]
            })
            .collect();
        let facet_nodes = topology
            .facets()
            .iter()
            .enumerate()
            .map(|(f, [a, b])| [*a, *b, num_vertices + f])
            .collect();
        Self {
            num_vertices,
            cell_nodes,
            facet_nodes,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_vertices + self.facet_nodes.len()
    }

    /// Global nodes of a cell, ordered as in [`LagrangeP2`].
    pub fn cell_nodes(&self, cell_index: usize) -> &[usize; 6] {
        &self.cell_nodes[cell_index]
    }

    /// Global nodes of a facet: its two vertices followed by its midpoint node.
    pub fn facet_nodes(&self, facet_index: usize) -> &[usize; 3] {
        &self.facet_nodes[facet_index]
    }

    /// Physical coordinates of every node.
    pub fn node_coordinates<T: Real>(&self, mesh: &TriangleMesh2d<T>) -> Vec<Point2<T>> {
        let half = T::one() / (T::one() + T::one());
        let mut coords = mesh.vertices().to_vec();
        coords.extend(self.facet_nodes.iter().map(|&[a, b, _]| {
            let (x_a, x_b) = (mesh.vertices()[a], mesh.vertices()[b]);
            Point2::from((x_a.coords + x_b.coords) * half)
        }));
        coords
    }
}

impl FiniteElementSpace for VectorP2Space {
    fn num_dofs(&self) -> usize {
        Self::SOLUTION_DIM * self.num_nodes()
    }

    fn num_cells(&self) -> usize {
        self.cell_nodes.len()
    }

    fn local_dim(&self) -> usize {
        Self::SOLUTION_DIM * LagrangeP2::NUM_NODES
    }

    fn populate_cell_dofs(&self, cell_index: usize, dofs: &mut [usize]) {
        assert_eq!(dofs.len(), self.local_dim(), "Dof buffer has wrong length");
        for (local_node, &node) in self.cell_nodes[cell_index].iter().enumerate() {
            for c in 0..Self::SOLUTION_DIM {
                dofs[Self::SOLUTION_DIM * local_node + c] = Self::SOLUTION_DIM * node + c;
            }
        }
    }
}

/// Discontinuous piecewise linear symmetric tensor fields in two dimensions.
///
/// Each cell has its own three nodes (the cell vertices) with the three independent tensor
/// components `xx`, `yy` and `xy`, so the degree of freedom for component `c` of local node `n` on
/// cell `k` is `9 * k + 3 * n + c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricTensorDg1Space {
    num_cells: usize,
}

impl SymmetricTensorDg1Space {
    pub const NUM_COMPONENTS: usize = 3;

    pub fn new<T: Scalar>(mesh: &TriangleMesh2d<T>) -> Self {
        Self {
            num_cells: mesh.num_cells(),
        }
    }
}

impl FiniteElementSpace for SymmetricTensorDg1Space {
    fn num_dofs(&self) -> usize {
        self.num_cells * self.local_dim()
    }

    fn num_cells(&self) -> usize {
        self.num_cells
    }

    fn local_dim(&self) -> usize {
        Self::NUM_COMPONENTS * LagrangeP1::NUM_NODES
    }

    fn populate_cell_dofs(&self, cell_index: usize, dofs: &mut [usize]) {
        let n = self.local_dim();
        assert_eq!(dofs.len(), n, "Dof buffer has wrong length");
        for (i, dof) in dofs.iter_mut().enumerate() {
            *dof = n * cell_index + i;
        }
    }
}
