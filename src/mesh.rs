use crate::element::AffineTriangle;
use crate::Real;
use nalgebra::{Point2, Scalar};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod procedural;
pub mod subdomain;

pub use subdomain::{locate_entities, EntityMarkers, MeshTags, SubDomain};

/// Topological dimension of mesh entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityDim {
    Vertex,
    Facet,
    Cell,
}

impl EntityDim {
    pub fn from_dim(dim: usize) -> Option<Self> {
        match dim {
            0 => Some(Self::Vertex),
            1 => Some(Self::Facet),
            2 => Some(Self::Cell),
            _ => None,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Facet => 1,
            Self::Cell => 2,
        }
    }
}

impl fmt::Display for EntityDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Facet => write!(f, "facet"),
            Self::Cell => write!(f, "cell"),
        }
    }
}

/// Index-based triangle mesh in two dimensions.
///
/// Cells reference vertices by index and are expected to be oriented counter-clockwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct TriangleMesh2d<T: Scalar> {
    vertices: Vec<Point2<T>>,
    cells: Vec<[usize; 3]>,
}

impl<T: Scalar> TriangleMesh2d<T> {
    /// Construct a mesh from vertices and cells.
    ///
    /// # Panics
    ///
    /// Panics if a cell references a vertex index out of bounds.
    pub fn from_vertices_and_cells(vertices: Vec<Point2<T>>, cells: Vec<[usize; 3]>) -> Self {
        let num_vertices = vertices.len();
        assert!(
            cells.iter().flatten().all(|&v| v < num_vertices),
            "Cell references vertex out of bounds"
        );
        Self { vertices, cells }
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn cells(&self) -> &[[usize; 3]] {
        &self.cells
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

impl<T: Real> TriangleMesh2d<T> {
    pub fn cell_vertices(&self, cell_index: usize) -> [Point2<T>; 3] {
        self.cells[cell_index].map(|v| self.vertices[v])
    }

    pub fn cell_triangle(&self, cell_index: usize) -> AffineTriangle<T> {
        AffineTriangle::from_vertices(self.cell_vertices(cell_index))
    }

    /// Total area of all cells.
    pub fn area(&self) -> T {
        (0..self.num_cells())
            .map(|i| self.cell_triangle(i).area())
            .fold(T::zero(), |a, b| a + b)
    }
}

/// Facet (edge) connectivity derived from a triangle mesh.
///
/// Local facet `k` of a cell connects its local vertices `k` and `(k + 1) % 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTopology {
    num_vertices: usize,
    facets: Vec<[usize; 2]>,
    cell_facets: Vec<[usize; 3]>,
    facet_cells: Vec<Vec<usize>>,
    boundary_vertex: Vec<bool>,
}

impl MeshTopology {
    pub fn from_mesh<T: Scalar>(mesh: &TriangleMesh2d<T>) -> Self {
        let mut facet_indices = FxHashMap::default();
        let mut facets = Vec::new();
        let mut facet_cells: Vec<Vec<usize>> = Vec::new();
        let mut cell_facets = Vec::with_capacity(mesh.num_cells());

        for (cell_index, cell) in mesh.cells().iter().enumerate() {
            let mut local_facets = [usize::MAX; 3];
            for (k, local_facet) in local_facets.iter_mut().enumerate() {
                let (a, b) = (cell[k], cell[(k + 1) % 3]);
                let key = [a.min(b), a.max(b)];
                let facet_index = *facet_indices.entry(key).or_insert_with(|| {
                    facets.push(key);
                    facet_cells.push(Vec::new());
                    facets.len() - 1
                });
                facet_cells[facet_index].push(cell_index);
                *local_facet = facet_index;
            }
            cell_facets.push(local_facets);
        }

        let mut boundary_vertex = vec![false; mesh.num_vertices()];
        for (facet, cells) in facets.iter().zip(&facet_cells) {
            if cells.len() == 1 {
                for &v in facet {
                    boundary_vertex[v] = true;
                }
            }
        }

        Self {
            num_vertices: mesh.num_vertices(),
            facets,
            cell_facets,
            facet_cells,
            boundary_vertex,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cell_facets.len()
    }

    pub fn num_entities(&self, dim: EntityDim) -> usize {
        match dim {
            EntityDim::Vertex => self.num_vertices(),
            EntityDim::Facet => self.num_facets(),
            EntityDim::Cell => self.num_cells(),
        }
    }

    /// Vertex indices of each facet, sorted in ascending order.
    pub fn facets(&self) -> &[[usize; 2]] {
        &self.facets
    }

    pub fn cell_facets(&self) -> &[[usize; 3]] {
        &self.cell_facets
    }

    pub fn facet_cells(&self, facet_index: usize) -> &[usize] {
        &self.facet_cells[facet_index]
    }

    pub fn is_boundary_facet(&self, facet_index: usize) -> bool {
        self.facet_cells[facet_index].len() == 1
    }

    pub fn is_boundary_vertex(&self, vertex_index: usize) -> bool {
        self.boundary_vertex[vertex_index]
    }

    pub fn is_boundary_cell(&self, cell_index: usize) -> bool {
        self.cell_facets[cell_index]
            .iter()
            .any(|&f| self.is_boundary_facet(f))
    }

    pub fn boundary_facets(&self) -> Vec<usize> {
        (0..self.num_facets())
            .filter(|&f| self.is_boundary_facet(f))
            .collect()
    }
}
