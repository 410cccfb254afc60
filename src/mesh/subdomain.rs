//! Geometric marking of mesh entities.
use crate::mesh::{EntityDim, MeshTopology, TriangleMesh2d};
use crate::Real;
use itertools::Itertools;
use nalgebra::{Point2, Vector2};

/// A geometric region of the domain.
///
/// `on_boundary` tells whether the entity being tested lies on the boundary of the mesh.
pub trait SubDomain<T: Real> {
    fn inside(&self, x: &Point2<T>, on_boundary: bool) -> bool;

    /// Sets `value` for every entity of the markers' dimension that lies inside the subdomain.
    ///
    /// An entity is inside if all its vertices are inside and, for facets and cells, if its
    /// midpoint is inside as well. Facets are on the boundary if they are adjacent to a single
    /// cell, and cells are on the boundary if one of their facets is.
    fn mark(&self, mesh: &TriangleMesh2d<T>, topology: &MeshTopology, markers: &mut EntityMarkers, value: i32) {
        assert_eq!(
            markers.len(),
            topology.num_entities(markers.dim()),
            "Markers must have one value per entity"
        );
        let vertices = mesh.vertices();
        match markers.dim() {
            EntityDim::Vertex => {
                for (v, x) in vertices.iter().enumerate() {
                    if self.inside(x, topology.is_boundary_vertex(v)) {
                        markers.set(v, value);
                    }
                }
            }
            EntityDim::Facet => {
                for (f, facet) in topology.facets().iter().enumerate() {
                    let on_boundary = topology.is_boundary_facet(f);
                    if entity_inside(self, facet.iter().map(|&v| &vertices[v]), on_boundary) {
                        markers.set(f, value);
                    }
                }
            }
            EntityDim::Cell => {
                for (c, cell) in mesh.cells().iter().enumerate() {
                    let on_boundary = topology.is_boundary_cell(c);
                    if entity_inside(self, cell.iter().map(|&v| &vertices[v]), on_boundary) {
                        markers.set(c, value);
                    }
                }
            }
        }
    }
}

impl<T, F> SubDomain<T> for F
where
    T: Real,
    F: Fn(&Point2<T>, bool) -> bool,
{
    fn inside(&self, x: &Point2<T>, on_boundary: bool) -> bool {
        self(x, on_boundary)
    }
}

fn entity_inside<'a, T, S>(subdomain: &S, points: impl Iterator<Item = &'a Point2<T>>, on_boundary: bool) -> bool
where
    T: Real,
    S: SubDomain<T> + ?Sized,
{
    let mut sum = Vector2::zeros();
    let mut count = 0;
    for x in points {
        if !subdomain.inside(x, on_boundary) {
            return false;
        }
        sum += x.coords;
        count += 1;
    }
    let midpoint = Point2::from(sum / T::from_usize(count).expect("Must be able to fit usize in T"));
    subdomain.inside(&midpoint, on_boundary)
}

/// A marker value for every entity of one topological dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMarkers {
    dim: EntityDim,
    values: Vec<i32>,
}

impl EntityMarkers {
    pub fn new(topology: &MeshTopology, dim: EntityDim, default_value: i32) -> Self {
        Self {
            dim,
            values: vec![default_value; topology.num_entities(dim)],
        }
    }

    pub fn dim(&self) -> EntityDim {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn value(&self, entity: usize) -> i32 {
        self.values[entity]
    }

    pub fn set(&mut self, entity: usize, value: i32) {
        self.values[entity] = value;
    }

    /// Number of entities carrying the given value.
    pub fn count(&self, value: i32) -> usize {
        self.values.iter().filter(|&&v| v == value).count()
    }

    /// Sorted indices of entities carrying the given value.
    pub fn find(&self, value: i32) -> Vec<usize> {
        self.values
            .iter()
            .positions(|&v| v == value)
            .collect()
    }
}

/// Finds all entities of the given dimension whose vertices all satisfy `marker`.
///
/// With `boundary_only`, only entities on the mesh boundary are considered. The returned indices
/// are sorted.
pub fn locate_entities<T, F>(
    mesh: &TriangleMesh2d<T>,
    topology: &MeshTopology,
    dim: EntityDim,
    marker: F,
    boundary_only: bool,
) -> Vec<usize>
where
    T: Real,
    F: Fn(&Point2<T>) -> bool,
{
    let vertices = mesh.vertices();
    let all_inside = |entity_vertices: &[usize]| entity_vertices.iter().all(|&v| marker(&vertices[v]));
    match dim {
        EntityDim::Vertex => (0..mesh.num_vertices())
            .filter(|&v| !boundary_only || topology.is_boundary_vertex(v))
            .filter(|&v| marker(&vertices[v]))
            .collect(),
        EntityDim::Facet => (0..topology.num_facets())
            .filter(|&f| !boundary_only || topology.is_boundary_facet(f))
            .filter(|&f| all_inside(topology.facets()[f].as_slice()))
            .collect(),
        EntityDim::Cell => (0..mesh.num_cells())
            .filter(|&c| !boundary_only || topology.is_boundary_cell(c))
            .filter(|&c| all_inside(mesh.cells()[c].as_slice()))
            .collect(),
    }
}

/// A sparse tagging of mesh entities of one dimension with integer values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTags {
    dim: EntityDim,
    indices: Vec<usize>,
    values: Vec<i32>,
}

impl MeshTags {
    /// Tags all the given entities with the same value.
    ///
    /// The indices are sorted and duplicates are removed.
    pub fn new(dim: EntityDim, mut indices: Vec<usize>, value: i32) -> Self {
        indices.sort_unstable();
        indices.dedup();
        let values = vec![value; indices.len()];
        Self { dim, indices, values }
    }

    /// Combines the tags with another set of tags of the same dimension.
    ///
    /// Entities tagged in both keep the value from `other`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn merge(&self, other: &MeshTags) -> MeshTags {
        assert_eq!(self.dim, other.dim, "Cannot merge tags of different dimensions");
        let merged: Vec<(usize, i32)> = self
            .entries()
            .merge_join_by(other.entries(), |(a, _), (b, _)| a.cmp(b))
            .map(|either| match either {
                itertools::EitherOrBoth::Left(entry) | itertools::EitherOrBoth::Right(entry) => entry,
                itertools::EitherOrBoth::Both(_, entry) => entry,
            })
            .collect();
        let (indices, values) = merged.into_iter().unzip();
        MeshTags {
            dim: self.dim,
            indices,
            values,
        }
    }

    pub fn dim(&self) -> EntityDim {
        self.dim
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn entries(&self) -> impl '_ + Iterator<Item = (usize, i32)> {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Sorted indices of entities tagged with the given value.
    pub fn find(&self, value: i32) -> Vec<usize> {
        self.entries()
            .filter(|&(_, v)| v == value)
            .map(|(index, _)| index)
            .collect()
    }
}
