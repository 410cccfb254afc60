//! Basic procedural mesh generation routines.
use crate::mesh::TriangleMesh2d;
use crate::Real;
use log::debug;
use nalgebra::{Point2, Vector2};
use numeric_literals::replace_float_literals;

pub fn create_unit_square_uniform_tri_mesh_2d<T>(cells_per_dim: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    create_rectangular_uniform_tri_mesh_2d(T::one(), 1, 1, cells_per_dim, &Vector2::new(T::zero(), T::one()))
}

/// Generates an axis-aligned rectangular uniform triangle mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// Each square cell is split into two counter-clockwise triangles along the diagonal from its
/// bottom-left to its top-right corner.
pub fn create_rectangular_uniform_tri_mesh_2d<T>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    top_left: &Vector2<T>,
) -> TriangleMesh2d<T>
where
    T: Real,
{
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 {
        return TriangleMesh2d::from_vertices_and_cells(Vec::new(), Vec::new());
    }

    let cell_size = unit_length / T::from_usize(cells_per_unit).expect("Must be able to fit usize in T");
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;

    grid_tri_mesh(num_cells_x, num_cells_y, |i, j| {
        let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
        let j_as_t = T::from_usize(j).expect("Must be able to fit usize in T");
        Point2::from(top_left + Vector2::new(i_as_t, -j_as_t) * cell_size)
    })
}

/// Generates a triangle mesh of Cook's membrane.
///
/// The membrane is the quadrilateral with corners (0, 0), (48, 44), (48, 60) and (0, 44). The mesh
/// is obtained by mapping a uniform grid of the unit square bilinearly onto the membrane, with
/// `cells_per_side` cells along each side. The clamped edge lies on `x = 0` and the loaded edge on
/// `x = 48`. For an even number of cells, the point (48, 52) is a vertex of the mesh.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn create_cook_membrane_mesh<T>(cells_per_side: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    if cells_per_side == 0 {
        return TriangleMesh2d::from_vertices_and_cells(Vec::new(), Vec::new());
    }

    let n = T::from_usize(cells_per_side).expect("Must be able to fit usize in T");
    // Grid rows are enumerated from the top, so flip the vertical parameter
    let mesh = grid_tri_mesh(cells_per_side, cells_per_side, |i, j| {
        let s = T::from_usize(i).expect("Must be able to fit usize in T") / n;
        let t = T::from_usize(cells_per_side - j).expect("Must be able to fit usize in T") / n;
        let y_bottom = 44.0 * s;
        let y_top = 44.0 + 16.0 * s;
        Point2::new(48.0 * s, y_bottom + t * (y_top - y_bottom))
    });
    debug!(
        "Created Cook's membrane mesh with {} vertices and {} cells",
        mesh.num_vertices(),
        mesh.num_cells()
    );
    mesh
}

/// Builds a triangle mesh over a structured grid whose vertex `(i, j)` is placed at `position(i, j)`,
/// with `j` increasing downwards.
fn grid_tri_mesh<T, F>(num_cells_x: usize, num_cells_y: usize, position: F) -> TriangleMesh2d<T>
where
    T: Real,
    F: Fn(usize, usize) -> Point2<T>,
{
    let to_global_vertex_index = |i, j| (num_cells_x + 1) * j + i;

    let mut vertices = Vec::with_capacity((num_cells_x + 1) * (num_cells_y + 1));
    for j in 0..=num_cells_y {
        for i in 0..=num_cells_x {
            vertices.push(position(i, j));
        }
    }

    let mut cells = Vec::with_capacity(2 * num_cells_x * num_cells_y);
    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            let quad = [
                to_global_vertex_index(i, j + 1),
                to_global_vertex_index(i + 1, j + 1),
                to_global_vertex_index(i + 1, j),
                to_global_vertex_index(i, j),
            ];
            cells.push([quad[0], quad[1], quad[2]]);
            cells.push([quad[0], quad[2], quad[3]]);
        }
    }

    TriangleMesh2d::from_vertices_and_cells(vertices, cells)
}
