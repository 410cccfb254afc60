use condensa::evaluate::FunctionEvaluator;
use condensa::mesh::procedural::{create_cook_membrane_mesh, create_unit_square_uniform_tri_mesh_2d};
use condensa::mesh::{MeshTopology, TriangleMesh2d};
use condensa::space::{FiniteElementSpace, VectorP2Space};
use nalgebra::{DVector, Point2, Vector2};
use proptest::prelude::*;

fn quadratic_field(x: &Point2<f64>) -> Vector2<f64> {
    Vector2::new(x.x * x.x + 0.5 * x.y - 1.0, x.x * x.y - 2.0 * x.y * x.y)
}

fn interpolate(mesh: &TriangleMesh2d<f64>, space: &VectorP2Space, u: impl Fn(&Point2<f64>) -> Vector2<f64>) -> DVector<f64> {
    let mut coefficients = DVector::zeros(space.num_dofs());
    for (node, x) in space.node_coordinates(mesh).iter().enumerate() {
        let value = u(x);
        coefficients[2 * node] = value.x;
        coefficients[2 * node + 1] = value.y;
    }
    coefficients
}

#[test]
fn points_outside_the_mesh_are_not_found() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(4);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let evaluator = FunctionEvaluator::new(&mesh, &space);
    let coefficients = DVector::zeros(space.num_dofs());

    assert!(evaluator.find_cell(&Point2::new(1.5, 0.5)).is_none());
    assert!(evaluator.evaluate(&coefficients, &Point2::new(-0.1, 0.5)).is_none());
}

#[test]
fn shared_points_resolve_to_lowest_cell_index() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let evaluator = FunctionEvaluator::new(&mesh, &space);
    // The diagonal is shared by both cells
    assert_eq!(evaluator.find_cell(&Point2::new(0.5, 0.5)), Some(0));
    assert_eq!(evaluator.find_cell(&Point2::new(0.25, 0.75)), Some(1));
    assert_eq!(evaluator.find_cell(&Point2::new(0.75, 0.25)), Some(0));
}

#[test]
fn evaluation_at_mesh_vertices_returns_nodal_values() {
    let mesh = create_cook_membrane_mesh::<f64>(4);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let coefficients = interpolate(&mesh, &space, quadratic_field);
    let evaluator = FunctionEvaluator::new(&mesh, &space);

    for x in mesh.vertices() {
        let value = evaluator.evaluate(&coefficients, x).unwrap();
        assert!((value - quadratic_field(x)).norm() <= 1e-9 * (1.0 + quadratic_field(x).norm()));
    }
}

#[test]
#[should_panic]
fn wrong_coefficient_count_panics() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let evaluator = FunctionEvaluator::new(&mesh, &space);
    let _ = evaluator.evaluate(&DVector::zeros(3), &Point2::new(0.5, 0.5));
}

proptest! {
    #[test]
    fn quadratic_fields_are_reproduced_exactly(x in 0.0..=1.0f64, y in 0.0..=1.0f64) {
        let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
        let topology = MeshTopology::from_mesh(&mesh);
        let space = VectorP2Space::new(&mesh, &topology);
        let coefficients = interpolate(&mesh, &space, quadratic_field);
        let evaluator = FunctionEvaluator::new(&mesh, &space);

        let point = Point2::new(x, y);
        let value = evaluator.evaluate(&coefficients, &point).unwrap();
        prop_assert!((value - quadratic_field(&point)).norm() < 1e-12);
    }
}
