use condensa::element::{AffineTriangle, LagrangeP1, LagrangeP2, LagrangeP2Segment};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Matrix2, Point2, Vector2};
use proptest::prelude::*;

/// Points in the closed reference triangle.
fn reference_point() -> impl Strategy<Value = Point2<f64>> {
    (0.0..=1.0, 0.0..=1.0).prop_map(|(a, b): (f64, f64)| {
        if a + b > 1.0 {
            Point2::new(1.0 - a, 1.0 - b)
        } else {
            Point2::new(a, b)
        }
    })
}

fn physical_triangle() -> impl Strategy<Value = AffineTriangle<f64>> {
    proptest::array::uniform3((-5.0f64..5.0, -5.0f64..5.0))
        .prop_map(|coords| AffineTriangle::from_vertices(coords.map(|(x, y)| Point2::new(x, y))))
        .prop_filter("triangle must not be degenerate", |triangle| triangle.area() > 1e-2)
}

#[test]
fn affine_triangle_geometry() {
    let triangle = AffineTriangle::from_vertices([Point2::new(1.0, 1.0), Point2::new(3.0, 1.0), Point2::new(1.0, 4.0)]);
    assert_matrix_eq!(triangle.jacobian(), Matrix2::new(2.0, 0.0, 0.0, 3.0));
    assert_scalar_eq!(triangle.determinant(), 6.0);
    assert_scalar_eq!(triangle.area(), 3.0);
    assert_matrix_eq!(triangle.centroid().coords, Vector2::new(5.0 / 3.0, 2.0), comp = float);

    let (min, max) = triangle.bounding_box();
    assert_eq!(min, Point2::new(1.0, 1.0));
    assert_eq!(max, Point2::new(3.0, 4.0));

    let inv_t = triangle.inverse_transpose().unwrap();
    assert_matrix_eq!(inv_t, Matrix2::new(0.5, 0.0, 0.0, 1.0 / 3.0), comp = float);
}

#[test]
fn clockwise_triangle_has_negative_determinant() {
    let triangle = AffineTriangle::from_vertices([Point2::new(0.0, 0.0), Point2::new(0.0, 1.0), Point2::new(1.0, 0.0)]);
    assert_scalar_eq!(triangle.determinant(), -1.0);
    assert_scalar_eq!(triangle.area(), 0.5);
}

#[test]
fn degenerate_triangle_has_no_inverse_map() {
    let triangle = AffineTriangle::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)]);
    assert_eq!(triangle.area(), 0.0);
    assert!(triangle.inverse_transpose().is_none());
    assert!(triangle.map_physical_coords(&Point2::new(0.5, 0.5)).is_none());
    assert!(!triangle.contains_point(&Point2::new(0.5, 0.5), 1e-10));
}

#[test]
fn contains_point_respects_tolerance() {
    let triangle = AffineTriangle::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)]);
    assert!(triangle.contains_point(&Point2::new(0.25, 0.25), 0.0));
    assert!(triangle.contains_point(&Point2::new(0.5, 0.5), 1e-12));
    assert!(triangle.contains_point(&Point2::new(0.0, 0.0), 0.0));
    assert!(!triangle.contains_point(&Point2::new(0.6, 0.6), 1e-12));
    assert!(!triangle.contains_point(&Point2::new(-1e-6, 0.5), 1e-8));
    assert!(triangle.contains_point(&Point2::new(-1e-9, 0.5), 1e-8));
}

#[test]
fn p2_basis_is_nodal() {
    let nodes = LagrangeP2.nodes::<f64>();
    for (j, node) in nodes.iter().enumerate() {
        let phi = LagrangeP2.evaluate_basis(node);
        for i in 0..LagrangeP2::NUM_NODES {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_scalar_eq!(phi[i], expected, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn p2_edge_nodes_are_edge_midpoints() {
    let nodes = LagrangeP2.nodes::<f64>();
    for (k, [a, b]) in LagrangeP2::EDGES.iter().enumerate() {
        let midpoint = Point2::from((nodes[*a].coords + nodes[*b].coords) / 2.0);
        assert_eq!(nodes[3 + k], midpoint);
    }
}

#[test]
fn p2_segment_basis_is_nodal() {
    let nodes = [-1.0, 1.0, 0.0];
    for (j, &t) in nodes.iter().enumerate() {
        let phi = LagrangeP2Segment.evaluate_basis(t);
        for i in 0..LagrangeP2Segment::NUM_NODES {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_scalar_eq!(phi[i], expected, comp = abs, tol = 1e-15);
        }
    }
}

proptest! {
    #[test]
    fn p1_partition_of_unity(xi in reference_point()) {
        let phi = LagrangeP1.evaluate_basis(&xi);
        prop_assert!((phi.sum() - 1.0).abs() < 1e-14);
        let gradient_sum: Vector2<f64> = LagrangeP1.gradients(&xi).column_sum();
        prop_assert!(gradient_sum.norm() < 1e-14);
    }

    #[test]
    fn p2_partition_of_unity(xi in reference_point()) {
        let phi = LagrangeP2.evaluate_basis(&xi);
        prop_assert!((phi.sum() - 1.0).abs() < 1e-13);
        let gradient_sum: Vector2<f64> = LagrangeP2.gradients(&xi).column_sum();
        prop_assert!(gradient_sum.norm() < 1e-13);
    }

    #[test]
    fn p2_gradients_match_finite_differences(xi in reference_point()) {
        let h = 1e-6;
        let gradients = LagrangeP2.gradients(&xi);
        for d in 0..2 {
            let mut offset = Vector2::zeros();
            offset[d] = h;
            let forward = LagrangeP2.evaluate_basis(&(xi + offset));
            let backward = LagrangeP2.evaluate_basis(&(xi - offset));
            let fd = (forward - backward) / (2.0 * h);
            for i in 0..LagrangeP2::NUM_NODES {
                prop_assert!((fd[i] - gradients[(d, i)]).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn p2_segment_partition_of_unity(t in -1.0..=1.0f64) {
        let phi = LagrangeP2Segment.evaluate_basis(t);
        prop_assert!((phi.sum() - 1.0).abs() < 1e-14);
        prop_assert!(LagrangeP2Segment.gradients(t).sum().abs() < 1e-14);
    }

    #[test]
    fn reference_and_physical_maps_are_inverse(triangle in physical_triangle(), xi in reference_point()) {
        let x = triangle.map_reference_coords(&xi);
        let xi_mapped = triangle.map_physical_coords(&x).unwrap();
        prop_assert!((xi_mapped - xi).norm() < 1e-10);
        prop_assert!(triangle.contains_point(&x, 1e-9));

        let lambda = triangle.barycentric_coordinates(&x).unwrap();
        prop_assert!((lambda.sum() - 1.0).abs() < 1e-10);
        let reconstructed = triangle.vertices()[0].coords * lambda[0]
            + triangle.vertices()[1].coords * lambda[1]
            + triangle.vertices()[2].coords * lambda[2];
        prop_assert!((reconstructed - x.coords).norm() < 1e-9);
    }
}
