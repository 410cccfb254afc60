use condensa::assembly::{
    apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_rhs, assemble_facet_vector,
    locate_dofs_topological, AssemblyError, CsrAssembler,
};
use condensa::kernel::{
    CellData, DisplacementStiffnessKernel, ElementTensorProvider, StressMassKernel, TabulationError,
};
use condensa::mesh::procedural::{create_cook_membrane_mesh, create_unit_square_uniform_tri_mesh_2d};
use condensa::mesh::{locate_entities, EntityDim, MeshTopology, TriangleMesh2d};
use condensa::registry::{FormId, KernelRegistry};
use condensa::solid::PlaneStressMaterial;
use condensa::space::{FiniteElementSpace, SymmetricTensorDg1Space, VectorP2Space};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, Point2, Vector2};
use nalgebra_sparse::CsrMatrix;

fn unit_square(n: usize) -> (TriangleMesh2d<f64>, MeshTopology, VectorP2Space) {
    let mesh = create_unit_square_uniform_tri_mesh_2d(n);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    (mesh, topology, space)
}

fn material() -> PlaneStressMaterial<f64> {
    PlaneStressMaterial::new(1.0, 1.0 / 3.0)
}

#[test]
fn dg1_pattern_is_block_diagonal() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
    let space = SymmetricTensorDg1Space::new(&mesh);
    let pattern = CsrAssembler::new().assemble_pattern(&space, &space);
    assert_eq!(pattern.major_dim(), space.num_dofs());
    assert_eq!(pattern.minor_dim(), space.num_dofs());
    assert_eq!(pattern.nnz(), 81 * mesh.num_cells());
}

#[test]
fn stress_mass_assembly_matches_element_tensors() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let space = SymmetricTensorDg1Space::new(&mesh);
    let kernel = StressMassKernel::new();
    let matrix = CsrAssembler::new()
        .assemble(&mesh, &space, &space, &kernel)
        .unwrap();

    let mut expected = DMatrix::zeros(space.num_dofs(), space.num_dofs());
    for cell in 0..mesh.num_cells() {
        let element = kernel
            .tabulate(&CellData::new(cell, mesh.cell_vertices(cell)))
            .unwrap();
        expected
            .view_mut((9 * cell, 9 * cell), (9, 9))
            .copy_from(&element);
    }
    assert_matrix_eq!(DMatrix::from(&matrix), expected, comp = abs, tol = 1e-15);
}

#[test]
fn displacement_stiffness_assembly_properties() {
    let (mesh, _, space) = unit_square(4);
    let matrix = CsrAssembler::new()
        .assemble(&mesh, &space, &space, &DisplacementStiffnessKernel::new(material()))
        .unwrap();
    assert_eq!(matrix.nrows(), space.num_dofs());

    let dense = DMatrix::from(&matrix);
    assert_matrix_eq!(dense, dense.transpose(), comp = abs, tol = 1e-12);

    // Rigid translations are in the kernel of the global operator
    let translation = DVector::from_fn(space.num_dofs(), |i, _| if i % 2 == 0 { 1.0 } else { 0.0 });
    assert!((&dense * &translation).norm() < 1e-12);
}

#[test]
fn assembly_does_not_depend_on_thread_count() {
    let mesh = create_cook_membrane_mesh::<f64>(6);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let kernel = DisplacementStiffnessKernel::new(material());
    let assembler = CsrAssembler::new();

    let parallel = assembler.assemble(&mesh, &space, &space, &kernel).unwrap();
    let single_threaded = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| assembler.assemble(&mesh, &space, &space, &kernel).unwrap());
    assert_eq!(parallel, single_threaded);
}

#[test]
fn kernel_shape_must_match_spaces() {
    let (mesh, _, space) = unit_square(2);
    let err = CsrAssembler::new()
        .assemble(&mesh, &space, &space, &StressMassKernel::new())
        .unwrap_err();
    assert_eq!(
        err,
        AssemblyError::KernelShapeMismatch {
            kernel_shape: (9, 9),
            space_dims: (12, 12)
        }
    );
}

#[test]
fn cell_counts_must_match() {
    let (mesh, _, _) = unit_square(2);
    let other_mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
    let space = SymmetricTensorDg1Space::new(&other_mesh);
    let err = CsrAssembler::new()
        .assemble(&mesh, &space, &space, &StressMassKernel::new())
        .unwrap_err();
    assert!(matches!(err, AssemblyError::CellCountMismatch { mesh: 8, .. }));
}

#[test]
fn matrix_shape_must_match_spaces() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let space = SymmetricTensorDg1Space::new(&mesh);
    let mut matrix = CsrMatrix::identity(3);
    let err = CsrAssembler::new()
        .assemble_into_csr(&mut matrix, &mesh, &space, &space, &StressMassKernel::new())
        .unwrap_err();
    assert!(matches!(err, AssemblyError::MatrixShapeMismatch { .. }));
}

#[test]
fn tabulation_errors_are_propagated() {
    let mesh = TriangleMesh2d::from_vertices_and_cells(
        vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)],
        vec![[0, 1, 2]],
    );
    let space = SymmetricTensorDg1Space::new(&mesh);
    let err = CsrAssembler::new()
        .assemble(&mesh, &space, &space, &StressMassKernel::new())
        .unwrap_err();
    assert_eq!(err, AssemblyError::Tabulation(TabulationError::DegenerateCell { cell: 0 }));
}

#[test]
fn assemble_registered_form() {
    let (mesh, _, space) = unit_square(2);
    let registry = KernelRegistry::new()
        .with_kernel("a", DisplacementStiffnessKernel::new(material()))
        .unwrap();
    let assembler = CsrAssembler::new();

    let from_registry = assembler
        .assemble_form(&registry, &FormId::from("a"), &mesh, &space, &space)
        .unwrap();
    let direct = assembler
        .assemble(&mesh, &space, &space, &DisplacementStiffnessKernel::new(material()))
        .unwrap();
    assert_eq!(from_registry, direct);

    let err = assembler
        .assemble_form(&registry, &FormId::from("b"), &mesh, &space, &space)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("\"b\""));
}

#[test]
fn facet_vector_distributes_total_traction() {
    let (mesh, topology, space) = unit_square(5);
    let right = locate_entities(&mesh, &topology, EntityDim::Facet, |x| (x.x - 1.0).abs() < 1e-10, true);
    assert_eq!(right.len(), 5);

    let traction = Vector2::new(0.0, 0.25);
    let load = assemble_facet_vector(&mesh, &topology, &space, &right, |_| traction);
    assert_eq!(load.len(), space.num_dofs());

    let total_x: f64 = load.iter().step_by(2).sum();
    let total_y: f64 = load.iter().skip(1).step_by(2).sum();
    assert_scalar_eq!(total_x, 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(total_y, 0.25, comp = abs, tol = 1e-14);

    // Nodes away from the loaded edge receive nothing
    let coordinates = space.node_coordinates(&mesh);
    for (node, x) in coordinates.iter().enumerate() {
        if x.x < 1.0 - 1e-10 {
            assert_eq!(load[2 * node + 1], 0.0);
        }
    }
}

#[test]
fn facet_vector_integrates_linear_traction() {
    let (mesh, topology, space) = unit_square(4);
    let left = locate_entities(&mesh, &topology, EntityDim::Facet, |x| x.x.abs() < 1e-10, true);
    let load = assemble_facet_vector(&mesh, &topology, &space, &left, |x: &Point2<f64>| Vector2::new(x.y, 0.0));
    // Integral of y over the left edge
    let total_x: f64 = load.iter().step_by(2).sum();
    assert_scalar_eq!(total_x, 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn locate_dofs_on_facets() {
    let (_, topology, space) = unit_square(2);
    let facet = topology.boundary_facets()[0];
    let [a, b, midpoint] = *space.facet_nodes(facet);
    let mut expected = vec![2 * a, 2 * a + 1, 2 * b, 2 * b + 1, 2 * midpoint, 2 * midpoint + 1];
    expected.sort_unstable();
    assert_eq!(locate_dofs_topological(&space, &[facet]), expected);

    // Shared vertices are only reported once
    let all = locate_dofs_topological(&space, &topology.boundary_facets());
    assert!(all.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(all.len(), 2 * (8 + 8));
}

#[test]
fn dirichlet_conditions_keep_symmetry() {
    let (mesh, topology, space) = unit_square(3);
    // The displacement form is negative definite, so constrain its negation
    let mut matrix = -CsrAssembler::new()
        .assemble(&mesh, &space, &space, &DisplacementStiffnessKernel::new(material()))
        .unwrap();
    let left = locate_entities(&mesh, &topology, EntityDim::Facet, |x| x.x.abs() < 1e-10, true);
    let dofs = locate_dofs_topological(&space, &left);
    let scale = condensa::sparse::csr_diagonal(&matrix)[0].abs();

    apply_homogeneous_dirichlet_bc_csr(&mut matrix, &dofs);
    let dense = DMatrix::from(&matrix);
    assert_matrix_eq!(dense, dense.transpose(), comp = abs, tol = 1e-12);
    for &dof in &dofs {
        for j in 0..dense.ncols() {
            let expected = if j == dof { scale } else { 0.0 };
            assert_eq!(dense[(dof, j)], expected);
            assert_eq!(dense[(j, dof)], expected);
        }
    }
    // The constrained operator is positive definite
    assert!(dense.cholesky().is_some());

    let mut rhs = DVector::repeat(space.num_dofs(), 1.0);
    apply_homogeneous_dirichlet_bc_rhs(&mut rhs, &dofs);
    for i in 0..rhs.len() {
        let expected = if dofs.contains(&i) { 0.0 } else { 1.0 };
        assert_eq!(rhs[i], expected);
    }
}
