//! Cook's membrane: a sloped plane stress cantilever clamped at `x = 0` and loaded by a uniform
//! traction on its free end at `x = 48`.
//!
//! The problem is discretized with the mixed stress-displacement formulation. The stresses are
//! eliminated element by element through static condensation, and the resulting displacement
//! system is compared against the pure displacement formulation.
use crate::assembly::{
    apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_rhs, assemble_facet_vector,
    locate_dofs_topological, CsrAssembler,
};
use crate::evaluate::FunctionEvaluator;
use crate::kernel::{
    CondensedKernel, DisplacementStiffnessKernel, StrainStressKernel, StressDivergenceKernel, StressMassKernel,
};
use crate::mesh::procedural::create_cook_membrane_mesh;
use crate::mesh::{locate_entities, EntityDim, MeshTags, MeshTopology, TriangleMesh2d};
use crate::parameters::{ParameterError, Parameters};
use crate::registry::{FormId, KernelRegistry, SharedKernel};
use crate::solid::PlaneStressMaterial;
use crate::space::{FiniteElementSpace, VectorP2Space};
use crate::sparse::cg::{ConjugateGradient, JacobiPreconditioner, RelativeResidualCriterion};
use crate::sparse::frobenius_norm_of_difference;
use crate::Real;
use eyre::{ensure, eyre, WrapErr};
use log::info;
use nalgebra::{DVector, Point2, Vector2};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const STRESS_MASS_FORM: &str = "a00";
pub const STRAIN_STRESS_FORM: &str = "a01";
pub const STRESS_DIVERGENCE_FORM: &str = "a10";
pub const DISPLACEMENT_FORM: &str = "a";
pub const CONDENSED_FORM: &str = "a_condensed";

/// Marker value of the loaded facets.
pub const FREE_END_MARKER: i32 = 1;

/// The point at which the reference tip displacement is measured.
pub const TIP_POINT: [f64; 2] = [48.0, 52.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookMembraneConfig {
    pub young: f64,
    pub poisson: f64,
    pub traction: [f64; 2],
    pub cells_per_side: usize,
    pub cg_tolerance: f64,
    pub cg_max_iter: usize,
    pub monitor_convergence: bool,
}

impl Default for CookMembraneConfig {
    fn default() -> Self {
        Self {
            young: 1.0,
            poisson: 1.0 / 3.0,
            traction: [0.0, 1.0 / 16.0],
            cells_per_side: 16,
            cg_tolerance: 1e-10,
            cg_max_iter: 20_000,
            monitor_convergence: false,
        }
    }
}

impl CookMembraneConfig {
    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(self.young > 0.0, "Young's modulus must be positive, got {}", self.young);
        ensure!(
            self.poisson > -1.0 && self.poisson < 0.5,
            "Poisson ratio must be in (-1, 0.5), got {}",
            self.poisson
        );
        ensure!(self.cells_per_side > 0, "Mesh must have at least one cell per side");
        ensure!(self.cg_tolerance > 0.0, "CG tolerance must be positive");
        Ok(())
    }

    /// Parameter layout: material and load at the top level, solver settings in a nested
    /// `"solver"` collection.
    pub fn to_parameters(&self) -> Parameters {
        let mut solver = Parameters::new("solver");
        solver.set("tolerance", self.cg_tolerance);
        solver.set("max_iter", self.cg_max_iter as i64);
        solver.set("monitor_convergence", self.monitor_convergence);

        let mut parameters = Parameters::new("cook_membrane");
        parameters.set("young", self.young);
        parameters.set("poisson", self.poisson);
        parameters.set("traction_x", self.traction[0]);
        parameters.set("traction_y", self.traction[1]);
        parameters.set("cells_per_side", self.cells_per_side as i64);
        parameters.set("solver", solver);
        parameters
    }

    /// Reads a configuration from parameters laid out as by [`to_parameters`](Self::to_parameters).
    ///
    /// Missing parameters take their default values.
    pub fn from_parameters(parameters: &Parameters) -> Result<Self, ParameterError> {
        let mut config = Self::default();
        read_if_present(parameters, "young", Parameters::get_real, &mut config.young)?;
        read_if_present(parameters, "poisson", Parameters::get_real, &mut config.poisson)?;
        read_if_present(parameters, "traction_x", Parameters::get_real, &mut config.traction[0])?;
        read_if_present(parameters, "traction_y", Parameters::get_real, &mut config.traction[1])?;
        let mut cells_per_side = config.cells_per_side as i64;
        read_if_present(parameters, "cells_per_side", Parameters::get_int, &mut cells_per_side)?;
        config.cells_per_side = usize::try_from(cells_per_side).unwrap_or(0);

        if parameters.contains("solver") {
            let solver = parameters.nested("solver")?;
            read_if_present(solver, "tolerance", Parameters::get_real, &mut config.cg_tolerance)?;
            let mut max_iter = config.cg_max_iter as i64;
            read_if_present(solver, "max_iter", Parameters::get_int, &mut max_iter)?;
            config.cg_max_iter = usize::try_from(max_iter).unwrap_or(0);
            read_if_present(
                solver,
                "monitor_convergence",
                Parameters::get_bool,
                &mut config.monitor_convergence,
            )?;
        }
        Ok(config)
    }
}

fn read_if_present<V>(
    parameters: &Parameters,
    key: &str,
    getter: impl Fn(&Parameters, &str) -> Result<V, ParameterError>,
    target: &mut V,
) -> Result<(), ParameterError> {
    if parameters.contains(key) {
        *target = getter(parameters, key)?;
    }
    Ok(())
}

/// Registers the kernels of the mixed elasticity formulation, the pure displacement form and the
/// condensed form composed from the three mixed blocks.
pub fn mixed_elasticity_registry<T: Real>(material: PlaneStressMaterial<T>) -> eyre::Result<KernelRegistry<T>> {
    let a00: SharedKernel<T> = Arc::new(StressMassKernel::new());
    let a01: SharedKernel<T> = Arc::new(StrainStressKernel::new(material));
    let a10: SharedKernel<T> = Arc::new(StressDivergenceKernel::new());
    let condensed = CondensedKernel::new(a00.clone(), a01.clone(), a10.clone())?;

    let mut registry = KernelRegistry::new();
    registry.insert(STRESS_MASS_FORM, a00)?;
    registry.insert(STRAIN_STRESS_FORM, a01)?;
    registry.insert(STRESS_DIVERGENCE_FORM, a10)?;
    registry.insert(DISPLACEMENT_FORM, Arc::new(DisplacementStiffnessKernel::new(material)))?;
    registry.insert(CONDENSED_FORM, Arc::new(condensed))?;
    Ok(registry)
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

#[derive(Debug, Clone)]
pub struct CookMembraneSolution {
    pub mesh: TriangleMesh2d<f64>,
    pub topology: MeshTopology,
    pub space: VectorP2Space,
    /// Condensed global matrix, before boundary conditions are applied.
    pub condensed_matrix: CsrMatrix<f64>,
    /// Pure displacement global matrix, before boundary conditions are applied.
    pub displacement_matrix: CsrMatrix<f64>,
    pub displacement: DVector<f64>,
    pub cg_iterations: usize,
}

impl CookMembraneSolution {
    pub fn evaluator(&self) -> FunctionEvaluator<'_, f64> {
        FunctionEvaluator::new(&self.mesh, &self.space)
    }

    pub fn displacement_at(&self, x: &Point2<f64>) -> Option<Vector2<f64>> {
        self.evaluator().evaluate(&self.displacement, x)
    }

    pub fn tip_displacement(&self) -> Option<Vector2<f64>> {
        self.displacement_at(&Point2::from(TIP_POINT))
    }

    /// Frobenius norm of the difference between the condensed and pure displacement matrices.
    pub fn matrix_difference_norm(&self) -> f64 {
        frobenius_norm_of_difference(&self.condensed_matrix, &self.displacement_matrix)
    }
}

/// Solves Cook's membrane problem with the condensed mixed formulation.
pub fn solve_cook_membrane(config: &CookMembraneConfig) -> eyre::Result<CookMembraneSolution> {
    config.validate()?;
    let mesh = create_cook_membrane_mesh::<f64>(config.cells_per_side);
    let topology = MeshTopology::from_mesh(&mesh);
    let space = VectorP2Space::new(&mesh, &topology);
    let material = PlaneStressMaterial::new(config.young, config.poisson);
    let registry = mixed_elasticity_registry(material)?;
    info!(
        "Cook's membrane: {} cells, {} displacement dofs",
        mesh.num_cells(),
        space.num_dofs()
    );

    let assembler = CsrAssembler::new();
    let condensed_matrix =
        assembler.assemble_form(&registry, &FormId::from(CONDENSED_FORM), &mesh, &space, &space)?;
    let displacement_matrix =
        assembler.assemble_form(&registry, &FormId::from(DISPLACEMENT_FORM), &mesh, &space, &space)?;

    let free_end_facets = locate_entities(&mesh, &topology, EntityDim::Facet, |x| is_close(x.x, 48.0), true);
    let facet_tags = MeshTags::new(EntityDim::Facet, free_end_facets, FREE_END_MARKER);
    let clamped_facets = locate_entities(&mesh, &topology, EntityDim::Facet, |x| is_close(x.x, 0.0), true);
    ensure!(!facet_tags.indices().is_empty(), "Found no facets on the free end");
    ensure!(!clamped_facets.is_empty(), "Found no facets on the clamped end");

    // The mixed form reads A u = b with b = -(f, v) on the free end. A is negative definite, so
    // CG is applied to the equivalent system -A u = -b.
    let traction = Vector2::from(config.traction);
    let mut rhs = assemble_facet_vector(
        &mesh,
        &topology,
        &space,
        &facet_tags.find(FREE_END_MARKER),
        |_| traction,
    );
    let mut system_matrix = -condensed_matrix.clone();

    let dirichlet_dofs = locate_dofs_topological(&space, &clamped_facets);
    apply_homogeneous_dirichlet_bc_csr(&mut system_matrix, &dirichlet_dofs);
    apply_homogeneous_dirichlet_bc_rhs(&mut rhs, &dirichlet_dofs);

    let mut displacement = DVector::zeros(space.num_dofs());
    let output = ConjugateGradient::new()
        .with_operator(&system_matrix)
        .with_preconditioner(JacobiPreconditioner::from_csr(&system_matrix))
        .with_stopping_criterion(
            RelativeResidualCriterion::new(config.cg_tolerance).with_monitoring(config.monitor_convergence),
        )
        .with_max_iter(config.cg_max_iter)
        .solve_with_guess(&rhs, &mut displacement)
        .map_err(|err| eyre!("{}", err))
        .wrap_err("failed to solve condensed displacement system")?;

    let solution = CookMembraneSolution {
        mesh,
        topology,
        space,
        condensed_matrix,
        displacement_matrix,
        displacement,
        cg_iterations: output.num_iterations,
    };
    if let Some(tip) = solution.tip_displacement() {
        info!("Tip displacement at ({}, {}): {}", TIP_POINT[0], TIP_POINT[1], tip.y);
    }
    Ok(solution)
}
