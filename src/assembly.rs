//! Global assembly of element tensors into CSR matrices, boundary load vectors and homogeneous
//! Dirichlet boundary conditions.
use crate::element::LagrangeP2Segment;
use crate::kernel::{CellData, ElementTensorProvider, TabulationError};
use crate::mesh::{MeshTopology, TriangleMesh2d};
use crate::quadrature::gauss;
use crate::registry::{FormId, KernelRegistry};
use crate::space::{FiniteElementSpace, VectorP2Space};
use crate::Real;
use condensa_sparse::{sparsity_pattern_from_coordinates, zeroed_csr_from_pattern};
use eyre::WrapErr;
use itertools::izip;
use log::debug;
use nalgebra::{DMatrixView, DMatrixViewMut, DVector, DVectorViewMut, Point2, Scalar, Vector2};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use thread_local::ThreadLocal;

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssemblyError {
    /// The kernel's tensor shape does not match the local dimensions of the spaces.
    KernelShapeMismatch {
        kernel_shape: (usize, usize),
        space_dims: (usize, usize),
    },
    /// The spaces are defined on meshes with a different number of cells.
    CellCountMismatch { test: usize, trial: usize, mesh: usize },
    /// The CSR matrix does not have the dimensions of the spaces.
    MatrixShapeMismatch {
        matrix_shape: (usize, usize),
        expected: (usize, usize),
    },
    Tabulation(TabulationError),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KernelShapeMismatch {
                kernel_shape,
                space_dims,
            } => write!(
                f,
                "kernel tensor shape {}x{} does not match local space dimensions {}x{}",
                kernel_shape.0, kernel_shape.1, space_dims.0, space_dims.1
            ),
            Self::CellCountMismatch { test, trial, mesh } => write!(
                f,
                "cell counts differ: test space {}, trial space {}, mesh {}",
                test, trial, mesh
            ),
            Self::MatrixShapeMismatch {
                matrix_shape,
                expected,
            } => write!(
                f,
                "matrix has shape {}x{}, expected {}x{}",
                matrix_shape.0, matrix_shape.1, expected.0, expected.1
            ),
            Self::Tabulation(err) => write!(f, "tabulation failed: {}", err),
        }
    }
}

impl Error for AssemblyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tabulation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TabulationError> for AssemblyError {
    fn from(err: TabulationError) -> Self {
        Self::Tabulation(err)
    }
}

#[derive(Debug, Clone, Default)]
struct CsrAssemblerWorkspace {
    row_dofs: Vec<usize>,
    col_dofs: Vec<usize>,
    col_permutation: Vec<usize>,
}

/// An assembler for CSR matrices.
///
/// Element tensors are tabulated in parallel and then added to the global matrix serially in
/// cell order, so the result does not depend on the number of threads.
#[derive(Debug, Default)]
pub struct CsrAssembler {
    // Buffers that help prevent unnecessary allocations
    // when assembling multiple matrices with the same assembler
    workspace: ThreadLocal<RefCell<CsrAssemblerWorkspace>>,
}

impl CsrAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sparsity pattern coupling every test dof of a cell with every trial dof of the cell.
    pub fn assemble_pattern(
        &self,
        test_space: &(dyn Sync + FiniteElementSpace),
        trial_space: &(dyn Sync + FiniteElementSpace),
    ) -> SparsityPattern {
        let (n_test, n_trial) = (test_space.local_dim(), trial_space.local_dim());
        let coordinates: Vec<(usize, usize)> = (0..test_space.num_cells())
            .into_par_iter()
            .with_min_len(50)
            .flat_map_iter(|cell_index| {
                let ws = &mut *self.workspace.get_or_default().borrow_mut();
                ws.row_dofs.resize(n_test, 0);
                ws.col_dofs.resize(n_trial, 0);
                test_space.populate_cell_dofs(cell_index, &mut ws.row_dofs);
                trial_space.populate_cell_dofs(cell_index, &mut ws.col_dofs);
                let mut cell_coordinates = Vec::with_capacity(n_test * n_trial);
                for &i in &ws.row_dofs {
                    for &j in &ws.col_dofs {
                        cell_coordinates.push((i, j));
                    }
                }
                cell_coordinates
            })
            .collect();

        let pattern = sparsity_pattern_from_coordinates(test_space.num_dofs(), trial_space.num_dofs(), coordinates);
        debug!(
            "Assembled {}x{} sparsity pattern with {} non-zeros",
            pattern.major_dim(),
            pattern.minor_dim(),
            pattern.nnz()
        );
        pattern
    }

    pub fn assemble<T: Real>(
        &self,
        mesh: &TriangleMesh2d<T>,
        test_space: &(dyn Sync + FiniteElementSpace),
        trial_space: &(dyn Sync + FiniteElementSpace),
        kernel: &dyn ElementTensorProvider<T>,
    ) -> Result<CsrMatrix<T>, AssemblyError> {
        let pattern = self.assemble_pattern(test_space, trial_space);
        let mut matrix = zeroed_csr_from_pattern(pattern);
        self.assemble_into_csr(&mut matrix, mesh, test_space, trial_space, kernel)?;
        Ok(matrix)
    }

    /// Assembles the form registered under `form_id`.
    pub fn assemble_form<T: Real>(
        &self,
        registry: &KernelRegistry<T>,
        form_id: &FormId,
        mesh: &TriangleMesh2d<T>,
        test_space: &(dyn Sync + FiniteElementSpace),
        trial_space: &(dyn Sync + FiniteElementSpace),
    ) -> eyre::Result<CsrMatrix<T>> {
        let kernel = registry.get(form_id)?;
        self.assemble(mesh, test_space, trial_space, kernel.as_ref())
            .wrap_err_with(|| format!("failed to assemble form \"{}\"", form_id))
    }

    /// Adds the element tensors of all cells to the given CSR matrix.
    ///
    /// The matrix must contain every entry coupling the dofs of a cell, for example by having been
    /// created from [`assemble_pattern`](Self::assemble_pattern).
    pub fn assemble_into_csr<T: Real>(
        &self,
        csr: &mut CsrMatrix<T>,
        mesh: &TriangleMesh2d<T>,
        test_space: &(dyn Sync + FiniteElementSpace),
        trial_space: &(dyn Sync + FiniteElementSpace),
        kernel: &dyn ElementTensorProvider<T>,
    ) -> Result<(), AssemblyError> {
        let space_dims = (test_space.local_dim(), trial_space.local_dim());
        let kernel_shape = kernel.tensor_shape();
        if kernel_shape != space_dims {
            return Err(AssemblyError::KernelShapeMismatch {
                kernel_shape,
                space_dims,
            });
        }
        let num_cells = mesh.num_cells();
        if test_space.num_cells() != num_cells || trial_space.num_cells() != num_cells {
            return Err(AssemblyError::CellCountMismatch {
                test: test_space.num_cells(),
                trial: trial_space.num_cells(),
                mesh: num_cells,
            });
        }
        let expected = (test_space.num_dofs(), trial_space.num_dofs());
        if (csr.nrows(), csr.ncols()) != expected {
            return Err(AssemblyError::MatrixShapeMismatch {
                matrix_shape: (csr.nrows(), csr.ncols()),
                expected,
            });
        }

        let (rows, cols) = kernel_shape;
        let element_size = rows * cols;
        let mut element_tensors = vec![T::zero(); num_cells * element_size];
        if element_size > 0 {
            element_tensors
                .par_chunks_mut(element_size)
                .enumerate()
                .try_for_each(|(cell_index, tensor)| {
                    let cell = CellData::new(cell_index, mesh.cell_vertices(cell_index));
                    kernel.tabulate_into(&cell, DMatrixViewMut::from_slice(tensor, rows, cols))
                })?;
        }
        debug!("Tabulated {} element tensors of shape {}x{}", num_cells, rows, cols);

        let ws = &mut *self.workspace.get_or_default().borrow_mut();
        ws.row_dofs.resize(rows, 0);
        ws.col_dofs.resize(cols, 0);
        for (cell_index, tensor) in element_tensors.chunks(element_size.max(1)).enumerate() {
            let element_matrix = DMatrixView::from_slice(tensor, rows, cols);
            test_space.populate_cell_dofs(cell_index, &mut ws.row_dofs);
            trial_space.populate_cell_dofs(cell_index, &mut ws.col_dofs);

            ws.col_permutation.clear();
            ws.col_permutation.extend(0..cols);
            let col_dofs = &ws.col_dofs;
            ws.col_permutation.sort_unstable_by_key(|&j| col_dofs[j]);

            for (local_row, &global_row) in ws.row_dofs.iter().enumerate() {
                let mut csr_row = csr.row_mut(global_row);
                let (column_indices, values) = csr_row.cols_and_values_mut();
                add_element_row_to_csr_row(
                    column_indices,
                    values,
                    &ws.col_dofs,
                    &ws.col_permutation,
                    &element_matrix,
                    local_row,
                );
            }
        }

        Ok(())
    }
}

/// Add a row of a local element matrix to the provided row of a CSR matrix.
///
/// `col_dofs`: The global column indices of the element matrix.
/// `sorted_permutation`: The local column indices, ordered such that the
///    corresponding global indices are sorted.
fn add_element_row_to_csr_row<T: Real>(
    column_indices: &[usize],
    values: &mut [T],
    col_dofs: &[usize],
    sorted_permutation: &[usize],
    element_matrix: &DMatrixView<T>,
    local_row: usize,
) {
    assert_eq!(col_dofs.len(), sorted_permutation.len());
    assert_eq!(col_dofs.len(), element_matrix.ncols());

    let mut csr_col_idx_iter = column_indices.iter().copied().enumerate();

    for &local_col in sorted_permutation {
        let global_col = col_dofs[local_col];
        let (local_csr_col_idx, _) = csr_col_idx_iter
            .find(|&(_, csr_col_idx)| csr_col_idx == global_col)
            .expect("Could not find column index associated with dof in CSR row");
        values[local_csr_col_idx] += element_matrix[(local_row, local_col)];
    }
}

/// Assembles the load vector $\int_{\Gamma} f \cdot v \, \mathrm{d}s$ over the given facets for
/// the vector P2 test space.
///
/// Uses three-point Gauss quadrature on each facet, which is exact for quadratic tractions.
pub fn assemble_facet_vector<T, F>(
    mesh: &TriangleMesh2d<T>,
    topology: &MeshTopology,
    space: &VectorP2Space,
    facets: &[usize],
    traction: F,
) -> DVector<T>
where
    T: Real,
    F: Fn(&Point2<T>) -> Vector2<T>,
{
    let half = T::one() / (T::one() + T::one());
    let (weights, points) = gauss::<T>(3);
    let mut vector = DVector::zeros(space.num_dofs());

    for &facet in facets {
        let [a, b] = topology.facets()[facet];
        let (x_a, x_b) = (mesh.vertices()[a], mesh.vertices()[b]);
        let half_length = (x_b - x_a).norm() * half;
        let nodes = space.facet_nodes(facet);

        for (&w, t) in izip!(&weights, &points) {
            let t = t.x;
            let x = Point2::from(x_a.coords * (half * (T::one() - t)) + x_b.coords * (half * (T::one() + t)));
            let f = traction(&x);
            let phi = LagrangeP2Segment.evaluate_basis(t);
            for (k, &node) in nodes.iter().enumerate() {
                for c in 0..VectorP2Space::SOLUTION_DIM {
                    vector[VectorP2Space::SOLUTION_DIM * node + c] += w * half_length * phi[k] * f[c];
                }
            }
        }
    }

    debug!("Assembled facet vector over {} facets", facets.len());
    vector
}

/// Collects the (sorted) dofs of all nodes on the given facets.
pub fn locate_dofs_topological(space: &VectorP2Space, facets: &[usize]) -> Vec<usize> {
    let mut dofs: Vec<usize> = facets
        .iter()
        .flat_map(|&facet| space.facet_nodes(facet).iter().copied())
        .flat_map(|node| (0..VectorP2Space::SOLUTION_DIM).map(move |c| VectorP2Space::SOLUTION_DIM * node + c))
        .collect();
    dofs.sort_unstable();
    dofs.dedup();
    dofs
}

/// Eliminates the given dofs from a square CSR matrix.
///
/// Rows and columns of the dofs are zeroed and their diagonal entries set to a representative
/// scale of the matrix (the magnitude of the first non-zero diagonal entry), which keeps the
/// matrix symmetric and avoids skewing its conditioning.
pub fn apply_homogeneous_dirichlet_bc_csr<T: Real>(matrix: &mut CsrMatrix<T>, dofs: &[usize]) {
    assert_eq!(matrix.nrows(), matrix.ncols(), "Matrix must be square");
    let scale = condensa_sparse::csr_diagonal(matrix)
        .iter()
        .copied()
        .find(|&x| x != T::zero())
        .map(|x| x.abs())
        .unwrap_or_else(T::one);

    // Zeroing columns naively would visit every entry of the matrix. Instead we exploit the
    // symmetric structure: if (r, c) is zeroed for a Dirichlet row r, then (c, r) must be zeroed too,
    // so row c is visited afterwards.
    let mut dirichlet_membership = vec![false; matrix.nrows()];
    let mut rows_to_visit = vec![false; matrix.nrows()];

    for &row_idx in dofs {
        dirichlet_membership[row_idx] = true;
    }

    for &row_idx in dofs {
        let mut row = matrix.row_mut(row_idx);
        let (cols, values) = row.cols_and_values_mut();
        for (&col_idx, val) in cols.iter().zip(values) {
            if col_idx == row_idx {
                *val = scale;
            } else {
                *val = T::zero();
                rows_to_visit[col_idx] = true;
            }
        }
    }

    let row_visit_iter = rows_to_visit
        .iter()
        .enumerate()
        .filter_map(|(index, &should_visit)| should_visit.then_some(index));
    for row_index in row_visit_iter {
        if !dirichlet_membership[row_index] {
            let mut row = matrix.row_mut(row_index);
            let (cols, values) = row.cols_and_values_mut();
            for (&col_idx, val) in cols.iter().zip(values) {
                if dirichlet_membership[col_idx] {
                    *val = T::zero();
                }
            }
        }
    }
}

pub fn apply_homogeneous_dirichlet_bc_rhs<'a, T>(rhs: impl Into<DVectorViewMut<'a, T>>, dofs: &[usize])
where
    T: Scalar + num::Zero,
{
    let mut rhs = rhs.into();
    for &dof in dofs {
        rhs[dof] = T::zero();
    }
}
