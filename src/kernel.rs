//! Element tensor providers.
//!
//! An [`ElementTensorProvider`] tabulates the local matrix of a bilinear form on a single cell.
//! The kernels in this module implement the blocks of the mixed stress-displacement formulation
//! of plane stress elasticity,
//! $$
//! \begin{aligned}
//! a_{00}(\sigma, \tau) &= \int_K \sigma : \tau \, \mathrm{d}x, &
//! a_{01}(u, \tau) &= -\int_K \sigma_u(u) : \tau \, \mathrm{d}x, \\\\
//! a_{10}(\sigma, v) &= -\int_K \sigma : \nabla v \, \mathrm{d}x, &
//! a(u, v) &= -\int_K \sigma_u(u) : \nabla v \, \mathrm{d}x,
//! \end{aligned}
//! $$
//! with symmetric DG1 stresses $\sigma, \tau$ and CG2 vector displacements $u, v$, together with
//! [`CondensedKernel`], which composes three block providers into the condensed operator
//! $-A_{10} A_{00}^{-1} A_{01}$.
//!
//! Local row and column indices follow the dof layouts of
//! [`SymmetricTensorDg1Space`](crate::space::SymmetricTensorDg1Space) (`3 * node + component`) and
//! [`VectorP2Space`](crate::space::VectorP2Space) (`2 * node + component`).
use crate::condensation::{Block, CondensationError, CondensationSettings};
use crate::element::{AffineTriangle, LagrangeP1, LagrangeP2};
use crate::quadrature::{triangle, QuadraturePair2d};
use crate::solid::PlaneStressMaterial;
use crate::Real;
use itertools::izip;
use nalgebra::{DMatrix, DMatrixViewMut, Matrix2, Point2, Scalar, Vector2};
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use thread_local::ThreadLocal;

/// Auxiliary per-cell information that is passed through to kernels unchanged.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellMetadata {
    /// Index of the local entity (e.g. facet) being integrated over, if any.
    pub local_entity_index: Option<usize>,
    /// Encoded permutation and reflection flags of the cell entities.
    pub permutation_info: u32,
}

/// Everything a kernel needs to know about the cell it tabulates.
#[derive(Debug, Clone, PartialEq)]
pub struct CellData<'a, T: Scalar> {
    pub index: usize,
    pub vertices: [Point2<T>; 3],
    pub coefficients: &'a [T],
    pub metadata: CellMetadata,
}

impl<'a, T: Scalar> CellData<'a, T> {
    pub fn new(index: usize, vertices: [Point2<T>; 3]) -> Self {
        Self {
            index,
            vertices,
            coefficients: &[],
            metadata: CellMetadata::default(),
        }
    }

    pub fn with_coefficients(self, coefficients: &'a [T]) -> Self {
        Self { coefficients, ..self }
    }

    pub fn with_metadata(self, metadata: CellMetadata) -> Self {
        Self { metadata, ..self }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TabulationError {
    /// The cell has zero (or non-finite) area.
    DegenerateCell { cell: usize },
    /// The output buffer does not have the shape of the element tensor.
    OutputShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    Condensation(CondensationError),
}

impl fmt::Display for TabulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateCell { cell } => write!(f, "cell {} is degenerate", cell),
            Self::OutputShape { expected, actual } => write!(
                f,
                "output buffer has shape {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::Condensation(err) => write!(f, "condensation failed: {}", err),
        }
    }
}

impl Error for TabulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Condensation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CondensationError> for TabulationError {
    fn from(err: CondensationError) -> Self {
        Self::Condensation(err)
    }
}

/// Tabulates the local element tensor of a bilinear form.
pub trait ElementTensorProvider<T: Real>: Send + Sync {
    /// The `(rows, cols)` shape of the element tensor, i.e. the local dimensions of the test and
    /// trial spaces.
    fn tensor_shape(&self) -> (usize, usize);

    /// Writes the element tensor of the given cell into `output`, overwriting its contents.
    fn tabulate_into(&self, cell: &CellData<T>, output: DMatrixViewMut<T>) -> Result<(), TabulationError>;

    fn tabulate(&self, cell: &CellData<T>) -> Result<DMatrix<T>, TabulationError> {
        let (rows, cols) = self.tensor_shape();
        let mut output = DMatrix::zeros(rows, cols);
        self.tabulate_into(cell, (&mut output).into())?;
        Ok(output)
    }
}

impl<'a, T, K> ElementTensorProvider<T> for &'a K
where
    T: Real,
    K: ElementTensorProvider<T> + ?Sized,
{
    fn tensor_shape(&self) -> (usize, usize) {
        K::tensor_shape(self)
    }

    fn tabulate_into(&self, cell: &CellData<T>, output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        K::tabulate_into(self, cell, output)
    }
}

impl<T, K> ElementTensorProvider<T> for Arc<K>
where
    T: Real,
    K: ElementTensorProvider<T> + ?Sized,
{
    fn tensor_shape(&self) -> (usize, usize) {
        K::tensor_shape(self)
    }

    fn tabulate_into(&self, cell: &CellData<T>, output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        K::tabulate_into(self, cell, output)
    }
}

fn check_output_shape<T: Scalar>(output: &DMatrixViewMut<T>, expected: (usize, usize)) -> Result<(), TabulationError> {
    if output.shape() == expected {
        Ok(())
    } else {
        Err(TabulationError::OutputShape {
            expected,
            actual: output.shape(),
        })
    }
}

/// Returns $|\det J|$ and $J^{-T}$ for the cell.
fn cell_geometry<T: Real>(cell: &CellData<T>) -> Result<(T, Matrix2<T>), TabulationError> {
    let triangle = AffineTriangle::from_vertices(cell.vertices);
    let det = triangle.determinant();
    let degenerate = TabulationError::DegenerateCell { cell: cell.index };
    if det == T::zero() || !det.is_finite() {
        return Err(degenerate);
    }
    let inv_t = triangle.inverse_transpose().ok_or(degenerate)?;
    Ok((det.abs(), inv_t))
}

/// The basis $E_{xx}, E_{yy}, E_{xy}$ of symmetric 2x2 tensors, with
/// $E_{xy} = e_x \otimes e_y + e_y \otimes e_x$.
fn symmetric_tensor_basis<T: Real>(component: usize) -> Matrix2<T> {
    let (zero, one) = (T::zero(), T::one());
    match component {
        0 => Matrix2::new(one, zero, zero, zero),
        1 => Matrix2::new(zero, zero, zero, one),
        2 => Matrix2::new(zero, one, one, zero),
        _ => panic!("Symmetric tensors in 2D have three components"),
    }
}

/// Gradients of the P2 basis functions at `xi` in physical coordinates, one per column.
fn physical_p2_gradients<T: Real>(inv_t: &Matrix2<T>, xi: &Point2<T>) -> [Vector2<T>; 6] {
    let ref_gradients = LagrangeP2.gradients(xi);
    let gradients = inv_t * ref_gradients;
    std::array::from_fn(|i| gradients.column(i).into_owned())
}

/// A degree 2 rule integrates every block exactly on affine cells.
fn default_quadrature<T: Real>() -> QuadraturePair2d<T> {
    triangle(2).expect("Triangle rule of strength 2 is always available")
}

const STRESS_DIM: usize = 9;
const DISPLACEMENT_DIM: usize = 12;

/// The DG1 stress mass matrix $a_{00}(\sigma, \tau) = \int_K \sigma : \tau$.
#[derive(Debug, Clone)]
pub struct StressMassKernel<T: Scalar> {
    quadrature: QuadraturePair2d<T>,
}

impl<T: Real> StressMassKernel<T> {
    pub fn new() -> Self {
        Self {
            quadrature: default_quadrature(),
        }
    }
}

impl<T: Real> Default for StressMassKernel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> ElementTensorProvider<T> for StressMassKernel<T> {
    fn tensor_shape(&self) -> (usize, usize) {
        (STRESS_DIM, STRESS_DIM)
    }

    fn tabulate_into(&self, cell: &CellData<T>, mut output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        check_output_shape(&output, self.tensor_shape())?;
        output.fill(T::zero());
        let (det, _) = cell_geometry(cell)?;
        let norms: [T; 3] = std::array::from_fn(|c| {
            let e_c = symmetric_tensor_basis::<T>(c);
            e_c.dot(&e_c)
        });

        let (weights, points) = &self.quadrature;
        for (&w, xi) in izip!(weights, points) {
            let psi = LagrangeP1.evaluate_basis(xi);
            for a in 0..3 {
                for b in 0..3 {
                    let m_ab = w * det * psi[a] * psi[b];
                    for c in 0..3 {
                        output[(3 * a + c, 3 * b + c)] += m_ab * norms[c];
                    }
                }
            }
        }
        Ok(())
    }
}

/// The coupling $a_{01}(u, \tau) = -\int_K \sigma_u(u) : \tau$.
#[derive(Debug, Clone)]
pub struct StrainStressKernel<T: Scalar> {
    material: PlaneStressMaterial<T>,
    quadrature: QuadraturePair2d<T>,
}

impl<T: Real> StrainStressKernel<T> {
    pub fn new(material: PlaneStressMaterial<T>) -> Self {
        Self {
            material,
            quadrature: default_quadrature(),
        }
    }
}

impl<T: Real> ElementTensorProvider<T> for StrainStressKernel<T> {
    fn tensor_shape(&self) -> (usize, usize) {
        (STRESS_DIM, DISPLACEMENT_DIM)
    }

    fn tabulate_into(&self, cell: &CellData<T>, mut output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        check_output_shape(&output, self.tensor_shape())?;
        output.fill(T::zero());
        let (det, inv_t) = cell_geometry(cell)?;

        let (weights, points) = &self.quadrature;
        for (&w, xi) in izip!(weights, points) {
            let psi = LagrangeP1.evaluate_basis(xi);
            let grad_phi = physical_p2_gradients(&inv_t, xi);
            for (b, g_b) in grad_phi.iter().enumerate() {
                for m in 0..2 {
                    let grad_u = Vector2::ith(m, T::one()) * g_b.transpose();
                    let sigma = self.material.stress_from_displacement_gradient(&grad_u);
                    for c in 0..3 {
                        let sigma_tau = sigma.dot(&symmetric_tensor_basis(c));
                        for a in 0..3 {
                            output[(3 * a + c, 2 * b + m)] -= w * det * psi[a] * sigma_tau;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// The coupling $a_{10}(\sigma, v) = -\int_K \sigma : \nabla v$.
#[derive(Debug, Clone)]
pub struct StressDivergenceKernel<T: Scalar> {
    quadrature: QuadraturePair2d<T>,
}

impl<T: Real> StressDivergenceKernel<T> {
    pub fn new() -> Self {
        Self {
            quadrature: default_quadrature(),
        }
    }
}

impl<T: Real> Default for StressDivergenceKernel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> ElementTensorProvider<T> for StressDivergenceKernel<T> {
    fn tensor_shape(&self) -> (usize, usize) {
        (DISPLACEMENT_DIM, STRESS_DIM)
    }

    fn tabulate_into(&self, cell: &CellData<T>, mut output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        check_output_shape(&output, self.tensor_shape())?;
        output.fill(T::zero());
        let (det, inv_t) = cell_geometry(cell)?;

        let (weights, points) = &self.quadrature;
        for (&w, xi) in izip!(weights, points) {
            let psi = LagrangeP1.evaluate_basis(xi);
            let grad_phi = physical_p2_gradients(&inv_t, xi);
            for d in 0..3 {
                let e_d = symmetric_tensor_basis::<T>(d);
                for (a, g_a) in grad_phi.iter().enumerate() {
                    for l in 0..2 {
                        // E_d : (e_l ⊗ grad phi_a)
                        let contraction = e_d.row(l).transpose().dot(g_a);
                        for b in 0..3 {
                            output[(2 * a + l, 3 * b + d)] -= w * det * psi[b] * contraction;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// The pure displacement form $a(u, v) = -\int_K \sigma_u(u) : \nabla v$.
#[derive(Debug, Clone)]
pub struct DisplacementStiffnessKernel<T: Scalar> {
    material: PlaneStressMaterial<T>,
    quadrature: QuadraturePair2d<T>,
}

impl<T: Real> DisplacementStiffnessKernel<T> {
    pub fn new(material: PlaneStressMaterial<T>) -> Self {
        Self {
            material,
            quadrature: default_quadrature(),
        }
    }
}

impl<T: Real> ElementTensorProvider<T> for DisplacementStiffnessKernel<T> {
    fn tensor_shape(&self) -> (usize, usize) {
        (DISPLACEMENT_DIM, DISPLACEMENT_DIM)
    }

    fn tabulate_into(&self, cell: &CellData<T>, mut output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        check_output_shape(&output, self.tensor_shape())?;
        output.fill(T::zero());
        let (det, inv_t) = cell_geometry(cell)?;

        let (weights, points) = &self.quadrature;
        for (&w, xi) in izip!(weights, points) {
            let grad_phi = physical_p2_gradients(&inv_t, xi);
            for (a, g_a) in grad_phi.iter().enumerate() {
                for (b, g_b) in grad_phi.iter().enumerate() {
                    let block = self.material.stress_contraction(g_a, g_b) * (w * det);
                    let mut output_block = output.fixed_view_mut::<2, 2>(2 * a, 2 * b);
                    output_block -= block;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct CondensationScratch<T: Scalar> {
    a00: DMatrix<T>,
    a01: DMatrix<T>,
    a10: DMatrix<T>,
}

impl<T: Real> Default for CondensationScratch<T> {
    fn default() -> Self {
        Self {
            a00: DMatrix::zeros(0, 0),
            a01: DMatrix::zeros(0, 0),
            a10: DMatrix::zeros(0, 0),
        }
    }
}

/// Tabulates the condensed element tensor $-A_{10} A_{00}^{-1} A_{01}$ from three block providers.
///
/// The block tensors are tabulated into per-thread scratch buffers, so the kernel can be shared
/// between assembly threads. All block providers receive the same [`CellData`].
pub struct CondensedKernel<T: Real + Send, A00, A01, A10> {
    a00: A00,
    a01: A01,
    a10: A10,
    settings: CondensationSettings<T>,
    scratch: ThreadLocal<RefCell<CondensationScratch<T>>>,
}

impl<T, A00, A01, A10> CondensedKernel<T, A00, A01, A10>
where
    T: Real + Send,
    A00: ElementTensorProvider<T>,
    A01: ElementTensorProvider<T>,
    A10: ElementTensorProvider<T>,
{
    /// Composes the condensed kernel, checking that the block shapes are consistent.
    pub fn new(a00: A00, a01: A01, a10: A10) -> Result<Self, CondensationError> {
        let (n_i, cols_00) = a00.tensor_shape();
        let (rows_01, n_p) = a01.tensor_shape();
        let check = |block, expected, actual| {
            if expected == actual {
                Ok(())
            } else {
                Err(CondensationError::contract_violation(block, expected, actual))
            }
        };
        check(Block::Internal, (n_i, n_i), (n_i, cols_00))?;
        check(Block::InternalPrimary, (n_i, n_p), (rows_01, n_p))?;
        check(Block::PrimaryInternal, (n_p, n_i), a10.tensor_shape())?;

        Ok(Self {
            a00,
            a01,
            a10,
            settings: CondensationSettings::default(),
            scratch: ThreadLocal::new(),
        })
    }

    pub fn with_settings(self, settings: CondensationSettings<T>) -> Self {
        Self { settings, ..self }
    }

    pub fn settings(&self) -> &CondensationSettings<T> {
        &self.settings
    }
}

impl<T, A00, A01, A10> ElementTensorProvider<T> for CondensedKernel<T, A00, A01, A10>
where
    T: Real + Send,
    A00: ElementTensorProvider<T>,
    A01: ElementTensorProvider<T>,
    A10: ElementTensorProvider<T>,
{
    fn tensor_shape(&self) -> (usize, usize) {
        let n_p = self.a01.tensor_shape().1;
        (n_p, n_p)
    }

    fn tabulate_into(&self, cell: &CellData<T>, output: DMatrixViewMut<T>) -> Result<(), TabulationError> {
        check_output_shape(&output, self.tensor_shape())?;
        let scratch = &mut *self.scratch.get_or_default().borrow_mut();

        let (n_i, n_p) = self.a01.tensor_shape();
        scratch.a00.resize_mut(n_i, n_i, T::zero());
        scratch.a01.resize_mut(n_i, n_p, T::zero());
        scratch.a10.resize_mut(n_p, n_i, T::zero());
        self.a00.tabulate_into(cell, (&mut scratch.a00).into())?;
        self.a01.tabulate_into(cell, (&mut scratch.a01).into())?;
        self.a10.tabulate_into(cell, (&mut scratch.a10).into())?;

        self.settings
            .condense_into(output, &scratch.a00, &scratch.a01, &scratch.a10)
            .map_err(|err| TabulationError::Condensation(err.with_element(cell.index)))
    }
}
