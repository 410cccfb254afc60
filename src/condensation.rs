//! Static condensation of element blocks.
//!
//! A mixed element system with an internal field $\sigma$ and a primary field $u$ reads
//! $$
//! \begin{pmatrix} A_{ii} & A_{ip} \\\\ A_{pi} & A_{pp} \end{pmatrix}
//! \begin{pmatrix} \sigma \\\\ u \end{pmatrix}
//! = \begin{pmatrix} 0 \\\\ b \end{pmatrix}.
//! $$
//! When $A_{ii}$ is invertible on every element, $\sigma$ can be eliminated element by element,
//! leaving the condensed element matrix $-A_{pi} A_{ii}^{-1} A_{ip}$ in the degrees of freedom of
//! $u$ alone (for formulations with $A_{pp} = 0$).
//!
//! The routines here are stateless and re-entrant. They are generic over
//! [`ComplexField`], so real and complex scalars share the same code path.
use nalgebra::{convert, ComplexField, DMatrix, DMatrixView, DMatrixViewMut, RealField};
use num::Zero;
use std::error::Error;
use std::fmt;

/// Identifies one of the matrix blocks taking part in a condensation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Block {
    /// The internal block $A_{ii}$.
    Internal,
    /// The coupling $A_{ip}$ from the primary field into the internal equations.
    InternalPrimary,
    /// The coupling $A_{pi}$ from the internal field into the primary equations.
    PrimaryInternal,
    /// The buffer receiving the condensed matrix.
    Output,
}

impl Block {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Internal => "A_ii",
            Self::InternalPrimary => "A_ip",
            Self::PrimaryInternal => "A_pi",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The way in which the condensation failed numerically.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SingularityKind {
    /// A coupling block contains non-finite entries.
    NonFiniteCoupling { block: Block },
    /// The LU factorization encountered an exactly zero pivot in the given column.
    ZeroPivot { column: usize },
    /// The LU factorization produced a non-finite pivot in the given column.
    NonFinitePivot { column: usize },
    /// The ratio of the smallest to the largest pivot magnitude is below the pivot tolerance.
    IllConditioned,
    /// The condensed matrix contains non-finite entries.
    NonFiniteResult,
}

impl fmt::Display for SingularityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteCoupling { block } => write!(f, "block {} has non-finite entries", block),
            Self::ZeroPivot { column } => write!(f, "A_ii has a zero pivot in column {}", column),
            Self::NonFinitePivot { column } => write!(f, "A_ii has a non-finite pivot in column {}", column),
            Self::IllConditioned => write!(f, "A_ii pivot ratio below tolerance"),
            Self::NonFiniteResult => write!(f, "condensed matrix has non-finite entries"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CondensationErrorKind {
    /// A block does not have the shape implied by the other blocks.
    ContractViolation {
        block: Block,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// The internal block is singular or too ill-conditioned to invert, or the
    /// condensation otherwise produced non-finite values.
    NumericalSingularity(SingularityKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondensationError {
    kind: CondensationErrorKind,
    element: Option<usize>,
}

impl CondensationError {
    pub fn contract_violation(block: Block, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self {
            kind: CondensationErrorKind::ContractViolation {
                block,
                expected,
                actual,
            },
            element: None,
        }
    }

    pub fn numerical_singularity(kind: SingularityKind) -> Self {
        Self {
            kind: CondensationErrorKind::NumericalSingularity(kind),
            element: None,
        }
    }

    /// Attaches the index of the element on which the error occurred.
    pub fn with_element(self, element: usize) -> Self {
        Self {
            element: Some(element),
            ..self
        }
    }

    pub fn kind(&self) -> &CondensationErrorKind {
        &self.kind
    }

    pub fn element(&self) -> Option<usize> {
        self.element
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self.kind, CondensationErrorKind::ContractViolation { .. })
    }

    pub fn is_numerical_singularity(&self) -> bool {
        matches!(self.kind, CondensationErrorKind::NumericalSingularity(_))
    }
}

impl fmt::Display for CondensationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CondensationErrorKind::ContractViolation {
                block,
                expected,
                actual,
            } => write!(
                f,
                "contract violation: block {} has shape {}x{}, expected {}x{}",
                block, actual.0, actual.1, expected.0, expected.1
            )?,
            CondensationErrorKind::NumericalSingularity(kind) => {
                write!(f, "numerical singularity: {}", kind)?
            }
        }
        if let Some(element) = self.element {
            write!(f, " (element {})", element)?;
        }
        Ok(())
    }
}

impl Error for CondensationError {}

/// Settings controlling the singularity detection of the condensation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CondensationSettings<R> {
    /// Minimum admissible ratio between the smallest and largest pivot magnitude.
    ///
    /// Defaults to $n_i \epsilon$, where $\epsilon$ is the double precision machine epsilon.
    pub pivot_tolerance: Option<R>,
}

impl<R> Default for CondensationSettings<R> {
    fn default() -> Self {
        Self { pivot_tolerance: None }
    }
}

impl<R: RealField> CondensationSettings<R> {
    pub fn with_pivot_tolerance(tolerance: R) -> Self {
        Self {
            pivot_tolerance: Some(tolerance),
        }
    }

    fn effective_pivot_tolerance(&self, n_i: usize) -> R {
        match &self.pivot_tolerance {
            Some(tol) => tol.clone(),
            None => convert::<f64, R>(n_i as f64 * f64::EPSILON),
        }
    }

    /// Computes `-A_pi * inv(A_ii) * A_ip`.
    pub fn condense<'a, T>(
        &self,
        a_ii: impl Into<DMatrixView<'a, T>>,
        a_ip: impl Into<DMatrixView<'a, T>>,
        a_pi: impl Into<DMatrixView<'a, T>>,
    ) -> Result<DMatrix<T>, CondensationError>
    where
        T: ComplexField<RealField = R>,
    {
        let a_ip = a_ip.into();
        let n_p = a_ip.ncols();
        let mut output = DMatrix::zeros(n_p, n_p);
        self.condense_into(&mut output, a_ii, a_ip, a_pi)?;
        Ok(output)
    }

    /// Computes `-A_pi * inv(A_ii) * A_ip` and stores the result in the provided `n_p x n_p`
    /// output buffer.
    ///
    /// All shapes are validated before any arithmetic is performed. On error, the contents of
    /// `output` are unspecified.
    pub fn condense_into<'a, 'b, T>(
        &self,
        output: impl Into<DMatrixViewMut<'b, T>>,
        a_ii: impl Into<DMatrixView<'a, T>>,
        a_ip: impl Into<DMatrixView<'a, T>>,
        a_pi: impl Into<DMatrixView<'a, T>>,
    ) -> Result<(), CondensationError>
    where
        T: ComplexField<RealField = R>,
    {
        let mut output = output.into();
        let a_ii = a_ii.into();
        let a_ip = a_ip.into();
        let a_pi = a_pi.into();

        let n_i = a_ii.nrows();
        let n_p = a_ip.ncols();
        check_shape(Block::Internal, (n_i, n_i), a_ii.shape())?;
        check_shape(Block::InternalPrimary, (n_i, n_p), a_ip.shape())?;
        check_shape(Block::PrimaryInternal, (n_p, n_i), a_pi.shape())?;
        check_shape(Block::Output, (n_p, n_p), output.shape())?;

        if n_i == 0 {
            output.fill(T::zero());
            return Ok(());
        }

        check_finite(Block::InternalPrimary, &a_ip)?;
        check_finite(Block::PrimaryInternal, &a_pi)?;

        let lu = a_ii.clone_owned().lu();
        check_pivots(&lu.u(), self.effective_pivot_tolerance(n_i))?;

        // X = inv(A_ii) * A_ip
        let mut x = a_ip.clone_owned();
        if !lu.solve_mut(&mut x) {
            return Err(CondensationError::numerical_singularity(SingularityKind::IllConditioned));
        }

        output.fill(T::zero());
        output.gemm(-T::one(), &a_pi, &x, T::zero());

        if output.iter().all(|v_ij| v_ij.is_finite()) {
            Ok(())
        } else {
            Err(CondensationError::numerical_singularity(SingularityKind::NonFiniteResult))
        }
    }
}

/// Computes the condensed matrix `-A_pi * inv(A_ii) * A_ip` with default settings.
///
/// # Errors
///
/// Returns a contract violation if the block shapes are inconsistent, and a numerical
/// singularity if `A_ii` cannot be reliably inverted.
pub fn condense<'a, T>(
    a_ii: impl Into<DMatrixView<'a, T>>,
    a_ip: impl Into<DMatrixView<'a, T>>,
    a_pi: impl Into<DMatrixView<'a, T>>,
) -> Result<DMatrix<T>, CondensationError>
where
    T: ComplexField,
{
    CondensationSettings::default().condense(a_ii, a_ip, a_pi)
}

/// Same as [`condense`], but writes the result into a caller-owned buffer.
pub fn condense_into<'a, 'b, T>(
    output: impl Into<DMatrixViewMut<'b, T>>,
    a_ii: impl Into<DMatrixView<'a, T>>,
    a_ip: impl Into<DMatrixView<'a, T>>,
    a_pi: impl Into<DMatrixView<'a, T>>,
) -> Result<(), CondensationError>
where
    T: ComplexField,
{
    CondensationSettings::default().condense_into(output, a_ii, a_ip, a_pi)
}

fn check_shape(block: Block, expected: (usize, usize), actual: (usize, usize)) -> Result<(), CondensationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CondensationError::contract_violation(block, expected, actual))
    }
}

fn check_finite<T: ComplexField>(block: Block, matrix: &DMatrixView<'_, T>) -> Result<(), CondensationError> {
    if matrix.iter().all(|v_ij| v_ij.is_finite()) {
        Ok(())
    } else {
        Err(CondensationError::numerical_singularity(SingularityKind::NonFiniteCoupling { block }))
    }
}

fn check_pivots<T: ComplexField>(u: &DMatrix<T>, tolerance: T::RealField) -> Result<(), CondensationError> {
    let mut min_pivot = None;
    let mut max_pivot = T::RealField::zero();
    for (column, pivot) in u.diagonal().iter().enumerate() {
        let magnitude = pivot.clone().modulus();
        if !magnitude.is_finite() {
            return Err(CondensationError::numerical_singularity(SingularityKind::NonFinitePivot {
                column,
            }));
        }
        if magnitude.is_zero() {
            return Err(CondensationError::numerical_singularity(SingularityKind::ZeroPivot { column }));
        }
        min_pivot = Some(match min_pivot {
            Some(current) if current < magnitude => current,
            _ => magnitude.clone(),
        });
        max_pivot = max_pivot.max(magnitude);
    }

    match min_pivot {
        Some(min_pivot) if min_pivot < tolerance * max_pivot => Err(
            CondensationError::numerical_singularity(SingularityKind::IllConditioned),
        ),
        _ => Ok(()),
    }
}
