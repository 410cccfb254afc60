//! Sparse matrix functionality for `condensa`.
//!
//! Matrices are stored as [`nalgebra_sparse::CsrMatrix`]. This crate adds the pieces that
//! finite element assembly and iterative solvers need on top: construction of sparsity
//! patterns from (possibly duplicated) coordinates, diagonal extraction and comparison of
//! assembled matrices.
use nalgebra::{DVector, RealField, Scalar};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use num::Zero;
use rayon::slice::ParallelSliceMut;

pub mod cg;

pub use nalgebra_sparse;

/// Builds a CSR sparsity pattern from a list of `(row, col)` coordinates.
///
/// The coordinates do not need to be sorted and may contain duplicates.
///
/// # Panics
///
/// Panics if any coordinate is out of bounds.
pub fn sparsity_pattern_from_coordinates(
    nrows: usize,
    ncols: usize,
    mut coordinates: Vec<(usize, usize)>,
) -> SparsityPattern {
    coordinates.par_sort_unstable();
    coordinates.dedup();

    let mut row_offsets = Vec::with_capacity(nrows + 1);
    let mut column_indices = Vec::with_capacity(coordinates.len());
    row_offsets.push(0);

    let mut current_row = 0;
    for (i, j) in coordinates {
        assert!(i < nrows && j < ncols, "Coordinates must be in bounds");
        // Loop to correctly handle consecutive empty rows
        while i > current_row {
            row_offsets.push(column_indices.len());
            current_row += 1;
        }
        column_indices.push(j);
    }

    // Fill out offsets for remaining empty rows
    while row_offsets.len() < nrows + 1 {
        row_offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(nrows, ncols, row_offsets, column_indices)
        .expect("Sorted and deduplicated coordinates always form a valid pattern")
}

/// Creates a CSR matrix with the given pattern and all explicitly stored entries set to zero.
pub fn zeroed_csr_from_pattern<T: Scalar + Zero>(pattern: SparsityPattern) -> CsrMatrix<T> {
    let values = vec![T::zero(); pattern.nnz()];
    CsrMatrix::try_from_pattern_and_values(pattern, values)
        .expect("Number of values always matches the pattern")
}

/// Returns the diagonal of a square CSR matrix, with zeros for entries that are not stored.
pub fn csr_diagonal<T: Scalar + Zero>(matrix: &CsrMatrix<T>) -> DVector<T> {
    assert_eq!(matrix.nrows(), matrix.ncols(), "Matrix must be square");
    DVector::from_fn(matrix.nrows(), |i, _| {
        let row = matrix.row(i);
        row.col_indices()
            .binary_search(&i)
            .map(|local_idx| row.values()[local_idx].clone())
            .unwrap_or_else(|_| T::zero())
    })
}

/// Computes the Frobenius norm `|| a - b ||_F` of the difference of two CSR matrices.
///
/// Entries that are stored in only one of the matrices are compared against zero.
///
/// # Panics
///
/// Panics if the matrices have different dimensions.
pub fn frobenius_norm_of_difference<T: RealField + Copy>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> T {
    assert_eq!(a.nrows(), b.nrows(), "Matrices must have the same number of rows");
    assert_eq!(a.ncols(), b.ncols(), "Matrices must have the same number of columns");

    let mut sum = T::zero();
    for (row_a, row_b) in a.row_iter().zip(b.row_iter()) {
        let (cols_a, vals_a) = (row_a.col_indices(), row_a.values());
        let (cols_b, vals_b) = (row_b.col_indices(), row_b.values());
        let (mut i, mut j) = (0, 0);
        // Merge the two sorted rows
        while i < cols_a.len() || j < cols_b.len() {
            let col_a = cols_a.get(i).copied().unwrap_or(usize::MAX);
            let col_b = cols_b.get(j).copied().unwrap_or(usize::MAX);
            let diff = if col_a == col_b {
                i += 1;
                j += 1;
                vals_a[i - 1] - vals_b[j - 1]
            } else if col_a < col_b {
                i += 1;
                vals_a[i - 1]
            } else {
                j += 1;
                -vals_b[j - 1]
            };
            sum += diff * diff;
        }
    }
    sum.sqrt()
}

/// Computes the Frobenius norm of a CSR matrix.
pub fn frobenius_norm<T: RealField + Copy>(matrix: &CsrMatrix<T>) -> T {
    matrix
        .values()
        .iter()
        .fold(T::zero(), |acc, &v| acc + v * v)
        .sqrt()
}
