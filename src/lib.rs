//! Element-level static condensation for mixed finite element formulations.
//!
//! The core of the crate is [`condensation`], which eliminates an internal field from a
//! mixed element system through a local Schur complement. The remaining modules provide
//! just enough finite element machinery to exercise it on Cook's plane stress membrane:
//! meshes, Lagrange bases, function spaces, element kernels, global assembly, boundary
//! conditions and point evaluation.
use nalgebra::RealField;

pub mod assembly;
pub mod condensation;
pub mod cook;
pub mod element;
pub mod evaluate;
pub mod kernel;
pub mod mesh;
pub mod parameters;
pub mod quadrature;
pub mod registry;
pub mod space;

pub mod solid {
    pub use condensa_solid::*;
}

pub mod sparse {
    pub use condensa_sparse::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Scalar type used throughout the real-valued finite element machinery.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
