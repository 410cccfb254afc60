//! Solid mechanics functionality for `condensa`.
//!
//! Only small-strain linear elasticity in two dimensions is provided. The plane stress
//! relation is the constitutive law of the mixed stress-displacement formulation, and
//! [`PlaneStressMaterial::stress_contraction`] supplies the element stiffness of the
//! equivalent pure displacement formulation.
pub mod materials;

pub use materials::{LameParameters, PlaneStressMaterial, YoungPoisson};
