use nalgebra::{Matrix2, RealField, Vector2};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl<T> From<YoungPoisson<T>> for LameParameters<T>
where
    T: RealField + Copy,
{
    /// Three-dimensional Lamé parameters.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn from(params: YoungPoisson<T>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

/// Isotropic linear elasticity under the plane stress assumption.
///
/// With the infinitesimal strain $\vec \epsilon(\vec u) = \frac{1}{2}(\nabla \vec u + \nabla \vec u^T)$,
/// the stress is
/// $$
/// \vec \sigma(\vec \epsilon) = \frac{E}{1 - \nu^2} \left[ (1 - \nu) \vec \epsilon
///     + \nu \operatorname{tr}(\vec \epsilon) \vec I \right]
///   = 2 \mu \vec \epsilon + \lambda^* \operatorname{tr}(\vec \epsilon) \vec I,
/// $$
/// where $\lambda^* = E \nu / (1 - \nu^2)$ is the effective plane stress Lamé parameter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneStressMaterial<T> {
    young: T,
    poisson: T,
}

impl<T> PlaneStressMaterial<T>
where
    T: RealField + Copy,
{
    /// Creates a plane stress material.
    ///
    /// # Panics
    ///
    /// Panics unless `young > 0` and `-1 < poisson < 1`, which is required for the
    /// constitutive relation to be well defined.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn new(young: T, poisson: T) -> Self {
        assert!(young > 0.0, "Young's modulus must be positive");
        assert!(poisson > -1.0 && poisson < 1.0, "Poisson ratio must be in (-1, 1)");
        Self { young, poisson }
    }

    pub fn young(&self) -> T {
        self.young
    }

    pub fn poisson(&self) -> T {
        self.poisson
    }

    /// The Lamé parameters $(\mu, \lambda^*)$ governing the plane stress relation.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn lame_parameters(&self) -> LameParameters<T> {
        let (e, nu) = (self.young, self.poisson);
        LameParameters {
            mu: 0.5 * e / (1.0 + nu),
            lambda: e * nu / (1.0 - nu * nu),
        }
    }

    /// Computes the stress tensor associated with the given (symmetric) strain tensor.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn stress(&self, strain: &Matrix2<T>) -> Matrix2<T> {
        let (e, nu) = (self.young, self.poisson);
        let scale = e / (1.0 - nu * nu);
        (strain * (1.0 - nu) + Matrix2::identity() * (nu * strain.trace())) * scale
    }

    /// Computes the stress tensor associated with the displacement gradient
    /// $(\nabla \vec u)_{ij} = \partial u_i / \partial x_j$.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn stress_from_displacement_gradient(&self, displacement_gradient: &Matrix2<T>) -> Matrix2<T> {
        let strain = (displacement_gradient + displacement_gradient.transpose()) * 0.5;
        self.stress(&strain)
    }

    /// Computes the stress contraction
    /// $$
    /// \mathcal{C}(\vec a, \vec b) = \mu \left[ (\vec a \cdot \vec b) \vec I + \vec b \vec a^T \right]
    ///     + \lambda^* \vec a \vec b^T,
    /// $$
    /// whose entry $(l, m)$ equals $\vec \sigma(\vec e_m \otimes \vec b) : (\vec e_l \otimes \vec a)$.
    ///
    /// With $\vec a = \nabla \phi_I$ and $\vec b = \nabla \phi_J$, this is the $2 \times 2$
    /// block coupling nodes $I$ and $J$ in the stiffness matrix.
    pub fn stress_contraction(&self, a: &Vector2<T>, b: &Vector2<T>) -> Matrix2<T> {
        let LameParameters { mu, lambda } = self.lame_parameters();
        (Matrix2::identity() * a.dot(b) + b * a.transpose()) * mu + a * b.transpose() * lambda
    }
}
