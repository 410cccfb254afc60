//! Explicit registry of element kernels.
//!
//! A [`KernelRegistry`] maps the identity of a weak form to the provider that tabulates its
//! element tensors. It is populated once during setup and passed to assembly by reference.
use crate::kernel::ElementTensorProvider;
use crate::Real;
use rustc_hash::FxHashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Identity of a weak form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(String);

impl FormId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FormId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FormId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateForm(FormId),
    UnknownForm(FormId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateForm(id) => write!(f, "a kernel for form \"{}\" is already registered", id),
            Self::UnknownForm(id) => write!(f, "no kernel registered for form \"{}\"", id),
        }
    }
}

impl Error for RegistryError {}

pub type SharedKernel<T> = Arc<dyn ElementTensorProvider<T>>;

pub struct KernelRegistry<T: Real> {
    kernels: FxHashMap<FormId, SharedKernel<T>>,
}

impl<T: Real> Default for KernelRegistry<T> {
    fn default() -> Self {
        Self {
            kernels: FxHashMap::default(),
        }
    }
}

impl<T: Real> fmt::Debug for KernelRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("forms", &self.form_ids())
            .finish()
    }
}

impl<T: Real> KernelRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kernel for the given form.
    ///
    /// # Errors
    ///
    /// Returns an error if a kernel is already registered for the form.
    pub fn insert(&mut self, id: impl Into<FormId>, kernel: SharedKernel<T>) -> Result<(), RegistryError> {
        let id = id.into();
        if self.kernels.contains_key(&id) {
            return Err(RegistryError::DuplicateForm(id));
        }
        self.kernels.insert(id, kernel);
        Ok(())
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_kernel(
        mut self,
        id: impl Into<FormId>,
        kernel: impl ElementTensorProvider<T> + 'static,
    ) -> Result<Self, RegistryError> {
        self.insert(id, Arc::new(kernel))?;
        Ok(self)
    }

    pub fn get(&self, id: &FormId) -> Result<&SharedKernel<T>, RegistryError> {
        self.kernels
            .get(id)
            .ok_or_else(|| RegistryError::UnknownForm(id.clone()))
    }

    pub fn contains(&self, id: &FormId) -> bool {
        self.kernels.contains_key(id)
    }

    /// Registered form ids in sorted order.
    pub fn form_ids(&self) -> Vec<&FormId> {
        let mut ids: Vec<_> = self.kernels.keys().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}
