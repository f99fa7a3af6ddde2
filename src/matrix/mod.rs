//! Matrix module: the CRS operator and its host kernels.

pub mod sparse;
pub mod spectral;

pub use sparse::{CsrMatrix, galerkin};
pub use spectral::spectral_radius;
