//! Core traits shared by every layer.

pub mod traits;
pub use traits::{Scalar, cast};
