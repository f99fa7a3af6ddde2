//! Runtime configuration: the dotted-path parameter store and the component
//! selectors it is parsed into.

pub mod options;
pub mod params;

pub use options::{CoarseningKind, RelaxationKind, SolverKind};
pub use params::ParamStore;
