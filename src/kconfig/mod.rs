//! Kconfig semantic inputs: the type/visibility extract and the
//! per-architecture clause bundle, which lives in [`crate::formula`].

pub mod extract;

pub use extract::KconfigExtract;
