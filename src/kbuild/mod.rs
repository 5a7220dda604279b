//! Path resolution from user-supplied compilation units to canonical
//! Kbuild keys.

pub mod resolve;

pub use resolve::resolve_cu;
pub(crate) use resolve::force_o_extension;
