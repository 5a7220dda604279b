//! Formula representation and storage.

pub mod ast;
pub mod store;

pub use ast::Formula;
pub use store::{FormulaStore, KconfigBundle};
