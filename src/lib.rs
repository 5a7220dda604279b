//! A Linux kernel build-configuration synthesis engine.
//!
//! Combines two independent symbolic models of the kernel build — the
//! Kbuild presence-condition formulas that say which `CONFIG_*` state
//! compiles a given object file, and the Kconfig semantic constraints
//! that capture option types, defaults, visibility, and inter-option
//! dependencies — and solves their conjunction with an SMT backend. From
//! a satisfying assignment it emits a kernel `.config`.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!     │
//!     ├── Path resolver       (kbuild::resolve)   user CU -> canonical Kbuild key
//!     ├── Architecture profile (arch)              per-arch literal bundle
//!     ├── Kconfig extract     (kconfig)            option types/visibility
//!     ├── Formula store       (formula)            Kbuild/Kconfig formula cache
//!     ├── Constraint composer (compose)            flattens everything to one problem
//!     ├── Solver driver       (solver)             drives an external SMT-LIB2 solver
//!     └── Model emitter       (emit)               renders a model as .config
//! ```

pub mod arch;
pub mod cli;
pub mod compose;
pub mod emit;
pub mod error;
pub mod formula;
pub mod kbuild;
pub mod kconfig;
pub mod orchestrator;
pub mod preflight;
pub mod process;
pub mod solver;
pub mod types;

pub use error::EngineError;
pub use formula::{Formula, FormulaStore, KconfigBundle};
pub use process::{ensure_exists, find_first_existing, Cmd, CommandResult};
pub use types::{KbuildKey, Model, OptionType, Value};
