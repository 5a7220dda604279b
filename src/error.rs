//! Typed errors and the stable exit-code table.
//!
//! `anyhow::Error` is used for error *propagation* everywhere; [`EngineError`]
//! exists only at the boundary the orchestrator and the binary entry point
//! share, so that every fatal path maps to exactly one stable exit code.

use std::fmt;

/// A fatal condition with a dedicated, stable exit code.
#[derive(Debug)]
pub enum EngineError {
    /// No formula found for a user-supplied compilation unit.
    NoFormulaForCu { cu: String },
    /// More than one Kbuild key normalizes to the same user-supplied CU.
    AmbiguousCu { cu: String, candidates: Vec<String> },
    /// `--view-kbuild` was requested without any target CU.
    ViewKbuildWithoutCu,
    /// An explicitly-named Kconfig bundle file does not exist.
    KconfigBundleNotFound { path: String },
    /// No Kconfig bundle is available for any candidate architecture.
    NoKconfigBundlesAvailable,
    /// Multiple architectures remain but no target CU narrows the choice.
    MultipleArchsWithoutTarget,
    /// A CU's directory-derived architecture set excludes every requested arch.
    CuArchNotCandidate { cu: String, arch: String },
    /// `CONFIG_BROKEN`'s negation appears in the unsat core.
    ConfigBrokenDependency,
    /// No candidate architecture produced a satisfying configuration.
    NoSatisfyingConfiguration,
    /// Mutually exclusive flags, or a required operand is missing.
    InvalidFlagCombination { detail: String },
    /// An external tool exited non-zero or could not be spawned.
    SubprocessFailure { tool: String, detail: String },
}

impl EngineError {
    /// The exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::NoFormulaForCu { .. } => 3,
            EngineError::AmbiguousCu { .. } => 4,
            EngineError::ViewKbuildWithoutCu => 5,
            EngineError::KconfigBundleNotFound { .. } => 6,
            EngineError::NoKconfigBundlesAvailable => 7,
            EngineError::MultipleArchsWithoutTarget => 8,
            EngineError::CuArchNotCandidate { .. } => 9,
            EngineError::ConfigBrokenDependency => 10,
            EngineError::NoSatisfyingConfiguration => 11,
            EngineError::InvalidFlagCombination { .. } => 12,
            EngineError::SubprocessFailure { .. } => 13,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoFormulaForCu { cu } => {
                write!(f, "no Kbuild formula for compilation unit '{}'", cu)
            }
            EngineError::AmbiguousCu { cu, candidates } => write!(
                f,
                "'{}' matches multiple Kbuild keys:\n{}",
                cu,
                candidates
                    .iter()
                    .map(|c| format!("  {}", c))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            EngineError::ViewKbuildWithoutCu => {
                write!(f, "--view-kbuild requires at least one compilation unit")
            }
            EngineError::KconfigBundleNotFound { path } => {
                write!(f, "Kconfig bundle file not found: {}", path)
            }
            EngineError::NoKconfigBundlesAvailable => {
                write!(f, "no Kconfig bundles available for any candidate architecture")
            }
            EngineError::MultipleArchsWithoutTarget => write!(
                f,
                "multiple architectures requested but no target compilation unit narrows the choice"
            ),
            EngineError::CuArchNotCandidate { cu, arch } => write!(
                f,
                "compilation unit '{}' is not valid for architecture '{}'",
                cu, arch
            ),
            EngineError::ConfigBrokenDependency => write!(
                f,
                "the requested configuration depends on CONFIG_BROKEN; refusing to satisfy it"
            ),
            EngineError::NoSatisfyingConfiguration => {
                write!(f, "no satisfying configuration found for any candidate architecture")
            }
            EngineError::InvalidFlagCombination { detail } => {
                write!(f, "invalid flag combination: {}", detail)
            }
            EngineError::SubprocessFailure { tool, detail } => {
                write!(f, "subprocess '{}' failed: {}", tool, detail)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Walk an [`anyhow::Error`]'s cause chain looking for an [`EngineError`],
/// returning its exit code, or 1 for any other error (mirroring a plain
/// `Result<()>` `main` that exits 1 on any `Err`).
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(engine_err) = cause.downcast_ref::<EngineError>() {
            return engine_err.exit_code();
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_for_finds_engine_error_in_chain() {
        let err = anyhow::Error::new(EngineError::NoSatisfyingConfiguration)
            .context("while trying arch x86_64");
        assert_eq!(exit_code_for(&err), 11);
    }

    #[test]
    fn exit_code_for_defaults_to_one() {
        let err = anyhow::anyhow!("some unrelated failure");
        assert_eq!(exit_code_for(&err), 1);
    }
}
