//! Preflight checks for the external tools the engine shells out to.
//!
//! Validates that `kmax`, `kconfig_extract`, `kclause`, and the configured
//! SMT solver binary are reachable on `PATH` before the orchestrator starts
//! doing real work. This turns a confusing subprocess-spawn failure deep in
//! a run into a single, actionable error up front.
//!
//! # Example
//!
//! ```rust
//! use ksynth::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("kmax") {
//!     println!("kmax not installed");
//! }
//!
//! let tools = &[("kmax", "kmax"), ("kclause", "kmax")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
///
/// Uses the `which` crate to locate the command in `PATH` rather than
/// shelling out to the `which` binary.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// External tools required for on-demand formula/bundle regeneration.
///
/// Each tuple is (command name, package/project that provides it).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("kmax", "kmax"),
    ("kconfig_extract", "kmax"),
    ("kclause", "kmax"),
];

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` listing missing tools and their providing package
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (from: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that the on-demand regeneration toolchain (`kmax`/`kconfig_extract`/
/// `kclause`) is available.
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}

/// Check that the configured SMT solver binary is reachable.
pub fn check_solver(solver_bin: &str) -> Result<()> {
    check_required_tools(&[(solver_bin, "an SMT-LIB2 solver, e.g. z3")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_failure() {
        let tools = &[("nonexistent_command_xyz", "fake-package")];
        assert!(check_required_tools(tools).is_err());
    }
}
