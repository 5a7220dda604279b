//! Thin wrapper around [`std::process::Command`].
//!
//! Every external tool the engine shells out to — the Kbuild extractor,
//! `kconfig_extract`, `kclause`, the SMT solver's own helper binaries —
//! goes through [`Cmd`] so that error messages, captured output, and the
//! "let the user watch" vs. "capture and check" distinction are handled in
//! one place instead of at every call site.

use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of a non-interactive [`Cmd::run`].
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    status_success: bool,
}

impl CommandResult {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status_success
    }
}

/// Builder for a single subprocess invocation.
pub struct Cmd {
    inner: Command,
    program: String,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    /// Start building an invocation of `program`.
    pub fn new(program: impl AsRef<str>) -> Self {
        Cmd {
            inner: Command::new(program.as_ref()),
            program: program.as_ref().to_string(),
            error_msg: None,
            allow_fail: false,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    /// Append a path argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.inner.arg(path.as_os_str());
        self
    }

    /// Append several arguments at once.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    /// Set a custom message to prefix failures with.
    pub fn error_msg(mut self, msg: impl Display) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    /// Don't treat a non-zero exit status as an error from [`Cmd::run`].
    ///
    /// The caller is expected to inspect [`CommandResult::success`] itself.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Run the command, capturing stdout/stderr.
    pub fn run(mut self) -> Result<CommandResult> {
        let output = self
            .inner
            .output()
            .with_context(|| self.fail_prefix("failed to spawn"))?;

        let result = CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status_success: output.status.success(),
        };

        if !result.status_success && !self.allow_fail {
            bail!(
                "{} (status {}): {}",
                self.fail_prefix("command failed"),
                output.status,
                result.stderr.trim()
            );
        }

        Ok(result)
    }

    /// Run the command with inherited stdio so the user sees live output.
    pub fn run_interactive(mut self) -> Result<()> {
        let status = self
            .inner
            .status()
            .with_context(|| self.fail_prefix("failed to spawn"))?;

        if !status.success() && !self.allow_fail {
            bail!("{} (status {})", self.fail_prefix("command failed"), status);
        }

        Ok(())
    }

    fn fail_prefix(&self, default: &str) -> String {
        match &self.error_msg {
            Some(msg) => msg.clone(),
            None => format!("{}: {}", default, self.program),
        }
    }
}

/// Fail with a labeled message if `path` does not exist.
pub fn ensure_exists(path: &Path, label: impl Display) -> Result<()> {
    if !path.exists() {
        bail!("{} not found: {}", label, path.display());
    }
    Ok(())
}

/// Return the first path in `candidates` that exists, if any.
pub fn find_first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_stdout() {
        let result = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_fails_on_nonzero_exit() {
        let result = Cmd::new("sh").args(["-c", "exit 3"]).run();
        assert!(result.is_err());
    }

    #[test]
    fn allow_fail_suppresses_error() {
        let result = Cmd::new("sh").args(["-c", "exit 3"]).allow_fail().run().unwrap();
        assert!(!result.success());
    }

    #[test]
    fn ensure_exists_reports_missing_path() {
        let err = ensure_exists(Path::new("/definitely/not/here"), "test file").unwrap_err();
        assert!(err.to_string().contains("test file"));
    }

    #[test]
    fn find_first_existing_returns_none_when_all_missing() {
        let candidates = vec![PathBuf::from("/nope/a"), PathBuf::from("/nope/b")];
        assert_eq!(find_first_existing(&candidates), None);
    }
}
