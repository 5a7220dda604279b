//! Solver driver: drives an external SMT-LIB2 solver process in
//! incremental-assumption mode.
//!
//! Formulas are handed to the solver as opaque SMT-LIB2 text; the session
//! itself is kept by [`rsmt2`], a crate purpose-built for managing exactly
//! this kind of long-lived external-solver subprocess (see `DESIGN.md` for
//! why this is the one dependency with no precedent in the example pack).

use crate::formula::Formula;
use crate::types::{Model, Value};
use anyhow::{Context, Result};
use rsmt2::errors::SmtRes;
use rsmt2::parse::{IdentParser, ModelParser as RsmtModelParser};
use rsmt2::{SmtConf, Solver};
use std::collections::{BTreeSet, HashSet};

/// Trivial identifier/value parser: every identifier and every value comes
/// back as the raw token the solver printed, which is all the emitter
/// needs (it distinguishes `true`/`false`/numerals itself).
#[derive(Clone, Copy)]
struct RawParser;

impl<'a> IdentParser<String, String, &'a str> for RawParser {
    fn parse_ident(self, input: &'a str) -> SmtRes<String> {
        Ok(input.to_string())
    }
    fn parse_type(self, input: &'a str) -> SmtRes<String> {
        Ok(input.to_string())
    }
}

impl<'a> RsmtModelParser<String, String, String, &'a str> for RawParser {
    fn parse_value(
        self,
        input: &'a str,
        _ident: &String,
        _params: &[(String, String)],
        _typ: &String,
    ) -> SmtRes<String> {
        Ok(input.to_string())
    }
}

/// One SMT-LIB2 solver session, scoped to a single architecture attempt —
/// no state crosses arch iterations.
pub struct SmtSession {
    solver: Solver<RawParser>,
    declared: HashSet<String>,
    next_label: usize,
    broken_guard_label: Option<String>,
}

impl SmtSession {
    /// Start a fresh session against `solver_bin` (e.g. `"z3"`), optionally
    /// pinning a random seed once up front.
    pub fn start(solver_bin: &str, random_seed: Option<u64>) -> Result<SmtSession> {
        let conf = SmtConf::z3(solver_bin);
        let mut solver = Solver::new(conf, RawParser).context("spawning SMT solver process")?;
        solver
            .raw_cmd("(set-option :produce-unsat-cores true)")
            .context("enabling unsat-core production")?;
        if let Some(seed) = random_seed {
            solver
                .raw_cmd(format!("(set-option :random-seed {})", seed))
                .context("pinning solver random seed")?;
        }
        Ok(SmtSession {
            solver,
            declared: HashSet::new(),
            next_label: 0,
            broken_guard_label: None,
        })
    }

    /// Declare `name` at `sort` (`"Bool"` for a plain `Var`, `"Int"` for
    /// an `Eq` target such as `BITS`), idempotently.
    fn declare(&mut self, name: &str, sort: &str) -> Result<()> {
        if self.declared.insert(name.to_string()) {
            self.solver
                .declare_const(name, sort)
                .with_context(|| format!("declaring symbol '{}' as {}", name, sort))?;
        }
        Ok(())
    }

    fn declare_symbols_in(&mut self, formula: &Formula) -> Result<()> {
        let mut bools = BTreeSet::new();
        let mut ints = BTreeSet::new();
        formula.free_symbols(&mut bools, &mut ints);
        for symbol in bools {
            self.declare(&symbol, "Bool")?;
        }
        for symbol in ints {
            self.declare(&symbol, "Int")?;
        }
        Ok(())
    }

    /// Assert every constraint as a named hard clause, so single mode can
    /// extract an unsat core over them. `broken_guard` identifies the
    /// `CONFIG_BROKEN` guard, if present, so `check_single` can recognize
    /// it in the returned core.
    pub fn assert_hard(&mut self, constraints: &[Formula], broken_guard: Option<&Formula>) -> Result<()> {
        for constraint in constraints {
            self.declare_symbols_in(constraint)?;
            let label = format!("c{}", self.next_label);
            self.next_label += 1;
            self.solver
                .raw_cmd(format!("(assert (! {} :named {}))", constraint.to_smtlib2(), label))
                .context("asserting constraint")?;
            if Some(constraint) == broken_guard {
                self.broken_guard_label = Some(label);
            }
        }
        Ok(())
    }

    /// Single-mode satisfiability check.
    ///
    /// Returns `Ok(Some(model))` on SAT. On UNSAT, returns `Ok(None)`
    /// unless the `CONFIG_BROKEN` guard is in the unsat core, in which
    /// case it fails with [`crate::error::EngineError::ConfigBrokenDependency`].
    pub fn check_single(&mut self, show_unsat_core: bool) -> Result<Option<Model>> {
        let sat = self.solver.check_sat().context("running check-sat")?;
        if sat {
            return Ok(Some(self.extract_model()?));
        }

        let core = self.solver.get_unsat_core().context("extracting unsat core")?;
        if show_unsat_core {
            eprintln!("  unsat core: {}", core.join(", "));
        }
        if let Some(label) = &self.broken_guard_label {
            if core.iter().any(|c| c == label) {
                return Err(anyhow::Error::new(
                    crate::error::EngineError::ConfigBrokenDependency,
                ));
            }
        }
        Ok(None)
    }

    /// Sample-N mode: issue `n` checks in a row, yielding one model per
    /// SAT check. Distinctness between successive models is left to the
    /// solver's own nondeterminism — no blocking clause is injected
    /// between checks.
    pub fn sample(&mut self, n: usize) -> Result<Vec<Model>> {
        let mut models = Vec::with_capacity(n);
        for _ in 0..n {
            let sat = self.solver.check_sat().context("running check-sat")?;
            if !sat {
                break;
            }
            models.push(self.extract_model()?);
        }
        Ok(models)
    }

    /// Approximate mode: treat `assumptions` (parsed from a reference
    /// `.config`) as soft, relaxing the ones the solver blames until SAT,
    /// except names in `immovable`.
    pub fn approximate(
        &mut self,
        assumptions: Vec<(String, bool)>,
        immovable: &HashSet<String>,
    ) -> Result<Model> {
        let mut live: Vec<(String, bool)> = assumptions;
        for (name, _) in &live {
            self.declare(name, "Bool")?;
        }

        loop {
            let literals: Vec<String> = live.iter().map(|(n, p)| literal_text(n, *p)).collect();
            let refs: Vec<&str> = literals.iter().map(String::as_str).collect();

            let sat = self
                .solver
                .check_sat_assuming(refs)
                .context("running check-sat-assuming")?;
            if sat {
                return self.extract_model();
            }

            let core = self.solver.get_unsat_core().context("extracting unsat core")?;
            let core_names: HashSet<String> = core
                .iter()
                .map(|lit| lit.trim_start_matches("(not ").trim_end_matches(')').to_string())
                .collect();

            let before = live.len();
            live.retain(|(name, _)| !core_names.contains(name) || immovable.contains(name));

            if live.len() == before {
                return Err(anyhow::Error::new(
                    crate::error::EngineError::NoSatisfyingConfiguration,
                ));
            }
        }
    }

    fn extract_model(&mut self) -> Result<Model> {
        let raw = self.solver.get_model().context("extracting model")?;
        let mut model = Model::new();
        for (ident, _params, sort, value) in raw {
            let parsed = if sort == "Bool" {
                Value::Bool(value == "true")
            } else {
                Value::Str(value)
            };
            model.push(ident, parsed);
        }
        Ok(model)
    }
}

fn literal_text(name: &str, positive: bool) -> String {
    if positive {
        name.to_string()
    } else {
        format!("(not {})", name)
    }
}

/// Parse a reference `.config` into `(name, positive)` assumption pairs
/// for approximate mode: `CONFIG_X=y`/`=m` → `+CONFIG_X`, `# CONFIG_X is
/// not set` → `-CONFIG_X`.
pub fn parse_reference_config(contents: &str) -> Vec<(String, bool)> {
    let mut assumptions = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if let Some((name, value)) = line.split_once('=') {
            if value == "y" || value == "m" {
                assumptions.push((name.to_string(), true));
            }
        } else if let Some(rest) = line.strip_prefix("# ") {
            if let Some(name) = rest.strip_suffix(" is not set") {
                assumptions.push((name.to_string(), false));
            }
        }
    }
    assumptions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_config_literals() {
        let contents = "\
CONFIG_A=y\n\
CONFIG_B=m\n\
# CONFIG_C is not set\n\
CONFIG_D=0x1\n";
        let parsed = parse_reference_config(contents);
        assert_eq!(
            parsed,
            vec![
                ("CONFIG_A".to_string(), true),
                ("CONFIG_B".to_string(), true),
                ("CONFIG_C".to_string(), false),
            ]
        );
    }

    #[test]
    fn literal_text_renders_negation() {
        assert_eq!(literal_text("CONFIG_X", true), "CONFIG_X");
        assert_eq!(literal_text("CONFIG_X", false), "(not CONFIG_X)");
    }
}
