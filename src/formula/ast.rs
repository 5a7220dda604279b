//! Propositional formula AST shared by Kbuild presence conditions and
//! Kconfig clauses.
//!
//! Formulas are persisted as SMT-LIB2 s-expression text; this module is
//! that boundary. A small tagged-variant AST — `{var, not, and, or,
//! eq(var, literal)}` — is all the solver driver needs downstream.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fmt;

/// A propositional (or `name=literal`) formula over `CONFIG_*` symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// A bare Boolean symbol, true when the option is set.
    Var(String),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    /// `name = literal`, used for non-Boolean pins such as `BITS=32`.
    Eq(String, i64),
    /// The constant `true`; used when no formula is on record for a key.
    True,
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var(name.into())
    }

    pub fn not(self) -> Self {
        Formula::Not(Box::new(self))
    }

    pub fn and(parts: Vec<Formula>) -> Self {
        match parts.len() {
            0 => Formula::True,
            1 => parts.into_iter().next().unwrap(),
            _ => Formula::And(parts),
        }
    }

    /// Collect every free symbol name referenced anywhere in the tree,
    /// split by the sort it's used at: `bools` gets every bare `Var`
    /// (Boolean), `ints` gets every `Eq` target (a numeric pin such as
    /// `BITS`). A name never appears in both unless the formula mixes a
    /// bare reference and an equality on the same name, which none of the
    /// callers in this crate do.
    pub fn free_symbols(&self, bools: &mut BTreeSet<String>, ints: &mut BTreeSet<String>) {
        match self {
            Formula::Var(name) => {
                bools.insert(name.clone());
            }
            Formula::Eq(name, _) => {
                ints.insert(name.clone());
            }
            Formula::Not(inner) => inner.free_symbols(bools, ints),
            Formula::And(parts) | Formula::Or(parts) => {
                for part in parts {
                    part.free_symbols(bools, ints);
                }
            }
            Formula::True => {}
        }
    }

    /// Render as an SMT-LIB2 term, e.g. `(and CONFIG_B (not CONFIG_A))`.
    pub fn to_smtlib2(&self) -> String {
        match self {
            Formula::Var(name) => name.clone(),
            Formula::Not(inner) => format!("(not {})", inner.to_smtlib2()),
            Formula::And(parts) => {
                format!(
                    "(and {})",
                    parts.iter().map(Formula::to_smtlib2).collect::<Vec<_>>().join(" ")
                )
            }
            Formula::Or(parts) => {
                format!(
                    "(or {})",
                    parts.iter().map(Formula::to_smtlib2).collect::<Vec<_>>().join(" ")
                )
            }
            Formula::Eq(name, value) => format!("(= {} {})", name, value),
            Formula::True => "true".to_string(),
        }
    }

    /// Parse a single SMT-LIB2 term into a [`Formula`].
    pub fn parse_smtlib2(src: &str) -> Result<Formula> {
        let tokens = tokenize(src);
        if tokens.is_empty() {
            return Ok(Formula::True);
        }
        let mut pos = 0;
        let formula = parse_term(&tokens, &mut pos)
            .with_context(|| format!("parsing SMT-LIB2 formula: {}", src))?;
        Ok(formula)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_smtlib2())
    }
}

fn tokenize(src: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(atom);
            }
        }
    }
    tokens
}

fn parse_term(tokens: &[String], pos: &mut usize) -> Result<Formula> {
    if *pos >= tokens.len() {
        bail!("unexpected end of input");
    }

    let token = &tokens[*pos];
    if token == "(" {
        *pos += 1;
        if *pos >= tokens.len() {
            bail!("unexpected end of input after '('");
        }
        let head = tokens[*pos].clone();
        *pos += 1;

        let formula = match head.as_str() {
            "not" => {
                let inner = parse_term(tokens, pos)?;
                Formula::Not(Box::new(inner))
            }
            "and" => {
                let mut parts = Vec::new();
                while *pos < tokens.len() && tokens[*pos] != ")" {
                    parts.push(parse_term(tokens, pos)?);
                }
                Formula::And(parts)
            }
            "or" => {
                let mut parts = Vec::new();
                while *pos < tokens.len() && tokens[*pos] != ")" {
                    parts.push(parse_term(tokens, pos)?);
                }
                Formula::Or(parts)
            }
            "=" => {
                let name = parse_atom(tokens, pos)?;
                let value = parse_atom(tokens, pos)?;
                let value: i64 = value
                    .parse()
                    .with_context(|| format!("non-numeric literal in (= {} {})", name, value))?;
                Formula::Eq(name, value)
            }
            other => bail!("unknown formula operator '{}'", other),
        };

        if *pos >= tokens.len() || tokens[*pos] != ")" {
            bail!("expected closing ')' for '{}'", head);
        }
        *pos += 1;
        Ok(formula)
    } else if token == "true" {
        *pos += 1;
        Ok(Formula::True)
    } else {
        let name = parse_atom(tokens, pos)?;
        Ok(Formula::Var(name))
    }
}

fn parse_atom(tokens: &[String], pos: &mut usize) -> Result<String> {
    if *pos >= tokens.len() {
        bail!("unexpected end of input, expected an atom");
    }
    let atom = tokens[*pos].clone();
    if atom == "(" || atom == ")" {
        bail!("expected an atom, found '{}'", atom);
    }
    *pos += 1;
    Ok(atom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_not() {
        let f = Formula::parse_smtlib2("(and CONFIG_B (not CONFIG_A))").unwrap();
        assert_eq!(
            f,
            Formula::And(vec![
                Formula::var("CONFIG_B"),
                Formula::var("CONFIG_A").not(),
            ])
        );
        assert_eq!(f.to_smtlib2(), "(and CONFIG_B (not CONFIG_A))");
    }

    #[test]
    fn parse_eq_literal() {
        let f = Formula::parse_smtlib2("(= BITS 32)").unwrap();
        assert_eq!(f, Formula::Eq("BITS".to_string(), 32));
    }

    #[test]
    fn empty_formula_is_true() {
        assert_eq!(Formula::parse_smtlib2("").unwrap(), Formula::True);
    }

    #[test]
    fn free_symbols_collects_all_bool_vars() {
        let f = Formula::parse_smtlib2("(or CONFIG_A (and CONFIG_B (not CONFIG_C)))").unwrap();
        let mut bools = BTreeSet::new();
        let mut ints = BTreeSet::new();
        f.free_symbols(&mut bools, &mut ints);
        assert_eq!(
            bools,
            BTreeSet::from([
                "CONFIG_A".to_string(),
                "CONFIG_B".to_string(),
                "CONFIG_C".to_string(),
            ])
        );
        assert!(ints.is_empty());
    }

    #[test]
    fn free_symbols_separates_eq_targets_from_bool_vars() {
        let f = Formula::parse_smtlib2("(and CONFIG_A (= BITS 64))").unwrap();
        let mut bools = BTreeSet::new();
        let mut ints = BTreeSet::new();
        f.free_symbols(&mut bools, &mut ints);
        assert_eq!(bools, BTreeSet::from(["CONFIG_A".to_string()]));
        assert_eq!(ints, BTreeSet::from(["BITS".to_string()]));
    }

    #[test]
    fn bare_var_parses() {
        assert_eq!(
            Formula::parse_smtlib2("CONFIG_FOO").unwrap(),
            Formula::var("CONFIG_FOO")
        );
    }
}
