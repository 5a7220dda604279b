//! Small shared domain types.

use std::fmt;

/// A Kbuild key: either a compilation-unit path or a directory path ending
/// in `/`. The trailing slash is semantically significant and preserved on
/// every transform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KbuildKey(String);

impl KbuildKey {
    pub fn new(raw: impl Into<String>) -> Self {
        KbuildKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key names a directory (subdirectory inclusion
    /// condition) rather than a single compilation unit.
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The linear ancestor-directory chain for this key: `d1/`, `d1/d2/`,
    /// … up to but not including the key itself.
    ///
    /// A directory key's own ancestors are its strict parents; a
    /// compilation-unit key's ancestors are every enclosing directory.
    pub fn ancestors(&self) -> Vec<KbuildKey> {
        let trimmed = self.0.trim_end_matches('/');
        let components: Vec<&str> = trimmed.split('/').collect();
        // For a CU "d1/d2/foo.o" -> components = [d1, d2, foo.o]; ancestors
        // are d1/, d1/d2/. For a directory "d1/d2/" -> components after
        // trimming the trailing slash = [d1, d2]; ancestors are d1/ only.
        let ancestor_count = if self.is_directory() {
            components.len().saturating_sub(1)
        } else {
            components.len().saturating_sub(1)
        };
        (1..=ancestor_count)
            .map(|n| KbuildKey(format!("{}/", components[..n].join("/"))))
            .collect()
    }
}

impl fmt::Display for KbuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kconfig option types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    Bool,
    Tristate,
    String,
    Number,
    Hex,
}

impl OptionType {
    pub fn parse(token: &str) -> Option<OptionType> {
        match token {
            "bool" | "boolean" => Some(OptionType::Bool),
            "tristate" => Some(OptionType::Tristate),
            "string" => Some(OptionType::String),
            "number" | "int" => Some(OptionType::Number),
            "hex" => Some(OptionType::Hex),
            _ => None,
        }
    }
}

/// A single value assigned to a symbol by the solver's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Str(String),
}

/// A satisfying assignment, preserving the solver's own iteration order
/// over assignments — no re-sorting.
#[derive(Debug, Clone, Default)]
pub struct Model(pub Vec<(String, Value)>);

impl Model {
    pub fn new() -> Self {
        Model(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push((name.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    /// Look up a symbol's Boolean value, if it was assigned one.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.iter().find_map(|(n, v)| match v {
            Value::Bool(b) if n == name => Some(*b),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cu_ancestors_form_a_linear_chain() {
        let key = KbuildKey::new("kernel/sched/core.o");
        assert_eq!(
            key.ancestors(),
            vec![KbuildKey::new("kernel/"), KbuildKey::new("kernel/sched/")]
        );
    }

    #[test]
    fn directory_ancestors_exclude_itself() {
        let key = KbuildKey::new("kernel/sched/");
        assert_eq!(key.ancestors(), vec![KbuildKey::new("kernel/")]);
    }

    #[test]
    fn top_level_cu_has_no_ancestors() {
        let key = KbuildKey::new("init.o");
        assert!(key.ancestors().is_empty());
    }

    #[test]
    fn trailing_slash_is_preserved() {
        let key = KbuildKey::new("kernel/");
        assert!(key.is_directory());
        assert_eq!(key.as_str(), "kernel/");
    }
}
