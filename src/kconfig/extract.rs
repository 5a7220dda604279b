//! Kconfig extract parser: option types, visibility, and the "has a
//! non-Boolean default" set.

use crate::types::OptionType;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Parsed Kconfig type/visibility information for one architecture.
#[derive(Debug, Clone, Default)]
pub struct KconfigExtract {
    pub types: HashMap<String, OptionType>,
    /// `None` means "no visibility information is known" — either the
    /// extract was absent, or the caller asked to allow non-visible
    /// options (the "nullify the visible set" rule).
    pub visible: Option<HashSet<String>>,
    pub has_def_nonbool: HashSet<String>,
}

impl KconfigExtract {
    /// Parse a whitespace-tokenized extract file. Returns `Ok(None)` if the
    /// file does not exist — callers degrade accordingly.
    pub fn load(path: &Path) -> Result<Option<KconfigExtract>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading Kconfig extract '{}'", path.display()))?;
        Ok(Some(Self::parse(&contents)))
    }

    fn parse(contents: &str) -> KconfigExtract {
        let mut extract = KconfigExtract {
            visible: Some(HashSet::new()),
            ..Default::default()
        };

        for line in contents.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["config", name, ty] => {
                    if let Some(option_type) = OptionType::parse(ty) {
                        extract.types.insert((*name).to_string(), option_type);
                    }
                }
                ["prompt", name] => {
                    extract
                        .visible
                        .get_or_insert_with(HashSet::new)
                        .insert((*name).to_string());
                }
                ["def_nonbool", name] => {
                    extract.has_def_nonbool.insert((*name).to_string());
                }
                _ => {}
            }
        }

        extract
    }

    /// Disable visibility filtering entirely (the `--allow-non-visibles`
    /// CLI flag).
    pub fn allow_non_visible(&mut self) {
        self.visible = None;
    }

    pub fn is_visible(&self, name: &str) -> bool {
        match &self.visible {
            Some(set) => set.contains(name),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_prompt_def_nonbool_lines() {
        let contents = "\
config CONFIG_FOO bool
prompt CONFIG_FOO
config CONFIG_BAR string
def_nonbool CONFIG_BAR
# a comment line is ignored by whitespace-split dispatch, no verb matches
config CONFIG_BAZ tristate
";
        let extract = KconfigExtract::parse(contents);
        assert_eq!(extract.types.get("CONFIG_FOO"), Some(&OptionType::Bool));
        assert_eq!(extract.types.get("CONFIG_BAR"), Some(&OptionType::String));
        assert_eq!(extract.types.get("CONFIG_BAZ"), Some(&OptionType::Tristate));
        assert!(extract.visible.as_ref().unwrap().contains("CONFIG_FOO"));
        assert!(!extract.visible.as_ref().unwrap().contains("CONFIG_BAZ"));
        assert!(extract.has_def_nonbool.contains("CONFIG_BAR"));
    }

    #[test]
    fn missing_file_yields_none() {
        let result = KconfigExtract::load(Path::new("/does/not/exist/kconfig_extract")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn allow_non_visible_nullifies_visible_set() {
        let mut extract = KconfigExtract::parse("prompt CONFIG_FOO\n");
        assert!(!extract.is_visible("CONFIG_BAR"));
        extract.allow_non_visible();
        assert!(extract.is_visible("CONFIG_BAR"));
    }
}
