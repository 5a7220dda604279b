//! Model emitter: renders a satisfying assignment as a kernel `.config`
//! file, honoring Kconfig types and visibility.
//!
//! Mirrors the line-based rewriting style of `apply_kernel_config`
//! (`build/kernel.rs`): both operate purely on text lines rather than
//! building an intermediate keyed map, preserving whatever order the
//! caller handed them.

use crate::arch::ARCH_DEFINING_OPTIONS;
use crate::kconfig::KconfigExtract;
use crate::types::{Model, OptionType, Value};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Render `model` to `.config` text. `extract` is `None` when this
/// architecture has no Kconfig extract available, in which case types and
/// visibility are both treated as unknown.
///
/// `modules_mode` renders tristate positives as `=m` instead of `=y`.
/// `user_specified_option_names` exempts names the user pinned directly
/// from the "has a non-Boolean default, so omit it" rule.
pub fn render(
    model: &Model,
    extract: Option<&KconfigExtract>,
    modules_mode: bool,
    user_specified_option_names: &HashSet<String>,
) -> String {
    let mut out = String::new();
    for (name, value) in model.iter() {
        if !is_config_name(name) {
            continue;
        }
        if let Some(extract) = extract {
            if !extract.is_visible(name) {
                continue;
            }
        }

        match value {
            Value::Bool(true) => emit_true(&mut out, name, extract, modules_mode, user_specified_option_names),
            Value::Bool(false) => emit_false(&mut out, name, extract),
            Value::Str(_) => {}
        }
    }
    out
}

fn is_config_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("CONFIG_") else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn emit_true(
    out: &mut String,
    name: &str,
    extract: Option<&KconfigExtract>,
    modules_mode: bool,
    user_specified_option_names: &HashSet<String>,
) {
    let Some(extract) = extract else {
        let _ = writeln!(out, "{}=y", name);
        return;
    };

    match extract.types.get(name) {
        Some(_) if extract.has_def_nonbool.contains(name) && !user_specified_option_names.contains(name) => {}
        Some(OptionType::Bool) => {
            let _ = writeln!(out, "{}=y", name);
        }
        Some(OptionType::Tristate) => {
            let _ = writeln!(out, "{}={}", name, if modules_mode { "m" } else { "y" });
        }
        Some(OptionType::String) => {
            let _ = writeln!(out, "{}=", name);
        }
        Some(OptionType::Number) => {
            let _ = writeln!(out, "{}=0", name);
        }
        Some(OptionType::Hex) => {
            let _ = writeln!(out, "{}=0x0", name);
        }
        None if ARCH_DEFINING_OPTIONS.contains(&name) => {
            let _ = writeln!(out, "{}=y", name);
        }
        None => {
            eprintln!("  [WARN] '{}' has no known Kconfig type for this architecture, skipping", name);
        }
    }
}

fn emit_false(out: &mut String, name: &str, extract: Option<&KconfigExtract>) {
    let known = match extract {
        None => true,
        Some(extract) => extract.types.contains_key(name),
    };
    if known {
        let _ = writeln!(out, "# {} is not set", name);
    } else {
        eprintln!("  [WARN] '{}' has no known Kconfig type for this architecture, skipping", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OptionType;

    fn model_with(entries: &[(&str, Value)]) -> Model {
        let mut model = Model::new();
        for (name, value) in entries {
            model.push(*name, value.clone());
        }
        model
    }

    #[test]
    fn unknown_types_render_bare_y_and_not_set() {
        let model = model_with(&[
            ("CONFIG_A", Value::Bool(true)),
            ("CONFIG_B", Value::Bool(false)),
        ]);
        let rendered = render(&model, None, false, &HashSet::new());
        assert_eq!(rendered, "CONFIG_A=y\n# CONFIG_B is not set\n");
    }

    #[test]
    fn tristate_renders_m_in_modules_mode() {
        let mut extract = KconfigExtract::default();
        extract.types.insert("CONFIG_A".to_string(), OptionType::Tristate);
        extract.allow_non_visible();
        let model = model_with(&[("CONFIG_A", Value::Bool(true))]);

        assert_eq!(render(&model, Some(&extract), false, &HashSet::new()), "CONFIG_A=y\n");
        assert_eq!(render(&model, Some(&extract), true, &HashSet::new()), "CONFIG_A=m\n");
    }

    #[test]
    fn visibility_filter_skips_hidden_options() {
        let mut extract = KconfigExtract::default();
        extract.types.insert("CONFIG_A".to_string(), OptionType::Bool);
        // visible set starts empty: nothing is visible until populated.
        let model = model_with(&[("CONFIG_A", Value::Bool(true))]);
        assert_eq!(render(&model, Some(&extract), false, &HashSet::new()), "");
    }

    #[test]
    fn def_nonbool_is_skipped_unless_user_specified() {
        let mut extract = KconfigExtract::default();
        extract.types.insert("CONFIG_A".to_string(), OptionType::String);
        extract.has_def_nonbool.insert("CONFIG_A".to_string());
        extract.allow_non_visible();
        let model = model_with(&[("CONFIG_A", Value::Bool(true))]);

        assert_eq!(render(&model, Some(&extract), false, &HashSet::new()), "");

        let mut user_specified = HashSet::new();
        user_specified.insert("CONFIG_A".to_string());
        assert_eq!(render(&model, Some(&extract), false, &user_specified), "CONFIG_A=\n");
    }

    #[test]
    fn non_config_entries_are_skipped() {
        let model = model_with(&[("BITS", Value::Bool(true))]);
        assert_eq!(render(&model, None, false, &HashSet::new()), "");
    }

    #[test]
    fn unknown_name_that_is_arch_defining_still_emits() {
        let mut extract = KconfigExtract::default();
        extract.allow_non_visible();
        let model = model_with(&[("CONFIG_X86", Value::Bool(true))]);
        assert_eq!(render(&model, Some(&extract), false, &HashSet::new()), "CONFIG_X86=y\n");
    }
}
