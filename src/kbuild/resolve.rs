//! Path resolver: maps a user-supplied compilation-unit string to a
//! single canonical Kbuild key, and enumerates its ancestor directory
//! keys.

use crate::error::EngineError;
use crate::formula::FormulaStore;
use crate::types::KbuildKey;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Resolve a user-supplied CU path to its canonical Kbuild key.
///
/// Forces a `.o` extension, tries a direct key match, and otherwise
/// matches by normalized canonical path (zero matches fails, more than
/// one is an ambiguity error).
pub fn resolve_cu(raw: &str, store: &FormulaStore, cwd: &Path) -> Result<KbuildKey> {
    let forced = force_o_extension(raw);

    if store.contains(&KbuildKey::new(forced.clone())) {
        return Ok(KbuildKey::new(forced));
    }

    let target_normalized = normalize_like(&forced, cwd);

    let candidates: Vec<String> = store
        .keys()
        .filter(|key| normalize_like(key, cwd) == target_normalized)
        .map(|key| key.to_string())
        .collect();

    match candidates.len() {
        0 => Err(anyhow::Error::new(EngineError::NoFormulaForCu { cu: raw.to_string() })),
        1 => Ok(KbuildKey::new(candidates.into_iter().next().unwrap())),
        _ => Err(anyhow::Error::new(EngineError::AmbiguousCu {
            cu: raw.to_string(),
            candidates,
        })),
    }
}

/// Force a path to end in `.o`, warning if it had to be changed.
pub(crate) fn force_o_extension(raw: &str) -> String {
    if raw.ends_with(".o") {
        return raw.to_string();
    }
    let forced = match raw.rsplit_once('.') {
        Some((stem, _ext)) => format!("{}.o", stem),
        None => format!("{}.o", raw),
    };
    eprintln!("  [WARN] forced compilation unit extension: '{}' -> '{}'", raw, forced);
    forced
}

/// Compute the normalized canonical form of `path_str`: made absolute
/// against `cwd`, lexically normalized (no filesystem access), then
/// relativized back to `cwd` — preserving a trailing slash if present.
fn normalize_like(path_str: &str, cwd: &Path) -> PathBuf {
    let has_trailing_slash = path_str.ends_with('/');
    let candidate = Path::new(path_str);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        cwd.join(candidate)
    };

    let normalized = lexically_normalize(&absolute);
    let relative = normalized.strip_prefix(cwd).unwrap_or(&normalized).to_path_buf();

    if has_trailing_slash {
        let mut s = relative.to_string_lossy().into_owned();
        if !s.ends_with('/') {
            s.push('/');
        }
        PathBuf::from(s)
    } else {
        relative
    }
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn store_with(entries: &[(&str, &str)]) -> FormulaStore {
        let mut raw = BTreeMap::new();
        for (k, v) in entries {
            raw.insert(k.to_string(), v.to_string());
        }
        FormulaStore::from_raw(raw)
    }

    #[test]
    fn forces_o_extension() {
        assert_eq!(force_o_extension("kernel/kcmp.c"), "kernel/kcmp.o");
        assert_eq!(force_o_extension("kernel/kcmp"), "kernel/kcmp.o");
        assert_eq!(force_o_extension("kernel/kcmp.o"), "kernel/kcmp.o");
    }

    #[test]
    fn direct_key_match_short_circuits_normalization() {
        let store = store_with(&[("kernel/kcmp.o", "(and CONFIG_B)")]);
        let cwd = Path::new("/src");
        let key = resolve_cu("kernel/kcmp.o", &store, cwd).unwrap();
        assert_eq!(key.as_str(), "kernel/kcmp.o");
    }

    #[test]
    fn ambiguous_cu_lists_candidates() {
        let store = store_with(&[
            ("a/../kernel/kcmp.o", "(and CONFIG_A)"),
            ("kernel/kcmp.o", "(and CONFIG_B)"),
        ]);
        let cwd = Path::new("/src");
        let err = resolve_cu("kcmp.c", &store, cwd);
        // Neither key is a raw "kcmp.o" direct match, and both normalize to
        // the same canonical path, so this must be ambiguous.
        assert!(err.is_err());
    }

    #[test]
    fn missing_cu_fails() {
        let store = store_with(&[("kernel/kcmp.o", "(and CONFIG_B)")]);
        let cwd = Path::new("/src");
        assert!(resolve_cu("drivers/net/e1000.o", &store, cwd).is_err());
    }
}
