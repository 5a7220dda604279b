//! Formula store: serves Kbuild presence-condition formulas and Kconfig
//! clause bundles, regenerating them on demand via external tools when
//! the on-disk cache doesn't have them yet.

use crate::formula::ast::Formula;
use crate::process::Cmd;
use crate::types::KbuildKey;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk/in-memory mapping from Kbuild key to its raw SMT-LIB2 formula
/// string, loaded lazily and memoized for the process lifetime.
#[derive(Debug, Default, Clone)]
pub struct FormulaStore {
    raw: BTreeMap<String, String>,
    dirty: bool,
}

/// A loaded Kconfig clause bundle: option name → its clauses.
pub type KconfigBundle = BTreeMap<String, Vec<Formula>>;

impl FormulaStore {
    /// Build a store directly from an already-loaded mapping (used by
    /// tests and by callers that parsed the cache themselves).
    pub fn from_raw(raw: BTreeMap<String, String>) -> FormulaStore {
        FormulaStore { raw, dirty: false }
    }

    /// Every Kbuild key currently on record.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    /// Load a persisted `key → smt2-string` mapping. Absent files yield an
    /// empty store rather than an error.
    pub fn load_kbuild_formulas(path: &Path) -> Result<FormulaStore> {
        if !path.exists() {
            return Ok(FormulaStore::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading Kbuild formula cache '{}'", path.display()))?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing Kbuild formula cache '{}'", path.display()))?;
        Ok(FormulaStore { raw, dirty: false })
    }

    /// The raw formula for `key`, or `Formula::True` if the store has
    /// nothing on record — absent ancestors are vacuously true.
    pub fn formula_for(&self, key: &KbuildKey) -> Result<Formula> {
        match self.raw.get(key.as_str()) {
            Some(src) => Formula::parse_smtlib2(src),
            None => Ok(Formula::True),
        }
    }

    pub fn contains(&self, key: &KbuildKey) -> bool {
        self.raw.contains_key(key.as_str())
    }

    /// Guarantee that `cu_key` and every ancestor directory key has a
    /// formula on record, regenerating missing ones via the external
    /// Kbuild extractor (`kmax`).
    ///
    /// For each missing ancestor `dir/`, locates a `Kbuild` or `Makefile`
    /// under `srctree/dir` and invokes the extractor with
    /// `srctree=<srctree>, src=<dir>`. If neither file exists, logs a
    /// warning and leaves the key absent (i.e. `true`).
    pub fn ensure_kbuild_for(&mut self, cu_key: &KbuildKey, srctree: &Path) -> Result<()> {
        let mut keys_to_check = cu_key.ancestors();
        keys_to_check.push(cu_key.clone());

        for key in keys_to_check {
            if self.contains(&key) {
                continue;
            }
            self.regenerate_one(&key, srctree)?;
        }
        Ok(())
    }

    fn regenerate_one(&mut self, key: &KbuildKey, srctree: &Path) -> Result<()> {
        let dir = key.as_str().trim_end_matches('/');
        let dir_on_disk = srctree.join(dir);

        let kbuild_file = dir_on_disk.join("Kbuild");
        let makefile = dir_on_disk.join("Makefile");

        if !kbuild_file.exists() && !makefile.exists() {
            eprintln!(
                "  [WARN] no Kbuild or Makefile under '{}'; treating '{}' as unconstrained",
                dir_on_disk.display(),
                key
            );
            return Ok(());
        }

        let srctree_arg = format!("srctree={}", srctree.display());
        let src_arg = format!("src={}", dir);

        let result = Cmd::new("kmax")
            .args([srctree_arg.as_str(), src_arg.as_str()])
            .error_msg(format!("kmax failed for '{}'", key))
            .run()
            .map_err(|e| {
                anyhow::Error::new(crate::error::EngineError::SubprocessFailure {
                    tool: "kmax".to_string(),
                    detail: e.to_string(),
                })
            })?;

        let generated: BTreeMap<String, String> = serde_json::from_str(&result.stdout)
            .with_context(|| format!("parsing kmax output for '{}'", key))?;

        for (k, v) in generated {
            self.raw.insert(k, v);
        }
        self.dirty = true;
        Ok(())
    }

    /// Write the store back to disk if it was mutated, via a crash-safe
    /// `*.pending` → rename.
    pub fn persist(&mut self, path: &Path) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let pending = path.with_extension("pending");
        let serialized = serde_json::to_string_pretty(&self.raw)
            .context("serializing Kbuild formula cache")?;
        fs::write(&pending, serialized)
            .with_context(|| format!("writing '{}'", pending.display()))?;
        fs::rename(&pending, path)
            .with_context(|| format!("renaming '{}' into place", path.display()))?;
        self.dirty = false;
        Ok(())
    }

    /// Regenerate the Kconfig bundle and extract for `arch` if either is
    /// missing, by invoking `kconfig_extract` then `kclause` against
    /// `srctree`, writing both through a `*.pending` → rename.
    pub fn ensure_kconfig_bundle_for(formulas_root: &Path, arch: &str, srctree: &Path) -> Result<()> {
        let bundle_path = kconfig_bundle_path(formulas_root, arch);
        let extract_path = kconfig_extract_path(formulas_root, arch);
        if bundle_path.exists() && extract_path.exists() {
            return Ok(());
        }

        if let Some(parent) = bundle_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }

        let srctree_arg = format!("srctree={}", srctree.display());
        let arch_arg = format!("ARCH={}", arch);

        let extract_result = Cmd::new("kconfig_extract")
            .args([srctree_arg.as_str(), arch_arg.as_str()])
            .error_msg(format!("kconfig_extract failed for arch '{}'", arch))
            .run()
            .map_err(|e| {
                anyhow::Error::new(crate::error::EngineError::SubprocessFailure {
                    tool: "kconfig_extract".to_string(),
                    detail: e.to_string(),
                })
            })?;
        let extract_pending = extract_path.with_extension("pending");
        fs::write(&extract_pending, &extract_result.stdout)
            .with_context(|| format!("writing '{}'", extract_pending.display()))?;
        fs::rename(&extract_pending, &extract_path)
            .with_context(|| format!("renaming '{}' into place", extract_path.display()))?;

        let kclause_result = Cmd::new("kclause")
            .args([srctree_arg.as_str(), arch_arg.as_str()])
            .error_msg(format!("kclause failed for arch '{}'", arch))
            .run()
            .map_err(|e| {
                anyhow::Error::new(crate::error::EngineError::SubprocessFailure {
                    tool: "kclause".to_string(),
                    detail: e.to_string(),
                })
            })?;
        let bundle_pending = bundle_path.with_extension("pending");
        fs::write(&bundle_pending, &kclause_result.stdout)
            .with_context(|| format!("writing '{}'", bundle_pending.display()))?;
        fs::rename(&bundle_pending, &bundle_path)
            .with_context(|| format!("renaming '{}' into place", bundle_path.display()))?;

        Ok(())
    }

    /// Resolve and parse the per-architecture Kconfig clause bundle file
    /// at `<formulas_root>/kclause/<arch>/kclause`.
    pub fn load_kconfig_for(formulas_root: &Path, arch: &str) -> Result<KconfigBundle> {
        let path = kconfig_bundle_path(formulas_root, arch);
        if !path.exists() {
            return Err(anyhow::Error::new(
                crate::error::EngineError::KconfigBundleNotFound {
                    path: path.display().to_string(),
                },
            ));
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading Kconfig bundle '{}'", path.display()))?;
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing Kconfig bundle '{}'", path.display()))?;

        let mut bundle = KconfigBundle::new();
        for (option, clauses) in raw {
            let parsed = clauses
                .iter()
                .map(|c| Formula::parse_smtlib2(c))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("parsing clauses for option '{}'", option))?;
            bundle.insert(option, parsed);
        }
        Ok(bundle)
    }
}

/// Per-architecture Kconfig bundle path, UML variants aliased to their
/// underlying X86 subdirectory.
pub fn kconfig_bundle_path(formulas_root: &Path, arch: &str) -> PathBuf {
    let resolved_dir = match arch {
        "um" | "um32" => "x86",
        other => other,
    };
    formulas_root.join("kclause").join(resolved_dir).join("kclause")
}

/// Per-architecture Kconfig extract path, same aliasing rule.
pub fn kconfig_extract_path(formulas_root: &Path, arch: &str) -> PathBuf {
    let resolved_dir = match arch {
        "um" | "um32" => "x86",
        other => other,
    };
    formulas_root.join("kclause").join(resolved_dir).join("kconfig_extract")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    #[test]
    fn load_missing_cache_is_empty() {
        let store = FormulaStore::load_kbuild_formulas(Path::new("/does/not/exist")).unwrap();
        assert!(store.raw.is_empty());
    }

    #[test]
    fn formula_for_absent_key_is_true() {
        let store = FormulaStore::default();
        let f = store.formula_for(&KbuildKey::new("kernel/kcmp.o")).unwrap();
        assert_eq!(f, Formula::True);
    }

    #[test]
    fn persist_writes_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("kmax");

        let mut raw = Map::new();
        raw.insert("kernel/kcmp.o".to_string(), "(and CONFIG_B)".to_string());
        let mut store = FormulaStore {
            raw,
            dirty: true,
        };
        store.persist(&cache_path).unwrap();
        assert!(cache_path.exists());

        let reloaded = FormulaStore::load_kbuild_formulas(&cache_path).unwrap();
        let f = reloaded
            .formula_for(&KbuildKey::new("kernel/kcmp.o"))
            .unwrap();
        assert_eq!(f, Formula::And(vec![Formula::var("CONFIG_B")]));
    }

    #[test]
    fn persist_is_noop_when_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("kmax");
        let mut store = FormulaStore::default();
        store.persist(&cache_path).unwrap();
        assert!(!cache_path.exists());
    }

    #[test]
    fn kconfig_bundle_path_aliases_uml_to_x86() {
        let root = Path::new("/formulas");
        assert_eq!(
            kconfig_bundle_path(root, "um"),
            PathBuf::from("/formulas/kclause/x86/kclause")
        );
        assert_eq!(
            kconfig_bundle_path(root, "x86_64"),
            PathBuf::from("/formulas/kclause/x86_64/kclause")
        );
    }
}
