//! Orchestrator: drives the top-level architecture try-loop — the single
//! component that ties the path resolver, architecture profile, Kconfig
//! extract, formula store, constraint composer, solver, and emitter
//! together.

use crate::arch::{self, profile_for, ArchProfile, ARCHITECTURES, PRIORITY_ARCHITECTURES};
use crate::cli::{Invocation, Mode};
use crate::compose::{compose, UserConstraints};
use crate::emit;
use crate::error::EngineError;
use crate::formula::{store::kconfig_extract_path, Formula, FormulaStore, KconfigBundle};
use crate::kbuild::resolve_cu;
use crate::kconfig::KconfigExtract;
use crate::preflight;
use crate::process;
use crate::solver::{self, SmtSession};
use crate::types::{KbuildKey, Model};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Stands in for "no architecture profile" — used when the user supplied
/// an explicit Kconfig bundle path directly, skipping arch-profile
/// constraints entirely.
const NULL_ARCH: &str = "__null_arch__";

/// The outcome of running the whole pipeline once.
pub struct RunOutcome {
    /// Architecture tags that produced a satisfying configuration, in the
    /// order they were tried.
    pub satisfied: Vec<String>,
}

/// One architecture attempt's result, carrying what the emitter needs.
struct Attempt {
    models: Vec<Model>,
    extract: Option<KconfigExtract>,
    user_specified_option_names: HashSet<String>,
}

/// Run the full try-loop and write output files as a side effect.
/// Returns the architectures that were SAT (a singleton, unless
/// `--report-all` was requested).
pub fn run(invocation: &Invocation) -> Result<RunOutcome> {
    preflight::check_solver(&invocation.solver_bin)?;
    if invocation.srctree.is_some() {
        preflight::check_host_tools()?;
    }

    let mut store = FormulaStore::load_kbuild_formulas(&invocation.kbuild_cache_path())
        .context("loading Kbuild formula cache")?;

    let mut cu_keys = Vec::new();
    for raw in &invocation.cu_paths {
        if let Some(srctree) = &invocation.srctree {
            let forced = crate::kbuild::force_o_extension(raw);
            store
                .ensure_kbuild_for(&KbuildKey::new(forced), srctree)
                .context("regenerating Kbuild formulas on demand")?;
        }
        cu_keys.push(resolve_cu(raw, &store, &invocation.cwd)?);
    }

    if invocation.view_kbuild {
        if cu_keys.is_empty() {
            return Err(anyhow::Error::new(EngineError::ViewKbuildWithoutCu));
        }
        for key in &cu_keys {
            print_kbuild_chain(key, &store)?;
        }
        store.persist(&invocation.kbuild_cache_path())?;
        return Ok(RunOutcome { satisfied: Vec::new() });
    }

    let archs = build_arch_list(invocation, &cu_keys)?;

    let mut satisfied = Vec::new();
    let mut missing_bundle_count = 0usize;
    for arch_tag in &archs {
        eprintln!("Trying architecture {}...", arch_tag);
        let outcome = try_one_arch(invocation, &mut store, &cu_keys, arch_tag);
        let attempt = match outcome {
            Ok(attempt) => attempt,
            // A missing Kconfig bundle for one candidate architecture is not
            // fatal on its own: skip it and keep trying the rest, unless the
            // caller pinned an explicit bundle file, in which case a missing
            // file is always fatal (exit 6).
            Err(e) if invocation.explicit_kconfig_bundle.is_none() => {
                match e.downcast_ref::<EngineError>() {
                    Some(EngineError::KconfigBundleNotFound { path }) => {
                        eprintln!(
                            "  [WARN] no Kconfig bundle for architecture '{}' ({}); skipping",
                            arch_tag, path
                        );
                        missing_bundle_count += 1;
                        continue;
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        match attempt {
            Some(attempt) => {
                satisfied.push(arch_tag.clone());
                write_attempt(invocation, arch_tag, &attempt)?;
                if !invocation.report_all {
                    break;
                }
            }
            None => continue,
        }
    }

    store.persist(&invocation.kbuild_cache_path())?;

    if satisfied.is_empty() {
        if !archs.is_empty() && missing_bundle_count == archs.len() {
            return Err(anyhow::Error::new(EngineError::NoKconfigBundlesAvailable));
        }
        return Err(anyhow::Error::new(EngineError::NoSatisfyingConfiguration));
    }

    if invocation.report_all {
        for tag in &satisfied {
            println!("{}", tag);
        }
    } else if let Some(tag) = satisfied.first() {
        println!("{}", tag);
    }

    Ok(RunOutcome { satisfied })
}

fn print_kbuild_chain(key: &KbuildKey, store: &FormulaStore) -> Result<()> {
    println!("{}:", key);
    println!("  {}", store.formula_for(key)?);
    for ancestor in key.ancestors() {
        println!("  {} <- {}", ancestor, store.formula_for(&ancestor)?);
    }
    Ok(())
}

/// Build the architecture try-list.
fn build_arch_list(invocation: &Invocation, cu_keys: &[KbuildKey]) -> Result<Vec<String>> {
    if invocation.explicit_kconfig_bundle.is_some() {
        return Ok(vec![NULL_ARCH.to_string()]);
    }

    // With no target CU, a multi-arch explicit try-list has nothing to
    // disambiguate which architecture's SAT result is meaningful (the
    // composed problem is just the arch profile and Kconfig bundle, almost
    // always trivially SAT for every candidate). `--report-all` makes that
    // ambiguity the point, so it's exempt.
    if cu_keys.is_empty() && invocation.archs.len() > 1 && !invocation.report_all {
        return Err(anyhow::Error::new(EngineError::MultipleArchsWithoutTarget));
    }

    let mut list: Vec<String> = if invocation.archs.is_empty() {
        PRIORITY_ARCHITECTURES.iter().map(|s| s.to_string()).collect()
    } else {
        invocation.archs.clone()
    };

    if invocation.try_all {
        for tag in ARCHITECTURES {
            if !list.iter().any(|a| a == tag) {
                list.push(tag.to_string());
            }
        }
    }

    for cu in cu_keys {
        if let Some(narrowed) = arch::archs_for_cu_path(cu.as_str()) {
            let narrowed: Vec<String> = narrowed.iter().map(|s| s.to_string()).collect();
            list.retain(|tag| narrowed.contains(tag));
            if list.is_empty() {
                return Err(anyhow::Error::new(EngineError::CuArchNotCandidate {
                    cu: cu.to_string(),
                    arch: narrowed.join(", "),
                }));
            }
        }
    }

    Ok(list)
}

/// Attempt one architecture: regenerate-on-demand, compose, solve.
/// Returns `None` for a non-fatal UNSAT in single/sample mode.
fn try_one_arch(
    invocation: &Invocation,
    store: &mut FormulaStore,
    cu_keys: &[KbuildKey],
    arch_tag: &str,
) -> Result<Option<Attempt>> {
    let (kconfig_bundle, extract) = load_kconfig_inputs(invocation, arch_tag)?;

    let arch_profile = if arch_tag == NULL_ARCH {
        ArchProfile::default()
    } else {
        profile_for(arch_tag)
    };

    let user = UserConstraints {
        define: invocation.define.clone(),
        undefine: invocation.undefine.clone(),
        ad_hoc: invocation.ad_hoc.clone(),
    };

    let problem = compose(
        cu_keys,
        store,
        &kconfig_bundle,
        extract.as_ref(),
        &arch_profile,
        &user,
        invocation.allow_config_broken,
    )?;

    let broken_guard: Option<Formula> = if invocation.allow_config_broken {
        None
    } else {
        Some(Formula::var("CONFIG_BROKEN").not())
    };

    let mut session = SmtSession::start(&invocation.solver_bin, invocation.random_seed)
        .context("starting SMT solver session")?;
    session.assert_hard(&problem.constraints, broken_guard.as_ref())?;

    let models = match &invocation.mode {
        Mode::Single => match session.check_single(invocation.show_unsat_core)? {
            Some(model) => vec![model],
            None => return Ok(None),
        },
        Mode::Sample { n } => {
            let models = session.sample(*n)?;
            if models.is_empty() {
                return Ok(None);
            }
            models
        }
        Mode::Approximate { reference_config } => {
            let assumptions = solver::parse_reference_config(reference_config);
            vec![session.approximate(assumptions, &problem.user_specified_option_names)?]
        }
    };

    Ok(Some(Attempt {
        models,
        extract,
        user_specified_option_names: problem.user_specified_option_names,
    }))
}

fn load_kconfig_inputs(
    invocation: &Invocation,
    arch_tag: &str,
) -> Result<(KconfigBundle, Option<KconfigExtract>)> {
    if let Some(path) = &invocation.explicit_kconfig_bundle {
        process::ensure_exists(path, "Kconfig bundle").map_err(|_| {
            anyhow::Error::new(EngineError::KconfigBundleNotFound {
                path: path.display().to_string(),
            })
        })?;
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading Kconfig bundle '{}'", path.display()))?;
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing Kconfig bundle '{}'", path.display()))?;
        let mut bundle = KconfigBundle::new();
        for (option, clauses) in raw {
            let parsed = clauses
                .iter()
                .map(|c| Formula::parse_smtlib2(c))
                .collect::<Result<Vec<_>>>()?;
            bundle.insert(option, parsed);
        }
        let extract = match &invocation.explicit_kconfig_extract {
            Some(path) => KconfigExtract::load(path)?,
            None => None,
        };
        return Ok((bundle, extract));
    }

    let formulas_root = &invocation.formulas_root;
    if let Some(srctree) = &invocation.srctree {
        FormulaStore::ensure_kconfig_bundle_for(formulas_root, arch_tag, srctree)
            .context("regenerating Kconfig bundle on demand")?;
    }

    let bundle = FormulaStore::load_kconfig_for(formulas_root, arch_tag)?;
    let extract_path = kconfig_extract_path(formulas_root, arch_tag);
    let mut extract = KconfigExtract::load(&extract_path)?;
    if invocation.allow_non_visibles {
        if let Some(extract) = extract.as_mut() {
            extract.allow_non_visible();
        }
    }
    Ok((bundle, extract))
}

fn write_attempt(invocation: &Invocation, _arch_tag: &str, attempt: &Attempt) -> Result<()> {
    match &invocation.mode {
        Mode::Sample { .. } => {
            let prefix = invocation.sample_prefix.as_deref().unwrap_or("sample");
            for (i, model) in attempt.models.iter().enumerate() {
                let path = Path::new(&format!("{}{}", prefix, i + 1)).to_path_buf();
                let rendered = emit::render(
                    model,
                    attempt.extract.as_ref(),
                    invocation.modules_mode,
                    &attempt.user_specified_option_names,
                );
                fs::write(&path, rendered)
                    .with_context(|| format!("writing '{}'", path.display()))?;
            }
        }
        _ => {
            if let Some(model) = attempt.models.first() {
                let rendered = emit::render(
                    model,
                    attempt.extract.as_ref(),
                    invocation.modules_mode,
                    &attempt.user_specified_option_names,
                );
                fs::write(&invocation.output_path, rendered)
                    .with_context(|| format!("writing '{}'", invocation.output_path.display()))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arch_list_is_priority_order() {
        let invocation = Invocation::default();
        let list = build_arch_list(&invocation, &[]).unwrap();
        assert_eq!(
            list,
            PRIORITY_ARCHITECTURES.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn arch_prefixed_cu_narrows_and_empty_intersection_fails() {
        let mut invocation = Invocation::default();
        invocation.archs = vec!["x86_64".to_string()];
        let cu = KbuildKey::new("arch/arm/foo.o");
        assert!(build_arch_list(&invocation, &[cu]).is_err());
    }

    #[test]
    fn multiple_explicit_archs_without_cu_is_rejected() {
        let mut invocation = Invocation::default();
        invocation.archs = vec!["x86_64".to_string(), "arm".to_string()];
        let err = build_arch_list(&invocation, &[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>().map(EngineError::exit_code),
            Some(8)
        );
    }

    #[test]
    fn multiple_explicit_archs_without_cu_is_allowed_with_report_all() {
        let mut invocation = Invocation::default();
        invocation.archs = vec!["x86_64".to_string(), "arm".to_string()];
        invocation.report_all = true;
        assert!(build_arch_list(&invocation, &[]).is_ok());
    }

    #[test]
    fn explicit_kconfig_bundle_yields_null_arch_singleton() {
        let mut invocation = Invocation::default();
        invocation.explicit_kconfig_bundle = Some(std::path::PathBuf::from("/tmp/bundle"));
        let list = build_arch_list(&invocation, &[]).unwrap();
        assert_eq!(list, vec![NULL_ARCH.to_string()]);
    }

    #[test]
    fn try_all_appends_unspecified_archs_in_declaration_order() {
        let mut invocation = Invocation::default();
        invocation.archs = vec!["mips".to_string()];
        invocation.try_all = true;
        let list = build_arch_list(&invocation, &[]).unwrap();
        assert_eq!(list.first(), Some(&"mips".to_string()));
        assert_eq!(list.len(), ARCHITECTURES.len());
    }
}
