//! Constraint composer: builds the full flat constraint list for one
//! (compilation-unit-set, architecture) attempt.

use crate::arch::ArchProfile;
use crate::formula::{Formula, FormulaStore, KconfigBundle};
use crate::kconfig::KconfigExtract;
use crate::types::KbuildKey;
use anyhow::Result;
use std::collections::{BTreeSet, HashSet};

/// The three user-supplied constraint inputs: `--define`, `--undefine`,
/// and an ad-hoc `NAME`/`!NAME` file.
#[derive(Debug, Clone, Default)]
pub struct UserConstraints {
    pub define: Vec<String>,
    pub undefine: Vec<String>,
    /// `(name, positive)` pairs parsed from the ad-hoc constraints file.
    pub ad_hoc: Vec<(String, bool)>,
}

impl UserConstraints {
    /// Parse an ad-hoc constraints file: one token per line, `NAME` forces
    /// on, `!NAME` forces off, blank lines ignored.
    pub fn parse_ad_hoc_file(contents: &str) -> Vec<(String, bool)> {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_prefix('!') {
                Some(name) => (name.to_string(), false),
                None => (line.to_string(), true),
            })
            .collect()
    }
}

/// The output of one constraint-composition pass.
#[derive(Debug, Clone)]
pub struct ComposedProblem {
    /// Every constraint that must hold, in composition order.
    pub constraints: Vec<Formula>,
    /// Names contributed by `--define`/`--undefine`/the ad-hoc file — the
    /// privileged set approximate mode treats as immovable. Always a set.
    pub user_specified_option_names: HashSet<String>,
}

/// Compose the full constraint list for `cu_keys` under `arch_profile`.
///
/// `extract` is `None` when no Kconfig extract is available for this
/// architecture (degraded mode: the unknown-symbol negation step is
/// skipped since there's no type table to check against).
pub fn compose(
    cu_keys: &[KbuildKey],
    store: &FormulaStore,
    kconfig_bundle: &KconfigBundle,
    extract: Option<&KconfigExtract>,
    arch_profile: &ArchProfile,
    user: &UserConstraints,
    allow_config_broken: bool,
) -> Result<ComposedProblem> {
    let mut constraints = Vec::new();
    let mut kbuild_bool_symbols = BTreeSet::new();
    let mut kbuild_int_symbols = BTreeSet::new();

    // Step 1: each CU's own formula conjoined with every ancestor's.
    for cu in cu_keys {
        let mut chain = vec![store.formula_for(cu)?];
        for ancestor in cu.ancestors() {
            chain.push(store.formula_for(&ancestor)?);
        }
        for formula in &chain {
            formula.free_symbols(&mut kbuild_bool_symbols, &mut kbuild_int_symbols);
        }
        constraints.push(Formula::and(chain));
    }

    // Step 2: negate any propositional variable Kbuild references but this
    // arch's Kconfig doesn't know about. Eq-typed pins are left alone —
    // they aren't propositional variables the extract's type table covers.
    if let Some(extract) = extract {
        for symbol in &kbuild_bool_symbols {
            if !extract.types.contains_key(symbol) {
                constraints.push(Formula::var(symbol.clone()).not());
            }
        }
    }

    // Step 3: every Kconfig clause.
    for clauses in kconfig_bundle.values() {
        constraints.extend(clauses.iter().cloned());
    }

    // Steps 4-5: ad-hoc file, then define/undefine, tracking names.
    let mut user_specified_option_names = HashSet::new();
    for (name, positive) in &user.ad_hoc {
        user_specified_option_names.insert(name.clone());
        constraints.push(literal(name, *positive));
    }
    for name in &user.define {
        user_specified_option_names.insert(name.clone());
        constraints.push(literal(name, true));
    }
    for name in &user.undefine {
        user_specified_option_names.insert(name.clone());
        constraints.push(literal(name, false));
    }

    // Step 6: architecture profile.
    constraints.push(arch_profile.to_formula());

    // Step 7: CONFIG_BROKEN guard.
    if !allow_config_broken {
        constraints.push(Formula::var("CONFIG_BROKEN").not());
    }

    Ok(ComposedProblem {
        constraints,
        user_specified_option_names,
    })
}

fn literal(name: &str, positive: bool) -> Formula {
    if positive {
        Formula::var(name)
    } else {
        Formula::var(name).not()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::profile_for;
    use std::collections::BTreeMap;

    fn store_with(entries: &[(&str, &str)]) -> FormulaStore {
        let mut raw = BTreeMap::new();
        for (k, v) in entries {
            raw.insert(k.to_string(), v.to_string());
        }
        FormulaStore::from_raw(raw)
    }

    #[test]
    fn chain_conjoins_ancestor_formula() {
        // obj-$(CONFIG_B) += kcmp.o under an ancestor predicated on
        // !(CONFIG_A=y).
        let store = store_with(&[
            ("kernel/kcmp.o", "CONFIG_B"),
            ("kernel/", "(not CONFIG_A)"),
        ]);
        let problem = compose(
            &[KbuildKey::new("kernel/kcmp.o")],
            &store,
            &KconfigBundle::new(),
            None,
            &ArchProfile::default(),
            &UserConstraints::default(),
            false,
        )
        .unwrap();

        assert_eq!(
            problem.constraints[0],
            Formula::And(vec![Formula::var("CONFIG_B"), Formula::var("CONFIG_A").not()])
        );
    }

    #[test]
    fn unknown_kbuild_symbol_is_negated_when_types_known() {
        let store = store_with(&[("kernel/kcmp.o", "CONFIG_UNKNOWN_OPT")]);
        let mut extract = KconfigExtract::default();
        extract.types.insert("CONFIG_OTHER".to_string(), crate::types::OptionType::Bool);

        let problem = compose(
            &[KbuildKey::new("kernel/kcmp.o")],
            &store,
            &KconfigBundle::new(),
            Some(&extract),
            &ArchProfile::default(),
            &UserConstraints::default(),
            false,
        )
        .unwrap();

        assert!(problem
            .constraints
            .contains(&Formula::var("CONFIG_UNKNOWN_OPT").not()));
    }

    #[test]
    fn config_broken_guard_present_unless_allowed() {
        let store = FormulaStore::default();
        let problem = compose(
            &[],
            &store,
            &KconfigBundle::new(),
            None,
            &profile_for("x86_64"),
            &UserConstraints::default(),
            false,
        )
        .unwrap();
        assert!(problem.constraints.contains(&Formula::var("CONFIG_BROKEN").not()));

        let problem_allowed = compose(
            &[],
            &store,
            &KconfigBundle::new(),
            None,
            &profile_for("x86_64"),
            &UserConstraints::default(),
            true,
        )
        .unwrap();
        assert!(!problem_allowed
            .constraints
            .contains(&Formula::var("CONFIG_BROKEN").not()));
    }

    #[test]
    fn define_and_undefine_are_tracked_by_name() {
        let store = FormulaStore::default();
        let mut user = UserConstraints::default();
        user.define.push("CONFIG_X".to_string());
        user.undefine.push("CONFIG_X".to_string());

        let problem = compose(
            &[],
            &store,
            &KconfigBundle::new(),
            None,
            &ArchProfile::default(),
            &user,
            true,
        )
        .unwrap();

        assert!(problem.user_specified_option_names.contains("CONFIG_X"));
        assert!(problem.constraints.contains(&Formula::var("CONFIG_X")));
        assert!(problem.constraints.contains(&Formula::var("CONFIG_X").not()));
    }

    #[test]
    fn ad_hoc_file_parses_bang_prefixed_negatives() {
        let parsed = UserConstraints::parse_ad_hoc_file("CONFIG_A\n!CONFIG_B\n\n  CONFIG_C  \n");
        assert_eq!(
            parsed,
            vec![
                ("CONFIG_A".to_string(), true),
                ("CONFIG_B".to_string(), false),
                ("CONFIG_C".to_string(), true),
            ]
        );
    }
}
