//! Architecture profile: the hard-coded per-architecture constraint bundle
//! and CU-directory arch subsetting.
//!
//! The per-architecture policy table is exhaustive and is itself a
//! contract; it is modeled as an immutable, program-wide table passed
//! explicitly rather than looked up from global state, following the
//! same table-of-trait-implementors shape as
//! `build::context::InitSystem`/`DistroConfig` pairing.

use crate::formula::Formula;

/// Canonical architecture tags, in declaration order. The first eight are
/// the default try-order; the remainder are reached only via `--arch` or
/// `--all`.
pub const ARCHITECTURES: &[&str] = &[
    "x86_64", "i386", "arm", "arm64", "sparc64", "sparc", "powerpc", "mips", "sh", "sh64", "um",
    "um32",
];

/// The default try-order used when the user supplies no `--arch` flags.
pub const PRIORITY_ARCHITECTURES: &[&str] =
    &["x86_64", "i386", "arm", "arm64", "sparc64", "sparc", "powerpc", "mips"];

/// Every family-level `CONFIG_*` option that selects a target architecture.
pub const ARCH_DEFINING_OPTIONS: &[&str] = &[
    "CONFIG_X86",
    "CONFIG_ARM",
    "CONFIG_ARM64",
    "CONFIG_SUPERH",
    "CONFIG_SPARC",
    "CONFIG_PPC",
    "CONFIG_MIPS",
    "CONFIG_UML",
];

/// `arch/<subdir>` → the set of architecture tags valid under it.
const ARCH_SUBDIR_MAP: &[(&str, &[&str])] = &[
    ("um", &["um", "um32"]),
    ("x86", &["x86_64", "i386"]),
    ("powerpc", &["powerpc"]),
    ("sh", &["sh", "sh64"]),
    ("sparc", &["sparc", "sparc64"]),
    ("arm", &["arm"]),
    ("arm64", &["arm64"]),
    ("mips", &["mips"]),
];

/// The literal bundle that pins the logical model to one architecture.
#[derive(Debug, Clone, Default)]
pub struct ArchProfile {
    /// `CONFIG_*` options forced on.
    pub positive: Vec<String>,
    /// `CONFIG_*` options forced off, including every other
    /// arch-defining option.
    pub negative: Vec<String>,
    /// Non-Boolean pins forced on, e.g. `BITS=64`.
    pub extra_positive: Vec<(String, i64)>,
    /// Non-Boolean pins forced off, e.g. `-BITS=32`.
    pub extra_negative: Vec<(String, i64)>,
}

impl ArchProfile {
    /// Render the whole bundle as one conjoined [`Formula`].
    pub fn to_formula(&self) -> Formula {
        let mut parts = Vec::new();
        for name in &self.positive {
            parts.push(Formula::var(name));
        }
        for name in &self.negative {
            parts.push(Formula::var(name).not());
        }
        for (name, value) in &self.extra_positive {
            parts.push(Formula::Eq(name.clone(), *value));
        }
        for (name, value) in &self.extra_negative {
            parts.push(Formula::Eq(name.clone(), *value).not());
        }
        Formula::and(parts)
    }

    fn disable_other_arch_defining(keep: &[&str]) -> Vec<String> {
        ARCH_DEFINING_OPTIONS
            .iter()
            .filter(|opt| !keep.contains(opt))
            .map(|s| s.to_string())
            .collect()
    }
}

/// Build the architecture profile for `tag`, per the exhaustive policy
/// table above.
pub fn profile_for(tag: &str) -> ArchProfile {
    match tag {
        "x86_64" => ArchProfile {
            positive: vec!["CONFIG_X86".into(), "CONFIG_X86_64".into()],
            negative: {
                let mut n = vec!["CONFIG_X86_32".into()];
                n.extend(ArchProfile::disable_other_arch_defining(&["CONFIG_X86"]));
                n
            },
            extra_positive: vec![("BITS".into(), 64)],
            extra_negative: vec![("BITS".into(), 32)],
        },
        "i386" => ArchProfile {
            positive: vec!["CONFIG_X86".into(), "CONFIG_X86_32".into()],
            negative: {
                let mut n = vec!["CONFIG_X86_64".into()];
                n.extend(ArchProfile::disable_other_arch_defining(&["CONFIG_X86"]));
                n
            },
            extra_positive: vec![("BITS".into(), 32)],
            extra_negative: vec![("BITS".into(), 64)],
        },
        "powerpc" => ArchProfile {
            positive: vec!["CONFIG_PPC".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_PPC"]),
            extra_positive: vec![],
            extra_negative: vec![],
        },
        "sh" => ArchProfile {
            positive: vec!["CONFIG_SUPERH".into()],
            negative: {
                let mut n = vec![];
                n.extend(ArchProfile::disable_other_arch_defining(&["CONFIG_SUPERH"]));
                n
            },
            extra_positive: vec![("BITS".into(), 32)],
            extra_negative: vec![("BITS".into(), 64)],
        },
        "sh64" => ArchProfile {
            positive: vec!["CONFIG_SUPERH".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_SUPERH"]),
            extra_positive: vec![("BITS".into(), 64)],
            extra_negative: vec![("BITS".into(), 32)],
        },
        "sparc" => ArchProfile {
            positive: vec!["CONFIG_SPARC".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_SPARC"]),
            extra_positive: vec![("BITS".into(), 32)],
            extra_negative: vec![("BITS".into(), 64)],
        },
        "sparc64" => ArchProfile {
            positive: vec!["CONFIG_SPARC".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_SPARC"]),
            extra_positive: vec![("BITS".into(), 64)],
            extra_negative: vec![("BITS".into(), 32)],
        },
        "um" => ArchProfile {
            positive: vec!["CONFIG_UML".into(), "CONFIG_X86".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_UML", "CONFIG_X86"]),
            extra_positive: vec![("BITS".into(), 32)],
            extra_negative: vec![("BITS".into(), 64)],
        },
        "um32" => ArchProfile {
            positive: vec!["CONFIG_UML".into(), "CONFIG_X86".into()],
            negative: ArchProfile::disable_other_arch_defining(&["CONFIG_UML", "CONFIG_X86"]),
            extra_positive: vec![("BITS".into(), 32)],
            extra_negative: vec![("BITS".into(), 64)],
        },
        other => {
            let primary = format!("CONFIG_{}", other.to_ascii_uppercase());
            ArchProfile {
                negative: ArchProfile::disable_other_arch_defining(&[primary.as_str()]),
                positive: vec![primary],
                extra_positive: vec![],
                extra_negative: vec![],
            }
        }
    }
}

/// Narrow the candidate architecture list to those valid for a CU whose
/// key begins with `arch/`. Returns `None` if the CU isn't under `arch/`,
/// meaning no narrowing applies.
pub fn archs_for_cu_path(cu_key: &str) -> Option<Vec<&'static str>> {
    let rest = cu_key.strip_prefix("arch/")?;
    let subdir = rest.split('/').next().unwrap_or("");
    ARCH_SUBDIR_MAP
        .iter()
        .find(|(name, _)| *name == subdir)
        .map(|(_, archs)| archs.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x86_64_profile_is_exclusive() {
        let profile = profile_for("x86_64");
        assert!(profile.positive.contains(&"CONFIG_X86".to_string()));
        assert!(profile.positive.contains(&"CONFIG_X86_64".to_string()));
        assert!(profile.negative.contains(&"CONFIG_X86_32".to_string()));
        // Every other family's primary option must be disabled.
        for opt in ARCH_DEFINING_OPTIONS {
            if *opt != "CONFIG_X86" {
                assert!(profile.negative.contains(&opt.to_string()), "{opt} not disabled");
            }
        }
        assert!(profile.extra_positive.contains(&("BITS".to_string(), 64)));
        assert!(profile.extra_negative.contains(&("BITS".to_string(), 32)));
    }

    #[test]
    fn i386_is_symmetric_to_x86_64() {
        let profile = profile_for("i386");
        assert!(profile.positive.contains(&"CONFIG_X86_32".to_string()));
        assert!(profile.negative.contains(&"CONFIG_X86_64".to_string()));
        assert!(profile.extra_positive.contains(&("BITS".to_string(), 32)));
    }

    #[test]
    fn powerpc_leaves_ppc32_ppc64_free() {
        let profile = profile_for("powerpc");
        assert_eq!(profile.positive, vec!["CONFIG_PPC".to_string()]);
        assert!(!profile.negative.iter().any(|n| n.contains("PPC32") || n.contains("PPC64")));
    }

    #[test]
    fn um_keeps_both_uml_and_x86() {
        let profile = profile_for("um");
        assert!(profile.positive.contains(&"CONFIG_UML".to_string()));
        assert!(profile.positive.contains(&"CONFIG_X86".to_string()));
        assert!(!profile.negative.contains(&"CONFIG_UML".to_string()));
        assert!(!profile.negative.contains(&"CONFIG_X86".to_string()));
    }

    #[test]
    fn generic_tag_follows_uppercase_rule() {
        let profile = profile_for("mips");
        assert_eq!(profile.positive, vec!["CONFIG_MIPS".to_string()]);
    }

    #[test]
    fn arch_prefixed_cu_narrows_candidates() {
        assert_eq!(archs_for_cu_path("arch/x86/kernel/head.o"), Some(vec!["x86_64", "i386"]));
        assert_eq!(archs_for_cu_path("arch/um/drivers/foo.o"), Some(vec!["um", "um32"]));
        assert_eq!(archs_for_cu_path("kernel/kcmp.o"), None);
    }
}
