//! Command-line surface: hand-rolled flag parsing over a plain
//! `Vec<String>`, matching `bin/distro-builder.rs`'s convention of
//! slicing `std::env::args()` directly rather than reaching for an
//! argument-parsing crate.

use crate::compose::UserConstraints;
use crate::error::EngineError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The solving strategy requested on the command line, mutually
/// exclusive by construction.
#[derive(Debug, Clone)]
pub enum Mode {
    Single,
    Sample { n: usize },
    Approximate { reference_config: String },
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Single
    }
}

/// Every parsed flag and positional argument, resolved to the values the
/// orchestrator needs directly.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub cu_paths: Vec<String>,
    pub formulas_root: PathBuf,
    pub kbuild_cache_override: Option<PathBuf>,
    pub explicit_kconfig_bundle: Option<PathBuf>,
    pub explicit_kconfig_extract: Option<PathBuf>,
    pub ad_hoc: Vec<(String, bool)>,
    pub archs: Vec<String>,
    pub try_all: bool,
    pub report_all: bool,
    pub output_path: PathBuf,
    pub mode: Mode,
    pub modules_mode: bool,
    pub show_unsat_core: bool,
    pub define: Vec<String>,
    pub undefine: Vec<String>,
    pub allow_config_broken: bool,
    pub allow_non_visibles: bool,
    pub view_kbuild: bool,
    pub sample_prefix: Option<String>,
    pub random_seed: Option<u64>,
    pub solver_bin: String,
    /// Kernel source tree root, for on-demand Kbuild/Kconfig regeneration.
    /// `None` disables regeneration; missing caches are then hard failures.
    pub srctree: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn kbuild_cache_path(&self) -> PathBuf {
        self.kbuild_cache_override
            .clone()
            .unwrap_or_else(|| self.formulas_root.join("kmax"))
    }
}

/// Parse `args` (as returned by `std::env::args().skip(1)`) into an
/// [`Invocation`], validating the mutually-exclusive-flag rules.
pub fn parse(args: &[String], cwd: PathBuf) -> Result<Invocation> {
    let mut invocation = Invocation {
        output_path: PathBuf::from(".config"),
        solver_bin: "z3".to_string(),
        cwd,
        ..Invocation::default()
    };

    let mut sample_n: Option<usize> = None;
    let mut reference_config_path: Option<PathBuf> = None;
    let mut ad_hoc_file: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        macro_rules! next_value {
            () => {{
                i += 1;
                args.get(i).ok_or_else(|| {
                    anyhow::Error::new(EngineError::InvalidFlagCombination {
                        detail: format!("'{}' requires a value", arg),
                    })
                })?
            }};
        }

        match arg.as_str() {
            "--version" => {
                println!("{}", VERSION);
                invocation.cu_paths.clear();
                return Ok(invocation);
            }
            "--formulas-root" => invocation.formulas_root = PathBuf::from(next_value!()),
            "--kbuild-cache" => invocation.kbuild_cache_override = Some(PathBuf::from(next_value!())),
            "--kconfig-bundle" => invocation.explicit_kconfig_bundle = Some(PathBuf::from(next_value!())),
            "--kconfig-extract" => invocation.explicit_kconfig_extract = Some(PathBuf::from(next_value!())),
            "--ad-hoc-file" => ad_hoc_file = Some(PathBuf::from(next_value!())),
            "--arch" => invocation.archs.push(next_value!().clone()),
            "--all" => invocation.try_all = true,
            "--report-all" => invocation.report_all = true,
            "-o" | "--output" => invocation.output_path = PathBuf::from(next_value!()),
            "--reference-config" => reference_config_path = Some(PathBuf::from(next_value!())),
            "--modules" => invocation.modules_mode = true,
            "--show-unsat-core" => invocation.show_unsat_core = true,
            "--define" => invocation.define.push(next_value!().clone()),
            "--undefine" => invocation.undefine.push(next_value!().clone()),
            "--allow-config-broken" => invocation.allow_config_broken = true,
            "--allow-non-visibles" => invocation.allow_non_visibles = true,
            "--view-kbuild" => invocation.view_kbuild = true,
            "--sample" => {
                sample_n = Some(next_value!().parse().map_err(|_| {
                    anyhow::Error::new(EngineError::InvalidFlagCombination {
                        detail: "--sample requires a positive integer".to_string(),
                    })
                })?)
            }
            "--sample-prefix" => invocation.sample_prefix = Some(next_value!().clone()),
            "--random-seed" => {
                invocation.random_seed = Some(next_value!().parse().map_err(|_| {
                    anyhow::Error::new(EngineError::InvalidFlagCombination {
                        detail: "--random-seed requires an integer".to_string(),
                    })
                })?)
            }
            "--solver" => invocation.solver_bin = next_value!().clone(),
            "--srctree" => invocation.srctree = Some(PathBuf::from(next_value!())),
            other if other.starts_with('-') && other != "-" => {
                return Err(anyhow::Error::new(EngineError::InvalidFlagCombination {
                    detail: format!("unrecognized flag '{}'", other),
                }));
            }
            positional => invocation.cu_paths.push(positional.to_string()),
        }
        i += 1;
    }

    if let Some(path) = &ad_hoc_file {
        let contents = fs::read_to_string(path)?;
        invocation.ad_hoc = UserConstraints::parse_ad_hoc_file(&contents);
    }

    validate_and_finalize_mode(&mut invocation, sample_n, reference_config_path)?;
    Ok(invocation)
}

fn validate_and_finalize_mode(
    invocation: &mut Invocation,
    sample_n: Option<usize>,
    reference_config_path: Option<PathBuf>,
) -> Result<()> {
    if invocation.explicit_kconfig_bundle.is_some() && (!invocation.archs.is_empty() || invocation.try_all) {
        return Err(anyhow::Error::new(EngineError::InvalidFlagCombination {
            detail: "--kconfig-bundle cannot be combined with --arch or --all".to_string(),
        }));
    }

    match (sample_n, reference_config_path) {
        (Some(_), Some(_)) => {
            return Err(anyhow::Error::new(EngineError::InvalidFlagCombination {
                detail: "--sample and --reference-config are mutually exclusive".to_string(),
            }));
        }
        (Some(n), None) => {
            if n < 2 {
                return Err(anyhow::Error::new(EngineError::InvalidFlagCombination {
                    detail: "--sample requires N >= 2".to_string(),
                }));
            }
            invocation.mode = Mode::Sample { n };
        }
        (None, Some(path)) => {
            let contents = fs::read_to_string(&path)?;
            invocation.mode = Mode::Approximate { reference_config: contents };
        }
        (None, None) => invocation.mode = Mode::Single,
    }

    Ok(())
}

pub fn usage() -> &'static str {
    "Usage: ksynth [CU ...] [flags]\n\
     \n\
     Positional:\n\
     \x20 CU ...                  compilation units to satisfy (e.g. kernel/kcmp.o)\n\
     \n\
     Flags:\n\
     \x20 --formulas-root DIR      root holding kmax/ and kclause/ caches\n\
     \x20 --kbuild-cache FILE      override the Kbuild formula cache path\n\
     \x20 --kconfig-bundle FILE    use an explicit Kconfig bundle (skips arch profiles)\n\
     \x20 --kconfig-extract FILE   use an explicit Kconfig extract\n\
     \x20 --ad-hoc-file FILE       NAME/!NAME constraints, one per line\n\
     \x20 --arch TAG               try this architecture (repeatable)\n\
     \x20 --all                    also try every other known architecture\n\
     \x20 --report-all             report every satisfying architecture, don't stop at the first\n\
     \x20 -o, --output FILE        output .config path (default .config)\n\
     \x20 --reference-config FILE  approximate mode: relax this reference .config\n\
     \x20 --modules                render tristate positives as =m\n\
     \x20 --show-unsat-core        print the unsat core on UNSAT\n\
     \x20 --define NAME            force NAME on (repeatable)\n\
     \x20 --undefine NAME          force NAME off (repeatable)\n\
     \x20 --allow-config-broken    do not guard against CONFIG_BROKEN\n\
     \x20 --allow-non-visibles     disable Kconfig visibility filtering\n\
     \x20 --view-kbuild            print Kbuild chain conditions for the given CUs and exit\n\
     \x20 --sample N               sample N models instead of stopping at the first\n\
     \x20 --sample-prefix PREFIX   output file prefix for --sample (default 'sample')\n\
     \x20 --random-seed N          pin the solver's random seed\n\
     \x20 --solver BIN             solver binary to invoke (default z3)\n\
     \x20 --srctree DIR            kernel source tree, enables on-demand regeneration\n\
     \x20 --version                print the version and exit"
}
