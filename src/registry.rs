//! Action Space Registry.
//!
//! Backends and their action-space kinds are closed enums. Materializing a backend's
//! spaces walks its kinds in declaration order, so client-visible indices are stable
//! across runs. Any defect found while building is a [`ConfigurationError`] and aborts
//! service startup.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::backends::{example, llvm};
use crate::error::ConfigurationError;
use crate::session::SessionBackend;
use crate::spaces::{
    first_duplicate_name, ActionSpace, ObservationSpace, SpaceDescriptor, SpaceError,
};

/// Compiler backends known to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Example,
    Llvm,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Example, BackendKind::Llvm];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Example => "example",
            Self::Llvm => "llvm",
        }
    }

    /// Action-space kinds of this backend, in declaration order.
    #[must_use]
    pub fn action_space_kinds(self) -> &'static [ActionSpaceKind] {
        match self {
            Self::Example => &[ActionSpaceKind::ExampleDefault],
            Self::Llvm => &[
                ActionSpaceKind::LlvmPassesAll,
                ActionSpaceKind::LlvmOptimizationLevels,
            ],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == id.trim())
            .ok_or_else(|| ConfigurationError::UnknownBackend {
                id: id.to_string(),
                available: Self::ALL
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Statically known action-space kinds across all backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSpaceKind {
    ExampleDefault,
    LlvmPassesAll,
    LlvmOptimizationLevels,
}

impl ActionSpaceKind {
    #[must_use]
    pub fn backend(self) -> BackendKind {
        match self {
            Self::ExampleDefault => BackendKind::Example,
            Self::LlvmPassesAll | Self::LlvmOptimizationLevels => BackendKind::Llvm,
        }
    }

    /// Name under which the space is published.
    #[must_use]
    pub fn space_name(self) -> &'static str {
        match self {
            Self::ExampleDefault => "default",
            Self::LlvmPassesAll => "PassesAll",
            Self::LlvmOptimizationLevels => "OptimizationLevels",
        }
    }
}

/// Choices of the example backend's only action space.
pub const EXAMPLE_CHOICES: [&str; 3] = ["a", "b", "c"];

/// Whole-pipeline optimization levels.
pub const LLVM_OPTIMIZATION_LEVELS: [&str; 6] = ["-O0", "-O1", "-O2", "-O3", "-Os", "-Oz"];

/// Individually invocable LLVM transformation passes, in catalog order.
pub const LLVM_PASSES: &[&str] = &[
    "add-discriminators",
    "adce",
    "aggressive-instcombine",
    "alignment-from-assumptions",
    "always-inline",
    "argpromotion",
    "attributor",
    "barrier",
    "bdce",
    "break-crit-edges",
    "simplifycfg",
    "callsite-splitting",
    "called-value-propagation",
    "canonicalize-aliases",
    "consthoist",
    "constmerge",
    "constprop",
    "coro-cleanup",
    "coro-early",
    "coro-elide",
    "coro-split",
    "correlated-propagation",
    "cross-dso-cfi",
    "deadargelim",
    "dce",
    "die",
    "dse",
    "reg2mem",
    "div-rem-pairs",
    "early-cse-memssa",
    "early-cse",
    "elim-avail-extern",
    "ee-instrument",
    "flattencfg",
    "float2int",
    "forceattrs",
    "inline",
    "insert-gcov-profiling",
    "gvn-hoist",
    "gvn",
    "globaldce",
    "globalopt",
    "globalsplit",
    "guard-widening",
    "hotcoldsplit",
    "ipconstprop",
    "ipsccp",
    "indvars",
    "irce",
    "infer-address-spaces",
    "inferattrs",
    "inject-tli-mappings",
    "instsimplify",
    "instcombine",
    "instnamer",
    "jump-threading",
    "lcssa",
    "licm",
    "libcalls-shrinkwrap",
    "load-store-vectorizer",
    "loop-data-prefetch",
    "loop-deletion",
    "loop-distribute",
    "loop-fusion",
    "loop-guard-widening",
    "loop-idiom",
    "loop-instsimplify",
    "loop-interchange",
    "loop-load-elim",
    "loop-predication",
    "loop-reroll",
    "loop-rotate",
    "loop-simplifycfg",
    "loop-simplify",
    "loop-sink",
    "loop-reduce",
    "loop-unroll-and-jam",
    "loop-unroll",
    "loop-unswitch",
    "loop-vectorize",
    "loop-versioning-licm",
    "loop-versioning",
    "loweratomic",
    "lower-constant-intrinsics",
    "lower-expect",
    "lower-guard-intrinsic",
    "lowerinvoke",
    "lower-matrix-intrinsics",
    "lowerswitch",
    "lower-widenable-condition",
    "memcpyopt",
    "mergefunc",
    "mergeicmps",
    "mldst-motion",
    "sancov",
    "name-anon-globals",
    "nary-reassociate",
    "newgvn",
    "pgo-memop-opt",
    "partial-inliner",
    "partially-inline-libcalls",
    "post-inline-ee-instrument",
    "functionattrs",
    "mem2reg",
    "prune-eh",
    "reassociate",
    "redundant-dbg-inst-elim",
    "rpo-functionattrs",
    "rewrite-statepoints-for-gc",
    "sccp",
    "slp-vectorizer",
    "sroa",
    "scalarizer",
    "separate-const-offset-from-gep",
    "simple-loop-unswitch",
    "sink",
    "speculative-execution",
    "slsr",
    "strip-dead-prototypes",
    "strip-debug-declare",
    "strip-nondebug",
    "strip",
    "tailcallelim",
    "mergereturn",
];

static LLVM_PASS_FLAGS: Lazy<Arc<[String]>> =
    Lazy::new(|| LLVM_PASSES.iter().map(|pass| format!("-{pass}")).collect());

/// Commandline flags for [`LLVM_PASSES`], built once and shared.
#[must_use]
pub fn llvm_pass_flags() -> Arc<[String]> {
    Arc::clone(&LLVM_PASS_FLAGS)
}

/// Materializes one action space of `backend`.
pub fn build_action_space(
    backend: BackendKind,
    kind: ActionSpaceKind,
) -> Result<ActionSpace, ConfigurationError> {
    if kind.backend() != backend {
        return Err(ConfigurationError::UnreachableSpaceKind {
            backend: backend.as_str(),
            kind: kind.space_name(),
        });
    }

    let descriptor = match kind {
        ActionSpaceKind::ExampleDefault => SpaceDescriptor::named_discrete(EXAMPLE_CHOICES),
        ActionSpaceKind::LlvmPassesAll => {
            SpaceDescriptor::commandline_flags(llvm_pass_flags().iter().cloned())
        }
        ActionSpaceKind::LlvmOptimizationLevels => {
            SpaceDescriptor::named_discrete(LLVM_OPTIMIZATION_LEVELS)
        }
    }
    .map_err(|source| ConfigurationError::InvalidSpace {
        backend: backend.as_str(),
        space: kind.space_name().to_string(),
        source,
    })?;

    Ok(ActionSpace::new(kind.space_name(), descriptor))
}

/// Materializes every action space of `backend`, in declaration order.
pub fn build_action_spaces(backend: BackendKind) -> Result<Vec<ActionSpace>, ConfigurationError> {
    build_action_spaces_from(backend, backend.action_space_kinds())
}

fn build_action_spaces_from(
    backend: BackendKind,
    kinds: &[ActionSpaceKind],
) -> Result<Vec<ActionSpace>, ConfigurationError> {
    let spaces = kinds
        .iter()
        .map(|kind| build_action_space(backend, *kind))
        .collect::<Result<Vec<_>, _>>()?;

    if spaces.is_empty() {
        return Err(ConfigurationError::NoActionSpaces {
            backend: backend.as_str(),
        });
    }
    if let Some(name) = first_duplicate_name(spaces.iter().map(|space| space.name.as_str())) {
        return Err(ConfigurationError::DuplicateSpaceName {
            backend: backend.as_str(),
            name: name.to_string(),
        });
    }

    Ok(spaces)
}

fn validate_observation_spaces(
    backend: BackendKind,
    spaces: &[ObservationSpace],
) -> Result<(), ConfigurationError> {
    if let Some(name) = first_duplicate_name(spaces.iter().map(|space| space.name.as_str())) {
        return Err(ConfigurationError::DuplicateSpaceName {
            backend: backend.as_str(),
            name: name.to_string(),
        });
    }

    for space in spaces {
        if let Some(default) = &space.default_observation {
            space.descriptor.check(default).map_err(|source| {
                ConfigurationError::InvalidDefaultObservation {
                    backend: backend.as_str(),
                    space: space.name.clone(),
                    source,
                }
            })?;
        }
    }

    Ok(())
}

/// Options applied to every built-in backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Number of actions after which an episode ends. `None` never ends.
    pub episode_length: Option<u64>,
}

struct RegisteredBackend {
    action_spaces: Arc<[ActionSpace]>,
    observation_spaces: Arc<[ObservationSpace]>,
    backend: Arc<dyn SessionBackend>,
}

/// Immutable spaces and backend instances for every [`BackendKind`].
///
/// Built once per service and shared by reference with every session.
pub struct SpaceRegistry {
    example: RegisteredBackend,
    llvm: RegisteredBackend,
}

impl SpaceRegistry {
    pub fn build(options: &RegistryOptions) -> Result<Self, ConfigurationError> {
        Ok(Self {
            example: register(BackendKind::Example, options)?,
            llvm: register(BackendKind::Llvm, options)?,
        })
    }

    fn entry(&self, kind: BackendKind) -> &RegisteredBackend {
        match kind {
            BackendKind::Example => &self.example,
            BackendKind::Llvm => &self.llvm,
        }
    }

    #[must_use]
    pub fn action_spaces(&self, kind: BackendKind) -> Arc<[ActionSpace]> {
        Arc::clone(&self.entry(kind).action_spaces)
    }

    #[must_use]
    pub fn observation_spaces(&self, kind: BackendKind) -> Arc<[ObservationSpace]> {
        Arc::clone(&self.entry(kind).observation_spaces)
    }

    #[must_use]
    pub fn backend(&self, kind: BackendKind) -> Arc<dyn SessionBackend> {
        Arc::clone(&self.entry(kind).backend)
    }
}

fn register(
    kind: BackendKind,
    options: &RegistryOptions,
) -> Result<RegisteredBackend, ConfigurationError> {
    let action_spaces: Arc<[ActionSpace]> = build_action_spaces(kind)?.into();
    let invalid_space = |space: &str| {
        let space = space.to_string();
        move |source: SpaceError| ConfigurationError::InvalidSpace {
            backend: kind.as_str(),
            space,
            source,
        }
    };

    let backend: Arc<dyn SessionBackend> = match kind {
        BackendKind::Example => Arc::new(
            example::ExampleBackend::new(Arc::clone(&action_spaces), options.episode_length)
                .map_err(invalid_space("observation spaces"))?,
        ),
        BackendKind::Llvm => Arc::new(
            llvm::LlvmBackend::new(Arc::clone(&action_spaces), options.episode_length)
                .map_err(invalid_space("observation spaces"))?,
        ),
    };

    let observation_spaces = backend.observation_spaces();
    validate_observation_spaces(kind, &observation_spaces)?;
    tracing::debug!(
        backend = kind.as_str(),
        action_spaces = action_spaces.len(),
        observation_spaces = observation_spaces.len(),
        "registered backend"
    );

    Ok(RegisteredBackend {
        action_spaces,
        observation_spaces,
        backend,
    })
}
