//! Target Machine Configuration
//!
//! Resolves a module's target triple to a registered [`Target`] and derives
//! the per-instance [`TargetMachineConfig`] the target machine is built from.
//!
//! # Architecture
//!
//! Target triples follow the format: `<arch>-<vendor>-<os>[-<env>]`
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌─────────────────────┐    ┌───────────────┐
//! │ module triple│───▶│ TargetRegistry │───▶│ TargetMachineConfig │───▶│ TargetMachine │
//! └──────────────┘    │ (arch lookup)  │    │ (policies, features)│    └───────────────┘
//!                     └────────────────┘    └─────────────────────┘
//! ```
//!
//! Every policy the code generation engine needs travels in the config;
//! nothing is stored in process-wide state.

use std::fmt;

use rustc_hash::FxHashMap;
use slang_ir::TargetData;

use crate::codegen::{CodegenError, CodegenFileType, CodegenPipeline};
use crate::{BackendOptions, OptimizationLevel, TargetOptions};

/// Error type for target resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// Invalid target triple format.
    #[error("invalid target triple '{triple}': {reason}")]
    InvalidTripleFormat { triple: String, reason: String },
    /// No target is registered for the triple's architecture.
    #[error("no registered target for architecture '{arch}' (triple '{triple}')")]
    UnknownTarget { triple: String, arch: String },
}

/// Parsed components of a target triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTripleComponents {
    /// CPU architecture (e.g., `armv7`, `x86_64`)
    pub arch: String,
    /// Hardware vendor (e.g., `unknown`, `none`)
    pub vendor: String,
    /// Operating system (e.g., `linux`)
    pub os: String,
    /// Environment/ABI (e.g., `gnueabi`) - optional
    pub env: Option<String>,
}

impl TargetTripleComponents {
    /// Parse a target triple string into components.
    ///
    /// Format: `<arch>-<vendor>-<os>[-<env>]`
    pub fn parse(triple: &str) -> Result<Self, TargetError> {
        let parts: Vec<&str> = triple.split('-').collect();

        if parts.len() < 3 || parts[0].is_empty() {
            return Err(TargetError::InvalidTripleFormat {
                triple: triple.to_string(),
                reason: "expected at least 3 components: <arch>-<vendor>-<os>".to_string(),
            });
        }

        Ok(Self {
            arch: parts[0].to_string(),
            vendor: parts[1].to_string(),
            os: parts[2].to_string(),
            env: parts.get(3).map(|s| (*s).to_string()),
        })
    }
}

impl fmt::Display for TargetTripleComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch, self.vendor, self.os)?;
        if let Some(env) = &self.env {
            write!(f, "-{env}")?;
        }
        Ok(())
    }
}

/// Relocation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelocModel {
    #[default]
    Default,
    /// No position independence; every symbol is resolved at compile time.
    Static,
    Pic,
    DynamicNoPic,
}

/// Code model (addressing range assumptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodeModel {
    #[default]
    Default,
    Small,
    Kernel,
    Medium,
    Large,
}

impl CodeModel {
    /// `Medium` when pointers are wider than 32 bits, `Small` otherwise.
    pub fn for_pointer_width(bits: u32) -> Self {
        if bits > 32 {
            Self::Medium
        } else {
            Self::Small
        }
    }
}

/// Floating-point ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FloatAbi {
    #[default]
    Default,
    Soft,
    /// Pass floating-point values in FPU registers.
    Hard,
}

/// Register allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegAllocPolicy {
    /// Fast, lower quality allocation.
    Fast,
    /// Slower, higher quality allocation.
    Quality,
}

impl From<OptimizationLevel> for RegAllocPolicy {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::O0 => Self::Fast,
            _ => Self::Quality,
        }
    }
}

/// Instruction scheduler. Only the target's default is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulerPolicy {
    #[default]
    Default,
}

/// Optimization level used by code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodegenOptLevel {
    None,
    Default,
    Aggressive,
}

impl From<OptimizationLevel> for CodegenOptLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::O0 => Self::None,
            OptimizationLevel::O1 | OptimizationLevel::O2 => Self::Default,
            OptimizationLevel::O3 => Self::Aggressive,
        }
    }
}

/// CPU name plus an ordered set of `+feature` / `-feature` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtargetFeatures {
    cpu: String,
    features: Vec<(String, bool)>,
}

impl SubtargetFeatures {
    pub fn new(cpu: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            features: Vec::new(),
        }
    }

    /// Add a feature; a name without `+`/`-` is enabled.
    ///
    /// A repeated name keeps its first position and takes the latest flag.
    pub fn add_feature(&mut self, feature: &str) {
        let (name, enabled) = parse_feature(feature);
        if name.is_empty() {
            return;
        }
        if let Some(existing) = self.features.iter_mut().find(|(n, _)| n == name) {
            existing.1 = enabled;
        } else {
            self.features.push((name.to_string(), enabled));
        }
    }

    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn features(&self) -> &[(String, bool)] {
        &self.features
    }

    /// The comma-joined feature string, CPU first.
    pub fn get_string(&self) -> String {
        let cpu = (!self.cpu.is_empty()).then(|| self.cpu.clone());
        let flags = self
            .features
            .iter()
            .map(|(name, enabled)| format!("{}{name}", if *enabled { '+' } else { '-' }));
        cpu.into_iter().chain(flags).collect::<Vec<_>>().join(",")
    }

    /// The feature string for `options`; empty unless a CPU or feature was
    /// requested.
    pub fn string_for(options: &TargetOptions) -> String {
        if options.is_empty() {
            return String::new();
        }
        let mut features = Self::new(options.cpu.as_str());
        for feature in &options.features {
            features.add_feature(feature);
        }
        features.get_string()
    }
}

/// Split a feature into its name and enabled flag.
pub fn parse_feature(feature: &str) -> (&str, bool) {
    let feature = feature.trim();
    if let Some(name) = feature.strip_prefix('+') {
        (name, true)
    } else if let Some(name) = feature.strip_prefix('-') {
        (name, false)
    } else {
        (feature, true)
    }
}

/// Fully resolved settings a target machine is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMachineConfig {
    pub triple: String,
    /// CPU and features; empty when neither was requested.
    pub features: String,
    pub reloc_model: RelocModel,
    pub code_model: CodeModel,
    pub float_abi: FloatAbi,
    pub soft_float: bool,
    pub disable_fp_elim: bool,
    pub reg_alloc: RegAllocPolicy,
    pub scheduler: SchedulerPolicy,
    pub opt_level: CodegenOptLevel,
}

impl TargetMachineConfig {
    /// Derive the configuration for `triple` from the options and layout.
    pub fn derive(triple: &str, target_data: &TargetData, options: &BackendOptions) -> Self {
        let level = options.opt_level();
        Self {
            triple: triple.to_string(),
            features: SubtargetFeatures::string_for(&options.target),
            reloc_model: RelocModel::Static,
            code_model: CodeModel::for_pointer_width(target_data.pointer_size_in_bits()),
            float_abi: FloatAbi::Hard,
            soft_float: false,
            disable_fp_elim: options.codegen.disable_fp_elim,
            reg_alloc: RegAllocPolicy::from(level),
            scheduler: SchedulerPolicy::Default,
            opt_level: CodegenOptLevel::from(level),
        }
    }
}

/// A code generation backend for one architecture.
pub trait Target {
    fn name(&self) -> &str;

    fn create_target_machine(&self, config: &TargetMachineConfig) -> Box<dyn TargetMachine>;
}

/// A configured code generator.
pub trait TargetMachine {
    fn config(&self) -> &TargetMachineConfig;

    /// Register the passes that emit `file_type` into `pipeline`.
    fn add_passes_to_emit_file(
        &self,
        pipeline: &mut CodegenPipeline,
        file_type: CodegenFileType,
        opt_level: CodegenOptLevel,
    ) -> Result<(), CodegenError>;
}

/// Registered targets, keyed by architecture name.
#[derive(Default)]
pub struct TargetRegistry {
    targets: FxHashMap<String, Box<dyn Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` for `arch`, replacing any previous registration.
    pub fn register(&mut self, arch: impl Into<String>, target: Box<dyn Target>) {
        self.targets.insert(arch.into(), target);
    }

    /// Register `target` (builder pattern).
    #[must_use]
    pub fn with_target(mut self, arch: impl Into<String>, target: Box<dyn Target>) -> Self {
        self.register(arch, target);
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Resolve `triple` to a registered target by its architecture.
    pub fn lookup_target(&self, triple: &str) -> Result<&dyn Target, TargetError> {
        let components = TargetTripleComponents::parse(triple)?;
        self.targets
            .get(&components.arch)
            .map(|target| &**target)
            .ok_or_else(|| TargetError::UnknownTarget {
                triple: triple.to_string(),
                arch: components.arch,
            })
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arches: Vec<_> = self.targets.keys().collect();
        arches.sort();
        f.debug_struct("TargetRegistry")
            .field("targets", &arches)
            .finish()
    }
}
