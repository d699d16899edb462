//! Compilation options.
//!
//! Options are built once by the driver and are immutable for the lifetime
//! of a [`Backend`](crate::Backend).
//!
//! ```ignore
//! let options = BackendOptions::default()
//!     .with_opt_level(OptimizationLevel::O2)
//!     .with_target(TargetOptions::new().with_cpu("cortex-a9").with_feature("+neon"))
//!     .with_output_format(OutputFormat::Assembly);
//! ```

use std::fmt;

use slang_ir::DEFAULT_TARGET_DESCRIPTION;

use crate::OutputFormat;

/// Optimization level requested by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum OptimizationLevel {
    /// No optimization. Fast register allocation, no standard passes.
    #[default]
    O0,
    /// Light optimization.
    O1,
    /// Standard optimization.
    O2,
    /// Aggressive optimization.
    O3,
}

impl OptimizationLevel {
    /// Numeric level, `0..=3`.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::O0 => 0,
            Self::O1 => 1,
            Self::O2 => 2,
            Self::O3 => 3,
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.as_u8())
    }
}

/// An optimization level outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid optimization level {0} (expected 0..=3)")]
pub struct InvalidOptimizationLevel(pub u8);

impl TryFrom<u8> for OptimizationLevel {
    type Error = InvalidOptimizationLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::O0),
            1 => Ok(Self::O1),
            2 => Ok(Self::O2),
            3 => Ok(Self::O3),
            _ => Err(InvalidOptimizationLevel(level)),
        }
    }
}

/// Code generation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeGenOptions {
    pub opt_level: OptimizationLevel,
    /// Keep frame pointers in every function.
    pub disable_fp_elim: bool,
}

impl CodeGenOptions {
    #[must_use]
    pub fn new(opt_level: OptimizationLevel) -> Self {
        Self {
            opt_level,
            disable_fp_elim: false,
        }
    }

    /// Disable frame-pointer elimination (builder pattern).
    #[must_use]
    pub fn with_disable_fp_elim(mut self, disable: bool) -> Self {
        self.disable_fp_elim = disable;
        self
    }
}

/// Target selection options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOptions {
    /// Target CPU name; empty selects the target's generic CPU.
    pub cpu: String,
    /// Feature strings in command-line order, e.g. `"+neon"`, `"-vfp3"`.
    pub features: Vec<String>,
}

impl TargetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target CPU (builder pattern).
    #[must_use]
    pub fn with_cpu(mut self, cpu: impl Into<String>) -> Self {
        self.cpu = cpu.into();
        self
    }

    /// Append a single feature (builder pattern).
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Append several features (builder pattern).
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// `true` when neither a CPU nor any feature was requested.
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.features.is_empty()
    }
}

/// Everything the backend is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    pub codegen: CodeGenOptions,
    pub target: TargetOptions,
    pub output_format: OutputFormat,
    /// Permit user functions whose names start with the reserved prefix.
    pub allow_reserved_prefix: bool,
    /// Data-layout string describing the target.
    pub target_description: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            codegen: CodeGenOptions::default(),
            target: TargetOptions::default(),
            output_format: OutputFormat::Object,
            allow_reserved_prefix: false,
            target_description: DEFAULT_TARGET_DESCRIPTION.to_string(),
        }
    }
}

impl BackendOptions {
    #[must_use]
    pub fn with_codegen(mut self, codegen: CodeGenOptions) -> Self {
        self.codegen = codegen;
        self
    }

    /// Set the optimization level (builder pattern).
    #[must_use]
    pub fn with_opt_level(mut self, level: OptimizationLevel) -> Self {
        self.codegen.opt_level = level;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetOptions) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_allow_reserved_prefix(mut self, allow: bool) -> Self {
        self.allow_reserved_prefix = allow;
        self
    }

    /// Override the target data-layout string (builder pattern).
    #[must_use]
    pub fn with_target_description(mut self, description: impl Into<String>) -> Self {
        self.target_description = description.into();
        self
    }

    pub fn opt_level(&self) -> OptimizationLevel {
        self.codegen.opt_level
    }
}
