//! Backend pipeline orchestrator for Slang
//!
//! Takes declaration groups from the front end, hands them to an
//! [`IrGenerator`], and when the translation unit completes drives the
//! finished module through the function, module and codegen pipelines to one
//! of five [`OutputFormat`]s.
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=slang_backend=debug`: Enable debug-level tracing output.
//!
//! - `RUST_LOG=slang_backend=trace`: Also trace individual pass changes,
//!   codegen runs and the module IR just before emission.

pub mod backend;
pub mod codegen;
pub mod emit;
pub mod irgen;
pub mod naming;
pub mod options;
pub mod passes;
pub mod pragma;
pub mod target;

use std::sync::Once;

pub use backend::{Backend, BackendError, BackendIo, BackendState, BackendStats};
pub use codegen::{CodegenError, CodegenFileType, CodegenPass, CodegenPipeline};
pub use emit::{OutputFormat, OutputStream};
pub use irgen::{IrGenerator, TranslationUnitHook};
pub use naming::{ReservedPrefixPolicy, RESERVED_PREFIX};
pub use options::{
    BackendOptions, CodeGenOptions, InvalidOptimizationLevel, OptimizationLevel, TargetOptions,
};
pub use passes::{
    FunctionPass, FunctionPassManager, ModulePass, ModulePassManager, PipelineCustomizer,
    PipelineSlot, PipelineStats,
};
pub use pragma::{inject_pragmas, PragmaList, PRAGMA_METADATA_NAME};
pub use target::{
    CodeModel, CodegenOptLevel, FloatAbi, RegAllocPolicy, RelocModel, SchedulerPolicy,
    SubtargetFeatures, Target, TargetError, TargetMachine, TargetMachineConfig, TargetRegistry,
    TargetTripleComponents,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber for debug output.
///
/// Call this at the start of tests or the driver to enable tracing.
/// Only initializes once; subsequent calls are no-ops.
///
/// Control output with `RUST_LOG`:
/// - `RUST_LOG=slang_backend=debug` - debug level for this crate
/// - `RUST_LOG=slang_backend::passes=trace` - trace pass pipelines only
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
