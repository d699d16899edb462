//! Pass pipelines.
//!
//! Two IR pipelines run after IR generation completes:
//!
//! ```text
//! ┌─────────────────────┐    ┌───────────────────┐    ┌──────────────────┐
//! │ FunctionPassManager │───▶│ ModulePassManager │───▶│ CodegenPipeline  │
//! │  (each definition)  │    │   (whole module)  │    │ (asm/object only)│
//! └─────────────────────┘    └───────────────────┘    └──────────────────┘
//! ```
//!
//! Every pipeline follows an initialize → run(×N) → finalize lifecycle and
//! owns its own copy of the target data layout. Empty pipelines are valid.
//! The codegen pipeline lives in [`crate::codegen`].

mod standard;

use slang_ir::{Function, Module, TargetData};
use tracing::{debug, trace};

use crate::OptimizationLevel;

pub use standard::{
    add_standard_function_passes, add_standard_module_passes, GlobalDce, StripDeadPrototypes,
    UnreachableBlockElim,
};

/// A transformation applied to one function body at a time.
pub trait FunctionPass {
    fn name(&self) -> &'static str;

    /// Called once before the first function is visited.
    fn initialize(&mut self, _target_data: &TargetData) {}

    /// Transform `function`. Returns `true` if it changed.
    fn run_on_function(&mut self, function: &mut Function, target_data: &TargetData) -> bool;

    /// Called once after the last function is visited.
    fn finalize(&mut self) {}
}

/// A transformation applied to the whole module.
pub trait ModulePass {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, _target_data: &TargetData) {}

    /// Transform `module`. Returns `true` if it changed.
    fn run_on_module(&mut self, module: &mut Module, target_data: &TargetData) -> bool;

    fn finalize(&mut self) {}
}

/// Hook for adding passes beyond the standard set.
///
/// Called after the standard passes for the level have been added.
pub trait PipelineCustomizer {
    fn customize_function_passes(
        &mut self,
        _passes: &mut FunctionPassManager,
        _level: OptimizationLevel,
    ) {
    }

    fn customize_module_passes(&mut self, _passes: &mut ModulePassManager, _level: OptimizationLevel) {
    }
}

/// Run counters for one pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PipelineStats {
    pub initializations: u32,
    pub runs: u32,
    pub finalizations: u32,
    /// Number of pass invocations that reported a change.
    pub changed: u32,
}

/// A lazily constructed pipeline.
#[derive(Debug)]
pub enum PipelineSlot<P> {
    Vacant,
    Built(P),
}

impl<P> Default for PipelineSlot<P> {
    fn default() -> Self {
        Self::Vacant
    }
}

impl<P> PipelineSlot<P> {
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }

    /// Build the pipeline with `build` unless one already exists.
    pub fn build_with(&mut self, build: impl FnOnce() -> P) {
        if let Self::Vacant = self {
            *self = Self::Built(build());
        }
    }

    pub fn as_ref(&self) -> Option<&P> {
        match self {
            Self::Built(pipeline) => Some(pipeline),
            Self::Vacant => None,
        }
    }

    pub fn as_mut(&mut self) -> Option<&mut P> {
        match self {
            Self::Built(pipeline) => Some(pipeline),
            Self::Vacant => None,
        }
    }

    /// Empty the slot, returning the pipeline if one was built.
    pub fn take(&mut self) -> Option<P> {
        match std::mem::take(self) {
            Self::Built(pipeline) => Some(pipeline),
            Self::Vacant => None,
        }
    }
}

/// Per-function pipeline.
pub struct FunctionPassManager {
    target_data: TargetData,
    passes: Vec<Box<dyn FunctionPass>>,
    initialized: bool,
    stats: PipelineStats,
}

impl FunctionPassManager {
    pub fn new(target_data: TargetData) -> Self {
        Self {
            target_data,
            passes: Vec::new(),
            initialized: false,
            stats: PipelineStats::default(),
        }
    }

    pub fn add(&mut self, pass: Box<dyn FunctionPass>) {
        self.passes.push(pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn target_data(&self) -> &TargetData {
        &self.target_data
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn initialize(&mut self) {
        for pass in &mut self.passes {
            pass.initialize(&self.target_data);
        }
        self.initialized = true;
        self.stats.initializations += 1;
    }

    /// Run every pass over `function`. Returns `true` if any pass changed it.
    pub fn run(&mut self, function: &mut Function) -> bool {
        debug_assert!(self.initialized, "function pipeline run before initialize");
        let mut changed = false;
        for pass in &mut self.passes {
            if pass.run_on_function(function, &self.target_data) {
                trace!(pass = pass.name(), function = %function.name, "changed");
                self.stats.changed += 1;
                changed = true;
            }
        }
        self.stats.runs += 1;
        changed
    }

    pub fn finalize(&mut self) {
        for pass in &mut self.passes {
            pass.finalize();
        }
        self.initialized = false;
        self.stats.finalizations += 1;
    }

    /// One initialize/finalize pair around a run over every definition.
    pub fn run_on_module_functions(&mut self, module: &mut Module) -> bool {
        self.initialize();
        let mut changed = false;
        for function in module.functions.iter_mut().filter(|f| !f.is_declaration()) {
            changed |= self.run(function);
        }
        self.finalize();
        debug!(runs = self.stats.runs, changed, "function pipeline finished");
        changed
    }
}

/// Whole-module pipeline.
pub struct ModulePassManager {
    target_data: TargetData,
    passes: Vec<Box<dyn ModulePass>>,
    stats: PipelineStats,
}

impl ModulePassManager {
    pub fn new(target_data: TargetData) -> Self {
        Self {
            target_data,
            passes: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    pub fn add(&mut self, pass: Box<dyn ModulePass>) {
        self.passes.push(pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn target_data(&self) -> &TargetData {
        &self.target_data
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Initialize, run every pass once over `module`, finalize.
    pub fn run(&mut self, module: &mut Module) -> bool {
        for pass in &mut self.passes {
            pass.initialize(&self.target_data);
        }
        self.stats.initializations += 1;

        let mut changed = false;
        for pass in &mut self.passes {
            if pass.run_on_module(module, &self.target_data) {
                trace!(pass = pass.name(), "changed");
                self.stats.changed += 1;
                changed = true;
            }
        }
        self.stats.runs += 1;

        for pass in &mut self.passes {
            pass.finalize();
        }
        self.stats.finalizations += 1;
        debug!(changed, "module pipeline finished");
        changed
    }
}
