//! Codegen pipeline.
//!
//! Holds the passes a [`TargetMachine`](crate::target::TargetMachine)
//! registers for assembly or object output. Codegen passes only read the IR
//! and write to the output stream.

use std::fmt;
use std::io::{self, Write};

use slang_ir::{Function, Module, TargetData};
use tracing::{debug, trace};

use crate::passes::PipelineStats;

/// Kind of file a codegen pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodegenFileType {
    /// Textual assembly.
    Assembly,
    /// Relocatable object image.
    Object,
}

impl fmt::Display for CodegenFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembly => write!(f, "assembly"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Error type for codegen pipeline construction and execution.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Writing to the output stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The target machine cannot emit this kind of file.
    #[error("target does not support {0} emission")]
    UnsupportedFileType(CodegenFileType),
    /// A codegen pass failed for a reason other than I/O.
    #[error("{pass}: {message}")]
    Pass { pass: &'static str, message: String },
}

/// A code generation pass.
pub trait CodegenPass {
    fn name(&self) -> &'static str;

    /// Called once before the first function, e.g. to write a file header.
    fn initialize(&mut self, _module: &Module, _out: &mut dyn Write) -> Result<(), CodegenError> {
        Ok(())
    }

    /// Lower one function definition.
    fn run_on_function(
        &mut self,
        function: &Function,
        out: &mut dyn Write,
    ) -> Result<(), CodegenError>;

    /// Called once after the last function.
    fn finalize(&mut self, _out: &mut dyn Write) -> Result<(), CodegenError> {
        Ok(())
    }
}

/// Ordered codegen passes sharing one copy of the target data layout.
pub struct CodegenPipeline {
    target_data: TargetData,
    passes: Vec<Box<dyn CodegenPass>>,
    stats: PipelineStats,
}

impl CodegenPipeline {
    pub fn new(target_data: TargetData) -> Self {
        Self {
            target_data,
            passes: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    pub fn add(&mut self, pass: Box<dyn CodegenPass>) {
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

    /// Initialize, run once per function definition, finalize.
    ///
    /// Finalization runs even when initialization or a run fails; the first
    /// error is returned.
    pub fn emit_module(&mut self, module: &Module, out: &mut dyn Write) -> Result<(), CodegenError> {
        self.stats.initializations += 1;
        let mut result = self
            .passes
            .iter_mut()
            .try_for_each(|pass| pass.initialize(module, out));

        if result.is_ok() {
            result = module.definitions().try_for_each(|function| {
                trace!(function = %function.name, "codegen");
                self.stats.runs += 1;
                self.passes
                    .iter_mut()
                    .try_for_each(|pass| pass.run_on_function(function, out))
            });
        }

        for pass in &mut self.passes {
            let finalized = pass.finalize(out);
            if result.is_ok() {
                result = finalized;
            }
        }
        self.stats.finalizations += 1;
        debug!(runs = self.stats.runs, ok = result.is_ok(), "codegen pipeline finished");
        result
    }
}

impl fmt::Debug for CodegenPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodegenPipeline")
            .field("passes", &self.pass_names())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
