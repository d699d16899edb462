//! Backend pipeline orchestrator.
//!
//! The [`Backend`] sits between the front end and the IR generator. It checks
//! declarations as they stream in, and when the translation unit completes it
//! takes ownership of the module and drives it to an artifact:
//!
//! ```text
//! handle_translation_unit
//!   ├─ IR generator releases the module
//!   ├─ inject #pragma metadata
//!   ├─ translation-unit hook
//!   ├─ function pipeline ─▶ module pipeline
//!   ├─ emit (assembly | object | IR text | binary | none)
//!   └─ flush
//! ```
//!
//! Failures never escape as `Err`: they become diagnostics and leave the
//! backend [`Abandoned`](BackendState::Abandoned).

use std::io::{self, Write};

use slang_diagnostic::{
    invalid_target_description, module_identity_mismatch, output_write_failed,
    unable_to_create_target, unable_to_interface_with_target, Diagnostic, DiagnosticSink,
    SourceMap,
};
use slang_ir::{
    module_to_string, write_module, AstContext, BinaryError, DeclGroup, Module, TagDecl,
    TargetData, VarDecl,
};
use tracing::{debug, error, instrument, trace, warn, Level};

use crate::codegen::{CodegenError, CodegenFileType, CodegenPipeline};
use crate::emit::{OutputFormat, OutputStream};
use crate::irgen::{IrGenerator, TranslationUnitHook};
use crate::naming::ReservedPrefixPolicy;
use crate::options::BackendOptions;
use crate::passes::{
    add_standard_function_passes, add_standard_module_passes, FunctionPassManager,
    ModulePassManager, PipelineCustomizer, PipelineSlot, PipelineStats,
};
use crate::pragma::{inject_pragmas, PragmaList};
use crate::target::{TargetError, TargetMachine, TargetMachineConfig, TargetRegistry};

/// Lifecycle of a [`Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendState {
    Constructed,
    Initialized,
    AcceptingDeclarations,
    /// The module has been handed over and is being driven to output.
    Finalizing,
    Done,
    Abandoned,
}

impl BackendState {
    /// `true` once the translation unit has been emitted or abandoned.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Abandoned)
    }
}

/// Failures while finishing a translation unit.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unable to create target: {0}")]
    CreateTarget(#[from] TargetError),
    #[error("unable to interface with target machine: {0}")]
    Interface(CodegenError),
    #[error("code generation failed: {0}")]
    Emit(CodegenError),
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
    #[error("failed to write output: {0}")]
    Binary(#[from] BinaryError),
}

impl BackendError {
    fn into_diagnostic(self) -> Diagnostic {
        match self {
            Self::CreateTarget(e) => unable_to_create_target(e),
            Self::Interface(e) => unable_to_interface_with_target(e),
            Self::Emit(e) => output_write_failed(e),
            Self::Write(e) => output_write_failed(e),
            Self::Binary(e) => output_write_failed(e),
        }
    }
}

/// Counters describing what a backend did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub function_passes: PipelineStats,
    pub module_passes: PipelineStats,
    pub codegen: PipelineStats,
    pub target_machines_created: u32,
    pub bytes_written: u64,
    pub flushes: u32,
}

/// Borrowed collaborators supplied by the driver.
pub struct BackendIo<'a> {
    pub diagnostics: &'a mut dyn DiagnosticSink,
    pub source_map: &'a SourceMap,
    pub targets: &'a TargetRegistry,
    pub output: &'a mut dyn Write,
}

/// Drives one translation unit from declarations to an emitted artifact.
pub struct Backend<'a, G: IrGenerator> {
    options: BackendOptions,
    generator: G,
    naming: ReservedPrefixPolicy,
    pragmas: PragmaList,
    hook: Option<Box<dyn TranslationUnitHook + 'a>>,
    customizer: Option<Box<dyn PipelineCustomizer + 'a>>,

    diagnostics: &'a mut dyn DiagnosticSink,
    source_map: &'a SourceMap,
    targets: &'a TargetRegistry,
    output: OutputStream<'a>,

    state: BackendState,
    target_data: Option<TargetData>,
    module_name: Option<String>,
    module: Option<Module>,

    function_passes: PipelineSlot<FunctionPassManager>,
    module_passes: PipelineSlot<ModulePassManager>,
    codegen: PipelineSlot<CodegenPipeline>,
    target_machine: Option<Box<dyn TargetMachine>>,
    target_machines_created: u32,
}

impl<'a, G: IrGenerator> Backend<'a, G> {
    pub fn new(options: BackendOptions, generator: G, io: BackendIo<'a>) -> Self {
        let naming = ReservedPrefixPolicy::new(options.allow_reserved_prefix);
        Self {
            options,
            generator,
            naming,
            pragmas: PragmaList::new(),
            hook: None,
            customizer: None,
            diagnostics: io.diagnostics,
            source_map: io.source_map,
            targets: io.targets,
            output: OutputStream::new(io.output),
            state: BackendState::Constructed,
            target_data: None,
            module_name: None,
            module: None,
            function_passes: PipelineSlot::Vacant,
            module_passes: PipelineSlot::Vacant,
            codegen: PipelineSlot::Vacant,
            target_machine: None,
            target_machines_created: 0,
        }
    }

    /// Set the pragmas injected at translation-unit completion (builder pattern).
    #[must_use]
    pub fn with_pragmas(mut self, pragmas: PragmaList) -> Self {
        self.pragmas = pragmas;
        self
    }

    pub fn add_pragma(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pragmas.push((name.into(), value.into()));
    }

    /// Install the translation-unit hook (builder pattern).
    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn TranslationUnitHook + 'a>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Install a pipeline customizer (builder pattern).
    #[must_use]
    pub fn with_pipeline_customizer(mut self, customizer: Box<dyn PipelineCustomizer + 'a>) -> Self {
        self.customizer = Some(customizer);
        self
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    pub fn pragmas(&self) -> &[(String, String)] {
        &self.pragmas
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn target_data(&self) -> Option<&TargetData> {
        self.target_data.as_ref()
    }

    /// The finished module, once the translation unit has been handed over.
    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn into_module(mut self) -> Option<Module> {
        self.module.take()
    }

    pub fn target_machine(&self) -> Option<&dyn TargetMachine> {
        self.target_machine.as_deref()
    }

    pub fn has_codegen_pipeline(&self) -> bool {
        self.codegen.is_built()
    }

    pub fn stats(&self) -> BackendStats {
        let stats = |slot: Option<PipelineStats>| slot.unwrap_or_default();
        BackendStats {
            function_passes: stats(self.function_passes.as_ref().map(FunctionPassManager::stats)),
            module_passes: stats(self.module_passes.as_ref().map(ModulePassManager::stats)),
            codegen: stats(self.codegen.as_ref().map(CodegenPipeline::stats)),
            target_machines_created: self.target_machines_created,
            bytes_written: self.output.bytes_written(),
            flushes: self.output.flushes(),
        }
    }

    /// Start the translation unit.
    ///
    /// The backend only becomes initialized when the target description
    /// parses and the IR generator has created its module.
    #[instrument(skip(self, ctx), level = "debug", fields(file = %ctx.main_file))]
    pub fn initialize(&mut self, ctx: &AstContext) {
        self.generator.initialize(ctx);

        let target_data = match TargetData::parse(&self.options.target_description) {
            Ok(target_data) => target_data,
            Err(e) => {
                error!(error = %e, "invalid target description");
                self.diagnostics.report(invalid_target_description(
                    &self.options.target_description,
                    e,
                ));
                return;
            }
        };

        let Some(module) = self.generator.module() else {
            warn!("IR generator has no module after initialize");
            return;
        };

        self.module_name = Some(module.name.clone());
        self.target_data = Some(target_data);
        self.state = BackendState::Initialized;
        debug!(module = %module.name, "backend initialized");
    }

    /// Check a top-level declaration group, then hand it to IR generation.
    #[instrument(skip(self, group), level = "trace", fields(decls = group.len()))]
    pub fn handle_top_level_decl(&mut self, group: &DeclGroup) {
        if !self.naming.is_allowed() {
            self.naming
                .check_group(group, self.source_map, &mut *self.diagnostics);
        }
        self.generator.handle_top_level_decl(group);

        if self.state == BackendState::Initialized {
            self.state = BackendState::AcceptingDeclarations;
        }
    }

    pub fn handle_tag_decl_definition(&mut self, decl: &TagDecl) {
        self.generator.handle_tag_decl_definition(decl);
    }

    pub fn complete_tentative_definition(&mut self, decl: &VarDecl) {
        self.generator.complete_tentative_definition(decl);
    }

    /// Finish the translation unit: take the module, run the pipelines and
    /// emit the artifact.
    #[instrument(skip(self, ctx), level = "debug", fields(file = %ctx.main_file))]
    pub fn handle_translation_unit(&mut self, ctx: &AstContext) {
        if self.state.is_terminal() {
            warn!(state = ?self.state, "translation unit already finished");
            return;
        }

        let released = self.generator.handle_translation_unit(ctx);

        let (Some(target_data), Some(expected)) =
            (self.target_data.clone(), self.module_name.clone())
        else {
            warn!("backend was never initialized; abandoning translation unit");
            self.state = BackendState::Abandoned;
            return;
        };

        let Some(mut module) = released else {
            debug!("IR generator discarded the module");
            self.state = BackendState::Abandoned;
            return;
        };

        if module.name != expected {
            error!(expected = %expected, found = %module.name, "module identity mismatch");
            self.diagnostics
                .report(module_identity_mismatch(&expected, &module.name));
            self.state = BackendState::Abandoned;
            return;
        }

        self.state = BackendState::Finalizing;

        inject_pragmas(&mut module, &self.pragmas);
        if let Some(hook) = self.hook.as_mut() {
            hook.on_translation_unit(ctx, &mut module);
        }
        self.run_ir_pipelines(&mut module, &target_data);

        if tracing::enabled!(Level::TRACE) {
            trace!(module = %module.name, ir = %module_to_string(&module), "IR before emission");
        }

        let result = match self.emit(&module, &target_data) {
            Ok(true) => self.output.flush().map_err(BackendError::from),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };
        self.module = Some(module);

        match result {
            Ok(()) => {
                debug!(
                    format = %self.options.output_format,
                    bytes = self.output.bytes_written(),
                    "translation unit emitted"
                );
                self.state = BackendState::Done;
            }
            Err(e) => {
                error!(error = %e, "abandoning translation unit");
                self.diagnostics.report(e.into_diagnostic());
                self.state = BackendState::Abandoned;
            }
        }
    }

    fn run_ir_pipelines(&mut self, module: &mut Module, target_data: &TargetData) {
        let level = self.options.opt_level();
        let customizer = &mut self.customizer;

        self.function_passes.build_with(|| {
            let mut passes = FunctionPassManager::new(target_data.clone());
            add_standard_function_passes(&mut passes, level);
            if let Some(customizer) = customizer.as_mut() {
                customizer.customize_function_passes(&mut passes, level);
            }
            passes
        });
        if let Some(passes) = self.function_passes.as_mut() {
            passes.run_on_module_functions(module);
        }

        self.module_passes.build_with(|| {
            let mut passes = ModulePassManager::new(target_data.clone());
            add_standard_module_passes(&mut passes, level);
            if let Some(customizer) = customizer.as_mut() {
                customizer.customize_module_passes(&mut passes, level);
            }
            passes
        });
        if let Some(passes) = self.module_passes.as_mut() {
            passes.run(module);
        }
    }

    /// Write the artifact. Returns `false` when nothing was written and no
    /// flush is due.
    fn emit(&mut self, module: &Module, target_data: &TargetData) -> Result<bool, BackendError> {
        match self.options.output_format {
            OutputFormat::Assembly => {
                self.run_codegen(module, target_data, CodegenFileType::Assembly)?;
            }
            OutputFormat::Object => {
                self.run_codegen(module, target_data, CodegenFileType::Object)?;
            }
            OutputFormat::IrText => {
                self.output.write_all(module_to_string(module).as_bytes())?;
            }
            OutputFormat::Binary => {
                write_module(module, &mut self.output)?;
            }
            OutputFormat::None => return Ok(false),
        }
        Ok(true)
    }

    fn run_codegen(
        &mut self,
        module: &Module,
        target_data: &TargetData,
        file_type: CodegenFileType,
    ) -> Result<(), BackendError> {
        self.create_codegen_passes(&module.target_triple, target_data, file_type)?;
        match self.codegen.as_mut() {
            Some(pipeline) => pipeline
                .emit_module(module, &mut self.output)
                .map_err(BackendError::Emit),
            None => Ok(()),
        }
    }

    /// Build the target machine and the codegen pipeline, once.
    fn create_codegen_passes(
        &mut self,
        triple: &str,
        target_data: &TargetData,
        file_type: CodegenFileType,
    ) -> Result<(), BackendError> {
        if self.codegen.is_built() {
            return Ok(());
        }

        let targets = self.targets;
        let target = targets.lookup_target(triple)?;
        let config = TargetMachineConfig::derive(triple, target_data, &self.options);
        trace!(?config, target = target.name(), "creating target machine");
        let machine = target.create_target_machine(&config);
        self.target_machines_created += 1;

        let mut pipeline = CodegenPipeline::new(target_data.clone());
        machine
            .add_passes_to_emit_file(&mut pipeline, file_type, config.opt_level)
            .map_err(BackendError::Interface)?;
        debug!(passes = ?pipeline.pass_names(), %file_type, "codegen pipeline built");

        self.codegen = PipelineSlot::Built(pipeline);
        self.target_machine = Some(machine);
        Ok(())
    }
}

impl<G: IrGenerator> Drop for Backend<'_, G> {
    fn drop(&mut self) {
        trace!(
            state = ?self.state,
            module = self.module.is_some(),
            codegen = self.codegen.is_built(),
            "releasing backend"
        );
    }
}
