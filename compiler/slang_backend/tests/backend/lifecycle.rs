//! Translation Unit Lifecycle Tests
//!
//! These tests verify:
//! - The complete declaration → emission path for a single function
//! - Silent abandonment when IR generation discards the module
//! - Ordering of pragma injection, the translation-unit hook and the pass
//!   pipelines
//! - Function pipeline finalizes before the module pipeline, codegen last
//! - Reserved-prefix diagnostics

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use slang_backend::{
    Backend, BackendIo, BackendOptions, BackendState, CodeModel, CodegenError, CodegenFileType,
    CodegenOptLevel, CodegenPass, CodegenPipeline, FunctionPass, FunctionPassManager,
    ModulePass, ModulePassManager, OptimizationLevel, OutputFormat, PipelineCustomizer,
    RegAllocPolicy, Target, TargetMachine, TargetMachineConfig, TargetRegistry,
};
use slang_diagnostic::{DiagnosticQueue, ErrorCode, SourceMap};
use slang_ir::{
    AstContext, DeclGroup, Function, FunctionDecl, GlobalVariable, Module, Span, TargetData,
    Type,
};

use super::util::{compile, recording_registry, SharedLog, ToyGenerator};

fn ctx() -> AstContext {
    AstContext::new("kernel.rs", "armv7-none-linux-gnueabi")
}

fn definition(name: &str) -> DeclGroup {
    DeclGroup::single(FunctionDecl::definition(name, Span::new(0, 0)))
}

/// Scenario: one function `foo`, O0, object output, 32-bit target.
#[test]
fn test_single_function_object_at_o0() {
    let log = SharedLog::default();
    let targets = recording_registry("armv7", &log);

    let compiled = compile(
        BackendOptions::default(),
        ToyGenerator::new(),
        &ctx(),
        &[definition("foo")],
        &[],
        &targets,
    );

    assert_eq!(compiled.state, BackendState::Done);
    assert!(compiled.diagnostics.is_empty());
    assert!(compiled.has_codegen_pipeline && compiled.has_target_machine);

    let log = log.borrow();
    assert_eq!(log.configs.len(), 1);
    assert_eq!(log.configs[0].reg_alloc, RegAllocPolicy::Fast);
    assert_eq!(log.configs[0].code_model, CodeModel::Small);
    assert_eq!(
        log.requests,
        [(CodegenFileType::Object, CodegenOptLevel::None)]
    );
    assert_eq!(log.lowered, ["foo"]);

    assert_eq!(compiled.stats.codegen.initializations, 1);
    assert_eq!(compiled.stats.codegen.runs, 1);
    assert_eq!(compiled.stats.codegen.finalizations, 1);
    assert_eq!(compiled.stats.flushes, 1);
    assert!(compiled.stats.bytes_written > 0);
}

/// Scenario: empty translation unit, no output.
#[test]
fn test_empty_unit_without_output() {
    let log = SharedLog::default();
    let targets = recording_registry("armv7", &log);

    let compiled = compile(
        BackendOptions::default().with_output_format(OutputFormat::None),
        ToyGenerator::new(),
        &ctx(),
        &[],
        &[],
        &targets,
    );

    assert_eq!(compiled.state, BackendState::Done);
    assert_eq!(compiled.stats.function_passes.runs, 0);
    assert_eq!(compiled.stats.codegen.runs, 0);
    assert_eq!(compiled.stats.bytes_written, 0);
    assert_eq!(compiled.stats.flushes, 0);
    assert!(compiled.output.is_empty());
    assert!(!compiled.has_target_machine);
    assert!(log.borrow().configs.is_empty());
}

#[test]
fn test_discarded_module_is_abandoned_silently() {
    let log = SharedLog::default();
    let targets = recording_registry("armv7", &log);

    let compiled = compile(
        BackendOptions::default(),
        ToyGenerator::new().discarding(),
        &ctx(),
        &[definition("foo")],
        &[("arch", "7")],
        &targets,
    );

    assert_eq!(compiled.state, BackendState::Abandoned);
    assert!(compiled.module.is_none());
    assert!(compiled.diagnostics.is_empty());
    assert_eq!(compiled.stats, slang_backend::BackendStats::default());
    assert!(compiled.output.is_empty());
    assert!(log.borrow().configs.is_empty());
}

#[test]
fn test_reserved_prefix_diagnosed_but_compiled() {
    let log = SharedLog::default();
    let targets = recording_registry("armv7", &log);
    let groups = [
        definition("rsMain"),
        DeclGroup::single(FunctionDecl::prototype("rsGetAllocation", Span::new(0, 0))),
    ];

    let compiled = compile(
        BackendOptions::default().with_output_format(OutputFormat::Assembly),
        ToyGenerator::new(),
        &ctx(),
        &groups,
        &[],
        &targets,
    );

    assert_eq!(compiled.state, BackendState::Done);
    let reported: Vec<_> = compiled
        .diagnostics
        .with_code(ErrorCode::E1001)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        reported,
        ["invalid function name prefix, \"rs\" is reserved: 'rsMain'"]
    );
    assert_eq!(log.borrow().lowered, ["rsMain"]);
}

#[test]
fn test_reserved_prefix_allowed() {
    let log = SharedLog::default();
    let targets = recording_registry("armv7", &log);

    let compiled = compile(
        BackendOptions::default()
            .with_allow_reserved_prefix(true)
            .with_output_format(OutputFormat::None),
        ToyGenerator::new(),
        &ctx(),
        &[definition("rsMain")],
        &[],
        &targets,
    );

    assert!(compiled.diagnostics.is_empty());
    assert_eq!(compiled.state, BackendState::Done);
}

/// Adds a marker global and records the level it was built for.
struct MarkerPass;

impl ModulePass for MarkerPass {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn run_on_module(&mut self, module: &mut Module, _target_data: &TargetData) -> bool {
        module.add_global(GlobalVariable::new("marker", Type::I32, Some(1)));
        true
    }
}

struct AddMarker {
    levels: Rc<RefCell<Vec<OptimizationLevel>>>,
}

impl PipelineCustomizer for AddMarker {
    fn customize_module_passes(&mut self, passes: &mut ModulePassManager, level: OptimizationLevel) {
        self.levels.borrow_mut().push(level);
        passes.add(Box::new(MarkerPass));
    }
}

#[test]
fn test_hook_runs_after_pragmas_and_before_pipelines() {
    let map = SourceMap::new("kernel.rs", "");
    let targets = TargetRegistry::new();
    let mut diagnostics = DiagnosticQueue::new();
    let mut output: Vec<u8> = Vec::new();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let hook_seen = Rc::clone(&seen);
    let levels = Rc::new(RefCell::new(Vec::new()));

    let mut backend = Backend::new(
        BackendOptions::default()
            .with_opt_level(OptimizationLevel::O2)
            .with_output_format(OutputFormat::IrText),
        ToyGenerator::new(),
        BackendIo {
            diagnostics: &mut diagnostics,
            source_map: &map,
            targets: &targets,
            output: &mut output,
        },
    )
    .with_pragmas(vec![("version".into(), "1".into())])
    .with_hook(Box::new(move |ctx: &AstContext, module: &mut Module| {
        hook_seen.borrow_mut().push(format!(
            "{} pragmas={} marker={}",
            ctx.main_file,
            module.named_metadata("#pragma").map_or(0, |t| t.len()),
            module.global("marker").is_some(),
        ));
    }))
    .with_pipeline_customizer(Box::new(AddMarker {
        levels: Rc::clone(&levels),
    }));

    backend.initialize(&ctx());
    backend.handle_top_level_decl(&definition("root"));
    backend.handle_translation_unit(&ctx());
    assert_eq!(backend.state(), BackendState::Done);
    assert!(backend.module().and_then(|m| m.global("marker")).is_some());
    drop(backend);

    assert_eq!(*seen.borrow(), ["kernel.rs pragmas=1 marker=false"]);
    assert_eq!(*levels.borrow(), [OptimizationLevel::O2]);
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("@marker = global i32 1"));
    assert!(diagnostics.is_empty());
}

type Events = Rc<RefCell<Vec<String>>>;

/// Logs every call the three pipelines make into one shared list.
struct Traced {
    events: Events,
}

impl Traced {
    fn log(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl FunctionPass for Traced {
    fn name(&self) -> &'static str {
        "traced"
    }

    fn initialize(&mut self, _target_data: &TargetData) {
        self.log("fn-init".into());
    }

    fn run_on_function(&mut self, function: &mut Function, _target_data: &TargetData) -> bool {
        self.log(format!("fn-run {}", function.name));
        false
    }

    fn finalize(&mut self) {
        self.log("fn-fini".into());
    }
}

impl ModulePass for Traced {
    fn name(&self) -> &'static str {
        "traced"
    }

    fn run_on_module(&mut self, _module: &mut Module, _target_data: &TargetData) -> bool {
        self.log("module-run".into());
        false
    }
}

impl CodegenPass for Traced {
    fn name(&self) -> &'static str {
        "traced"
    }

    fn run_on_function(
        &mut self,
        function: &Function,
        _out: &mut dyn Write,
    ) -> Result<(), CodegenError> {
        self.log(format!("codegen {}", function.name));
        Ok(())
    }
}

impl PipelineCustomizer for Traced {
    fn customize_function_passes(
        &mut self,
        passes: &mut FunctionPassManager,
        _level: OptimizationLevel,
    ) {
        passes.add(Box::new(Traced {
            events: Rc::clone(&self.events),
        }));
    }

    fn customize_module_passes(&mut self, passes: &mut ModulePassManager, _level: OptimizationLevel) {
        passes.add(Box::new(Traced {
            events: Rc::clone(&self.events),
        }));
    }
}

struct TracedTarget {
    events: Events,
}

struct TracedMachine {
    config: TargetMachineConfig,
    events: Events,
}

impl Target for TracedTarget {
    fn name(&self) -> &str {
        "traced"
    }

    fn create_target_machine(&self, config: &TargetMachineConfig) -> Box<dyn TargetMachine> {
        Box::new(TracedMachine {
            config: config.clone(),
            events: Rc::clone(&self.events),
        })
    }
}

impl TargetMachine for TracedMachine {
    fn config(&self) -> &TargetMachineConfig {
        &self.config
    }

    fn add_passes_to_emit_file(
        &self,
        pipeline: &mut CodegenPipeline,
        _file_type: CodegenFileType,
        _opt_level: CodegenOptLevel,
    ) -> Result<(), CodegenError> {
        pipeline.add(Box::new(Traced {
            events: Rc::clone(&self.events),
        }));
        Ok(())
    }
}

#[test]
fn test_pipelines_run_in_sequence() {
    let events = Events::default();
    let map = SourceMap::new("kernel.rs", "");
    let targets = TargetRegistry::new().with_target(
        "armv7",
        Box::new(TracedTarget {
            events: Rc::clone(&events),
        }),
    );
    let mut diagnostics = DiagnosticQueue::new();
    let mut output: Vec<u8> = Vec::new();

    let mut backend = Backend::new(
        BackendOptions::default(),
        ToyGenerator::new(),
        BackendIo {
            diagnostics: &mut diagnostics,
            source_map: &map,
            targets: &targets,
            output: &mut output,
        },
    )
    .with_pipeline_customizer(Box::new(Traced {
        events: Rc::clone(&events),
    }));

    backend.initialize(&ctx());
    backend.handle_top_level_decl(&definition("foo"));
    backend.handle_translation_unit(&ctx());
    assert_eq!(backend.state(), BackendState::Done);
    assert_eq!(
        backend.generator().events,
        ["initialize", "decl foo", "translation unit"]
    );
    drop(backend);

    assert_eq!(
        *events.borrow(),
        ["fn-init", "fn-run foo", "fn-fini", "module-run", "codegen foo"]
    );
    assert!(diagnostics.is_empty());
}
