//! Test Utilities for Backend Integration Tests
//!
//! Provides shared helpers for:
//! - A toy IR generator driven by declaration groups
//! - A recording target that logs every target machine configuration
//! - Assembly and ELF object codegen passes
//! - Object file verification with the `object` crate

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slang_backend::{
    Backend, BackendIo, BackendOptions, CodegenError, CodegenFileType, CodegenOptLevel,
    CodegenPass, CodegenPipeline, IrGenerator, Target, TargetMachine, TargetMachineConfig,
    TargetRegistry,
};
use slang_diagnostic::{DiagnosticQueue, SourceMap};
use slang_ir::{
    AstContext, BasicBlock, Decl, DeclGroup, Function, GlobalVariable, Instruction, Module,
    TagDecl, Type, VarDecl,
};

/// Builds a module from the declarations it is handed.
///
/// Definitions get a single `ret` block unless a body was registered with
/// [`ToyGenerator::with_body`]; prototypes become declarations and variables
/// become `i32` globals.
#[derive(Default)]
pub struct ToyGenerator {
    module: Option<Module>,
    bodies: FxHashMap<String, Vec<BasicBlock>>,
    /// Drop the module at translation-unit end instead of releasing it.
    pub discard: bool,
    pub events: Vec<String>,
}

impl ToyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_body(mut self, name: &str, blocks: Vec<BasicBlock>) -> Self {
        self.bodies.insert(name.to_string(), blocks);
        self
    }

    #[must_use]
    pub fn discarding(mut self) -> Self {
        self.discard = true;
        self
    }
}

impl IrGenerator for ToyGenerator {
    fn initialize(&mut self, ctx: &AstContext) {
        self.events.push("initialize".into());
        self.module = Some(Module::new(&ctx.main_file).with_target_triple(&ctx.target_triple));
    }

    fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    fn handle_top_level_decl(&mut self, group: &DeclGroup) {
        let Some(module) = self.module.as_mut() else {
            return;
        };
        for decl in group {
            self.events.push(format!("decl {}", decl.name()));
            match decl {
                Decl::Function(f) if f.is_definition => {
                    let blocks = self.bodies.remove(&f.name).unwrap_or_else(|| {
                        vec![BasicBlock::new("entry", vec![Instruction::new("ret", vec![])])]
                    });
                    module.add_function(Function::new(&f.name, Type::Void, vec![], blocks));
                }
                Decl::Function(f) => {
                    module.add_function(Function::declaration(&f.name, Type::Void, vec![]));
                }
                Decl::Var(v) => {
                    module.add_global(GlobalVariable::new(&v.name, Type::I32, Some(0)));
                }
                Decl::Tag(_) | Decl::Typedef(_) => {}
            }
        }
    }

    fn handle_translation_unit(&mut self, _ctx: &AstContext) -> Option<Module> {
        self.events.push("translation unit".into());
        if self.discard {
            self.module = None;
        }
        self.module.take()
    }

    fn handle_tag_decl_definition(&mut self, decl: &TagDecl) {
        self.events.push(format!("tag {}", decl.name));
    }

    fn complete_tentative_definition(&mut self, decl: &VarDecl) {
        self.events.push(format!("tentative {}", decl.name));
    }
}

/// Everything a [`RecordingTarget`] saw.
#[derive(Debug, Default)]
pub struct TargetLog {
    pub configs: Vec<TargetMachineConfig>,
    pub requests: Vec<(CodegenFileType, CodegenOptLevel)>,
    /// Functions lowered by codegen passes, in order.
    pub lowered: Vec<String>,
}

pub type SharedLog = Rc<RefCell<TargetLog>>;

/// Target that records configurations and emits assembly text or an ELF
/// object for `x86_64`.
pub struct RecordingTarget {
    log: SharedLog,
}

impl RecordingTarget {
    pub fn new(log: &SharedLog) -> Self {
        Self {
            log: Rc::clone(log),
        }
    }
}

impl Target for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_target_machine(&self, config: &TargetMachineConfig) -> Box<dyn TargetMachine> {
        self.log.borrow_mut().configs.push(config.clone());
        Box::new(RecordingMachine {
            config: config.clone(),
            log: Rc::clone(&self.log),
        })
    }
}

struct RecordingMachine {
    config: TargetMachineConfig,
    log: SharedLog,
}

impl TargetMachine for RecordingMachine {
    fn config(&self) -> &TargetMachineConfig {
        &self.config
    }

    fn add_passes_to_emit_file(
        &self,
        pipeline: &mut CodegenPipeline,
        file_type: CodegenFileType,
        opt_level: CodegenOptLevel,
    ) -> Result<(), CodegenError> {
        self.log.borrow_mut().requests.push((file_type, opt_level));
        match file_type {
            CodegenFileType::Assembly => pipeline.add(Box::new(AsmPrinter {
                log: Rc::clone(&self.log),
            })),
            CodegenFileType::Object => pipeline.add(Box::new(ElfWriter {
                log: Rc::clone(&self.log),
                functions: Vec::new(),
            })),
        }
        Ok(())
    }
}

/// Prints one labelled block per function.
struct AsmPrinter {
    log: SharedLog,
}

impl CodegenPass for AsmPrinter {
    fn name(&self) -> &'static str {
        "asm-printer"
    }

    fn initialize(&mut self, module: &Module, out: &mut dyn Write) -> Result<(), CodegenError> {
        writeln!(out, "\t.file\t\"{}\"", module.name)?;
        writeln!(out, "\t.text")?;
        Ok(())
    }

    fn run_on_function(
        &mut self,
        function: &Function,
        out: &mut dyn Write,
    ) -> Result<(), CodegenError> {
        self.log.borrow_mut().lowered.push(function.name.clone());
        writeln!(out, "\t.globl\t{}", function.name)?;
        writeln!(out, "{}:", function.name)?;
        for _ in 0..function.instruction_count() {
            writeln!(out, "\tnop")?;
        }
        Ok(())
    }
}

/// Collects functions and writes a relocatable ELF object at finalize.
struct ElfWriter {
    log: SharedLog,
    functions: Vec<(String, usize)>,
}

impl CodegenPass for ElfWriter {
    fn name(&self) -> &'static str {
        "elf-writer"
    }

    fn run_on_function(
        &mut self,
        function: &Function,
        _out: &mut dyn Write,
    ) -> Result<(), CodegenError> {
        self.log.borrow_mut().lowered.push(function.name.clone());
        self.functions
            .push((function.name.clone(), function.instruction_count()));
        Ok(())
    }

    fn finalize(&mut self, out: &mut dyn Write) -> Result<(), CodegenError> {
        use object::write::{Object, StandardSection, Symbol, SymbolSection};
        use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

        let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
        let text = obj.section_id(StandardSection::Text);
        for (name, instructions) in self.functions.drain(..) {
            // One `nop` per instruction, at least one byte per function.
            let code = vec![0x90_u8; instructions.max(1)];
            let offset = obj.append_section_data(text, &code, 16);
            obj.add_symbol(Symbol {
                name: name.into_bytes(),
                value: offset,
                size: code.len() as u64,
                kind: SymbolKind::Text,
                scope: SymbolScope::Linkage,
                weak: false,
                section: SymbolSection::Section(text),
                flags: SymbolFlags::None,
            });
        }

        let bytes = obj.write().map_err(|e| CodegenError::Pass {
            pass: "elf-writer",
            message: e.to_string(),
        })?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

/// Registry holding a [`RecordingTarget`] for `arch`.
pub fn recording_registry(arch: &str, log: &SharedLog) -> TargetRegistry {
    TargetRegistry::new().with_target(arch, Box::new(RecordingTarget::new(log)))
}

/// Result of driving one translation unit through a backend.
pub struct Compiled {
    pub output: Vec<u8>,
    pub diagnostics: DiagnosticQueue,
    pub module: Option<Module>,
    pub stats: slang_backend::BackendStats,
    pub state: slang_backend::BackendState,
    pub has_codegen_pipeline: bool,
    pub has_target_machine: bool,
}

impl Compiled {
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Drive `groups` through a fresh backend.
pub fn compile(
    options: BackendOptions,
    generator: ToyGenerator,
    ctx: &AstContext,
    groups: &[DeclGroup],
    pragmas: &[(&str, &str)],
    targets: &TargetRegistry,
) -> Compiled {
    let map = SourceMap::new(&ctx.main_file, "");
    let mut diagnostics = DiagnosticQueue::new();
    let mut output: Vec<u8> = Vec::new();

    let mut backend = Backend::new(
        options,
        generator,
        BackendIo {
            diagnostics: &mut diagnostics,
            source_map: &map,
            targets,
            output: &mut output,
        },
    );
    for (name, value) in pragmas {
        backend.add_pragma(*name, *value);
    }

    backend.initialize(ctx);
    for group in groups {
        backend.handle_top_level_decl(group);
    }
    backend.handle_translation_unit(ctx);

    let stats = backend.stats();
    let state = backend.state();
    let has_codegen_pipeline = backend.has_codegen_pipeline();
    let has_target_machine = backend.target_machine().is_some();
    let module = backend.into_module();

    Compiled {
        output,
        diagnostics,
        module,
        stats,
        state,
        has_codegen_pipeline,
        has_target_machine,
    }
}

/// Symbol and section names read back from an object image.
#[derive(Debug, Default)]
pub struct ObjectVerification {
    pub is_elf: bool,
    pub architecture: String,
    pub symbols: Vec<String>,
    pub text_size: u64,
}

/// Parse an object file and extract verification information.
pub fn parse_object(bytes: &[u8]) -> Result<ObjectVerification, String> {
    use object::{Object, ObjectSection, ObjectSymbol};

    let obj = object::File::parse(bytes).map_err(|e| format!("Object parse error: {e}"))?;

    let symbols = obj
        .symbols()
        .filter(|sym| sym.kind() == object::SymbolKind::Text)
        .filter_map(|sym| sym.name().ok().map(ToString::to_string))
        .collect();

    let text_size = obj
        .section_by_name(".text")
        .map_or(0, |section| section.size());

    Ok(ObjectVerification {
        is_elf: obj.format() == object::BinaryFormat::Elf,
        architecture: format!("{:?}", obj.architecture()),
        symbols,
        text_size,
    })
}
