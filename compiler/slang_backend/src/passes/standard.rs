//! Standard passes added to every pipeline, scaled by optimization level.
//!
//! | Level | Function pipeline | Module pipeline |
//! |-------|-------------------|-----------------|
//! | O0 | (none) | (none) |
//! | O1 | `unreachable-block-elim` | `strip-dead-prototypes` |
//! | O2, O3 | `unreachable-block-elim` | `strip-dead-prototypes`, `global-dce` |

use rustc_hash::{FxHashMap, FxHashSet};
use slang_ir::{Function, Linkage, Module, TargetData};

use super::{FunctionPass, FunctionPassManager, ModulePass, ModulePassManager};
use crate::OptimizationLevel;

/// Add the standard per-function passes for `level`.
pub fn add_standard_function_passes(passes: &mut FunctionPassManager, level: OptimizationLevel) {
    if level >= OptimizationLevel::O1 {
        passes.add(Box::new(UnreachableBlockElim));
    }
}

/// Add the standard whole-module passes for `level`.
pub fn add_standard_module_passes(passes: &mut ModulePassManager, level: OptimizationLevel) {
    if level >= OptimizationLevel::O1 {
        passes.add(Box::new(StripDeadPrototypes));
    }
    if level >= OptimizationLevel::O2 {
        passes.add(Box::new(GlobalDce));
    }
}

/// Removes basic blocks not reachable from the entry block.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnreachableBlockElim;

impl FunctionPass for UnreachableBlockElim {
    fn name(&self) -> &'static str {
        "unreachable-block-elim"
    }

    fn run_on_function(&mut self, function: &mut Function, _target_data: &TargetData) -> bool {
        let Some(entry) = function.entry_block() else {
            return false;
        };

        let index: FxHashMap<&str, usize> = function
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.label.as_str(), i))
            .collect();

        let mut reachable = vec![false; function.blocks.len()];
        reachable[0] = true;
        let mut worklist = vec![entry];
        while let Some(block) = worklist.pop() {
            for label in block.successors() {
                if let Some(&i) = index.get(label) {
                    if !reachable[i] {
                        reachable[i] = true;
                        worklist.push(&function.blocks[i]);
                    }
                }
            }
        }

        if reachable.iter().all(|&r| r) {
            return false;
        }
        let mut flags = reachable.into_iter();
        function
            .blocks
            .retain(|_| flags.next().unwrap_or(true));
        true
    }
}

/// Removes function declarations nothing in the module refers to.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripDeadPrototypes;

impl ModulePass for StripDeadPrototypes {
    fn name(&self) -> &'static str {
        "strip-dead-prototypes"
    }

    fn run_on_module(&mut self, module: &mut Module, _target_data: &TargetData) -> bool {
        let referenced = owned_references(module);
        let before = module.functions.len();
        module
            .functions
            .retain(|f| !f.is_declaration() || referenced.contains(&f.name));
        module.functions.len() != before
    }
}

/// Removes unreferenced internal functions and globals, to a fixpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalDce;

impl ModulePass for GlobalDce {
    fn name(&self) -> &'static str {
        "global-dce"
    }

    fn run_on_module(&mut self, module: &mut Module, _target_data: &TargetData) -> bool {
        let mut changed = false;
        loop {
            let referenced = owned_references(module);
            let live = |name: &String, linkage: Linkage| {
                linkage == Linkage::External || referenced.contains(name)
            };

            let before = module.functions.len() + module.globals.len();
            module.functions.retain(|f| live(&f.name, f.linkage));
            module.globals.retain(|g| live(&g.name, g.linkage));
            if module.functions.len() + module.globals.len() == before {
                return changed;
            }
            changed = true;
        }
    }
}

fn owned_references(module: &Module) -> FxHashSet<String> {
    module
        .referenced_symbols()
        .into_iter()
        .map(str::to_owned)
        .collect()
}
