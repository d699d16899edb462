//! Contract between the backend and the IR generator.

use slang_ir::{AstContext, DeclGroup, Module, TagDecl, VarDecl};

/// Lowers front-end declarations into a [`Module`].
///
/// The generator owns the module until [`handle_translation_unit`] hands it
/// over. Returning `None` there means the generator already discarded the
/// module, and the backend abandons the translation unit.
///
/// [`handle_translation_unit`]: IrGenerator::handle_translation_unit
pub trait IrGenerator {
    /// Start a translation unit; the module should exist afterwards.
    fn initialize(&mut self, ctx: &AstContext);

    /// The module being built, if any.
    fn module(&self) -> Option<&Module>;

    fn handle_top_level_decl(&mut self, group: &DeclGroup);

    /// Finish the translation unit and release the module.
    fn handle_translation_unit(&mut self, ctx: &AstContext) -> Option<Module>;

    fn handle_tag_decl_definition(&mut self, decl: &TagDecl);

    fn complete_tentative_definition(&mut self, decl: &VarDecl);
}

/// Runs on the finished module after pragma injection and before any pass
/// pipeline.
pub trait TranslationUnitHook {
    fn on_translation_unit(&mut self, ctx: &AstContext, module: &mut Module);
}

impl<F> TranslationUnitHook for F
where
    F: FnMut(&AstContext, &mut Module),
{
    fn on_translation_unit(&mut self, ctx: &AstContext, module: &mut Module) {
        self(ctx, module);
    }
}
