//! Slang IR - front-end contract and module IR for the Slang backend
//!
//! This crate contains the data the backend consumes and produces:
//! - Spans for source locations
//! - Top-level declarations and declaration groups handed over by the front end
//! - The in-memory [`Module`] IR built by IR generation
//! - [`TargetData`], the parsed target data layout
//! - The IR text printer and the serialized-binary module codec

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
pub mod binary;
mod data_layout;
mod module;
pub mod printer;
mod span;

pub use ast::{AstContext, Decl, DeclGroup, FunctionDecl, TagDecl, TagKind, TypedefDecl, VarDecl};
pub use binary::{module_to_bytes, read_module, write_module, BinaryError};
pub use data_layout::{
    AlignKind, AlignSpec, DataLayoutError, Endianness, TargetData, DEFAULT_TARGET_DESCRIPTION,
};
pub use module::{
    BasicBlock, Function, GlobalVariable, Instruction, Linkage, MetadataNode, Module,
    NamedMetadata, Operand, Param, Type,
};
pub use printer::{module_to_string, print_module};
pub use span::Span;
