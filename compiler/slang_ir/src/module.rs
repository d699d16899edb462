//! In-memory module IR.
//!
//! A [`Module`] is the single mutable artifact of a translation unit: the
//! functions and globals produced by IR generation plus a table of named
//! metadata. The backend treats instruction contents as opaque; the only
//! structure it relies on is
//!
//! - a function without basic blocks is a declaration,
//! - block operands name control-flow successors,
//! - global operands name referenced symbols.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Symbol linkage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Linkage {
    /// Visible outside the module.
    #[default]
    External,
    /// Private to the module; may be removed when unreferenced.
    Internal,
}

/// First-class IR types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Type {
    Void,
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ptr,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Void => "void",
            Type::I1 => "i1",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "float",
            Type::F64 => "double",
            Type::Ptr => "ptr",
        };
        f.write_str(name)
    }
}

/// An instruction operand.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Operand {
    /// A local SSA value or parameter.
    Local(String),
    /// A function or global variable.
    Global(String),
    /// A basic block label (control-flow successor).
    Block(String),
    /// An integer constant.
    Int(i64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(name) => write!(f, "%{name}"),
            Operand::Global(name) => write!(f, "@{name}"),
            Operand::Block(label) => write!(f, "label %{label}"),
            Operand::Int(value) => write!(f, "{value}"),
        }
    }
}

/// A single instruction. The opcode is opaque to the backend.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Instruction {
    pub result: Option<String>,
    pub opcode: String,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: impl Into<String>, operands: Vec<Operand>) -> Self {
        Instruction {
            result: None,
            opcode: opcode.into(),
            operands,
        }
    }

    /// Name the value this instruction produces (builder pattern).
    #[must_use]
    pub fn with_result(mut self, name: impl Into<String>) -> Self {
        self.result = Some(name.into());
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "%{result} = ")?;
        }
        f.write_str(&self.opcode)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

/// A labelled straight-line sequence of instructions.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        BasicBlock {
            label: label.into(),
            instructions,
        }
    }

    /// Labels of the blocks control may transfer to from this block.
    pub fn successors(&self) -> impl Iterator<Item = &str> {
        self.instructions
            .iter()
            .flat_map(|inst| inst.operands.iter())
            .filter_map(|op| match op {
                Operand::Block(label) => Some(label.as_str()),
                _ => None,
            })
    }
}

/// A function parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// A function definition or declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub return_type: Type,
    pub params: Vec<Param>,
    /// Empty for declarations. The first block is the entry block.
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// A function with a body.
    pub fn new(
        name: impl Into<String>,
        return_type: Type,
        params: Vec<Param>,
        blocks: Vec<BasicBlock>,
    ) -> Self {
        Function {
            name: name.into(),
            linkage: Linkage::External,
            return_type,
            params,
            blocks,
        }
    }

    /// A body-less declaration of an external function.
    pub fn declaration(name: impl Into<String>, return_type: Type, params: Vec<Param>) -> Self {
        Self::new(name, return_type, params, Vec::new())
    }

    /// Set the linkage (builder pattern).
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// `true` when the function has no body.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }
}

/// A module-level variable.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    pub linkage: Linkage,
    pub ty: Type,
    pub is_constant: bool,
    /// `None` declares an external variable.
    pub initializer: Option<i64>,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, ty: Type, initializer: Option<i64>) -> Self {
        GlobalVariable {
            name: name.into(),
            linkage: Linkage::External,
            ty,
            is_constant: false,
            initializer,
        }
    }

    /// Set the linkage (builder pattern).
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Mark the variable read-only (builder pattern).
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }
}

/// A metadata node: an ordered tuple of string leaves.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct MetadataNode {
    pub operands: SmallVec<[String; 2]>,
}

impl MetadataNode {
    pub fn new<I, S>(operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetadataNode {
            operands: operands.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named, ordered list of metadata nodes attached to the module.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct NamedMetadata {
    pub name: String,
    nodes: Vec<MetadataNode>,
}

impl NamedMetadata {
    fn new(name: impl Into<String>) -> Self {
        NamedMetadata {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Append a node; insertion order is preserved.
    pub fn add_operand(&mut self, node: MetadataNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[MetadataNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The IR of one translation unit.
#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub target_triple: String,
    pub data_layout: String,
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
    named_metadata: Vec<NamedMetadata>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    /// Set the target triple (builder pattern).
    #[must_use]
    pub fn with_target_triple(mut self, triple: impl Into<String>) -> Self {
        self.target_triple = triple.into();
        self
    }

    /// Set the data layout string (builder pattern).
    #[must_use]
    pub fn with_data_layout(mut self, layout: impl Into<String>) -> Self {
        self.data_layout = layout.into();
        self
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn add_global(&mut self, global: GlobalVariable) {
        self.globals.push(global);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Functions that have a body, in module order.
    pub fn definitions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_declaration())
    }

    /// `true` when the module holds no functions, globals or metadata.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.globals.is_empty() && self.named_metadata.is_empty()
    }

    /// Look up a named metadata table.
    pub fn named_metadata(&self, name: &str) -> Option<&NamedMetadata> {
        self.named_metadata.iter().find(|md| md.name == name)
    }

    /// Return the named metadata table, creating an empty one if needed.
    pub fn get_or_insert_named_metadata(&mut self, name: &str) -> &mut NamedMetadata {
        let index = match self.named_metadata.iter().position(|md| md.name == name) {
            Some(index) => index,
            None => {
                self.named_metadata.push(NamedMetadata::new(name));
                self.named_metadata.len() - 1
            }
        };
        &mut self.named_metadata[index]
    }

    /// All named metadata tables in creation order.
    pub fn named_metadata_tables(&self) -> &[NamedMetadata] {
        &self.named_metadata
    }

    /// Names of every symbol referenced by an instruction operand.
    pub fn referenced_symbols(&self) -> FxHashSet<&str> {
        self.functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .flat_map(|b| b.instructions.iter())
            .flat_map(|i| i.operands.iter())
            .filter_map(|op| match op {
                Operand::Global(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
