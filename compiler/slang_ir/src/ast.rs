//! Top-level declarations handed from the front end to the backend.
//!
//! The backend never looks inside declaration bodies. It only needs to know
//! what kind of declaration it received, its name, where it came from, and
//! whether a function declaration is a definition or a forward declaration.

use smallvec::SmallVec;

use crate::Span;

/// A function declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionDecl {
    pub name: String,
    /// Span of the whole declaration; the start is the diagnostic location.
    pub span: Span,
    /// `true` when this declaration carries a body.
    pub is_definition: bool,
}

impl FunctionDecl {
    /// A function declaration with a body.
    pub fn definition(name: impl Into<String>, span: Span) -> Self {
        FunctionDecl {
            name: name.into(),
            span,
            is_definition: true,
        }
    }

    /// A forward declaration (prototype only).
    pub fn prototype(name: impl Into<String>, span: Span) -> Self {
        FunctionDecl {
            name: name.into(),
            span,
            is_definition: false,
        }
    }
}

/// A file-scope variable declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct VarDecl {
    pub name: String,
    pub span: Span,
    /// A declaration without initializer that may still become a definition
    /// at the end of the translation unit.
    pub is_tentative: bool,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        VarDecl {
            name: name.into(),
            span,
            is_tentative: false,
        }
    }

    pub fn tentative(name: impl Into<String>, span: Span) -> Self {
        VarDecl {
            name: name.into(),
            span,
            is_tentative: true,
        }
    }
}

/// Kind of a tag declaration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

/// A struct, union or enum declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TagDecl {
    pub name: String,
    pub kind: TagKind,
    pub span: Span,
}

impl TagDecl {
    pub fn new(kind: TagKind, name: impl Into<String>, span: Span) -> Self {
        TagDecl {
            name: name.into(),
            kind,
            span,
        }
    }
}

/// A type alias declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypedefDecl {
    pub name: String,
    pub span: Span,
}

/// Any top-level declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Decl {
    Function(FunctionDecl),
    Var(VarDecl),
    Tag(TagDecl),
    Typedef(TypedefDecl),
}

impl Decl {
    /// The declared name, verbatim.
    pub fn name(&self) -> &str {
        match self {
            Decl::Function(d) => &d.name,
            Decl::Var(d) => &d.name,
            Decl::Tag(d) => &d.name,
            Decl::Typedef(d) => &d.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Function(d) => d.span,
            Decl::Var(d) => d.span,
            Decl::Tag(d) => d.span,
            Decl::Typedef(d) => d.span,
        }
    }

    /// Returns the function declaration, if this is one.
    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match self {
            Decl::Function(d) => Some(d),
            _ => None,
        }
    }
}

impl From<FunctionDecl> for Decl {
    fn from(decl: FunctionDecl) -> Self {
        Decl::Function(decl)
    }
}

impl From<VarDecl> for Decl {
    fn from(decl: VarDecl) -> Self {
        Decl::Var(decl)
    }
}

impl From<TagDecl> for Decl {
    fn from(decl: TagDecl) -> Self {
        Decl::Tag(decl)
    }
}

impl From<TypedefDecl> for Decl {
    fn from(decl: TypedefDecl) -> Self {
        Decl::Typedef(decl)
    }
}

/// A group of sibling declarations that appeared together, such as
/// `int a, b;`. Most groups hold a single declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct DeclGroup {
    decls: SmallVec<[Decl; 1]>,
}

impl DeclGroup {
    /// A group holding one declaration.
    pub fn single(decl: impl Into<Decl>) -> Self {
        let mut decls = SmallVec::new();
        decls.push(decl.into());
        DeclGroup { decls }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.decls.len() == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decl> {
        self.decls.iter()
    }
}

impl FromIterator<Decl> for DeclGroup {
    fn from_iter<I: IntoIterator<Item = Decl>>(iter: I) -> Self {
        DeclGroup {
            decls: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DeclGroup {
    type Item = &'a Decl;
    type IntoIter = std::slice::Iter<'a, Decl>;

    fn into_iter(self) -> Self::IntoIter {
        self.decls.iter()
    }
}

/// Translation-unit level context shared by the front end, the IR generator
/// and the backend.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AstContext {
    /// Name of the main source file; becomes the module name.
    pub main_file: String,
    /// Target triple the front end checked the program against.
    pub target_triple: String,
}

impl AstContext {
    pub fn new(main_file: impl Into<String>, target_triple: impl Into<String>) -> Self {
        AstContext {
            main_file: main_file.into(),
            target_triple: target_triple.into(),
        }
    }
}
