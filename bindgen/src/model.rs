//! Parser-agnostic declaration tree for one generation run.

use std::collections::HashMap;
use std::path::PathBuf;

/// Every declaration extracted from the header corpus, in visit order.
#[derive(Debug, Default)]
pub struct DeclarationTree {
    pub declarations: Vec<Declaration>,
    /// (kind tag, name) → position in `declarations`
    index: HashMap<(&'static str, String), usize>,
}

/// A single declaration with its source location.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub location: SourceLocation,
    pub doc: Option<Documentation>,
}

/// Where a declaration starts in the header corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Function(FunctionDecl),
    /// Member functions only appear in C++ headers. Their documentation is
    /// never reconstructed and they are not emitted.
    Method(FunctionDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Typedef(CType),
    /// Object-like macro expanding to an integer literal.
    Constant(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub return_type: CType,
    pub params: Vec<Param>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Empty for unnamed prototype parameters.
    pub name: String,
    pub ty: CType,
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub is_union: bool,
    /// `None` for records that are only ever forward-declared.
    pub fields: Option<Vec<Field>>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: CType,
    /// Width in bits for bitfield members.
    pub bit_width: Option<u32>,
    pub doc: Option<Documentation>,
    /// Set by fixups: the field is kept for layout but hidden from the surface.
    pub ignored: bool,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub underlying: CType,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
    pub doc: Option<Documentation>,
}

/// C type as seen through the ABI.
#[derive(Debug, Clone, PartialEq)]
pub enum CType {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    /// Fixed-width integers from `<stdint.h>`, plus `size_t`.
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Size,
    Pointer {
        pointee: Box<CType>,
        is_const: bool,
    },
    Array(Box<CType>, usize),
    FunctionPointer {
        return_type: Box<CType>,
        params: Vec<CType>,
        variadic: bool,
    },
    /// Reference to a typedef, record or enum declared in the corpus.
    Named(String),
    /// Unnamed struct or union nested inside a record.
    Anonymous { is_union: bool },
}

impl CType {
    pub fn pointer_to(pointee: CType, is_const: bool) -> CType {
        CType::Pointer {
            pointee: Box::new(pointee),
            is_const,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer { .. } | CType::FunctionPointer { .. })
    }
}

// -- Documentation ------------------------------------------------------------

/// Structured documentation attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documentation {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
}

/// One semantic unit of a comment: a summary line, one parameter, the return
/// value, a remark, or a section label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub section: CommentSection,
    pub text: String,
    pub trailing_newline: bool,
}

/// Section of a header comment block, selected by its label line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CommentSection {
    #[default]
    Unset,
    Function,
    Parameters,
    ReturnValue,
    Comments,
}

impl CommentSection {
    pub const LABELS: [(&'static str, CommentSection); 4] = [
        ("Function:", CommentSection::Function),
        ("Parameters:", CommentSection::Parameters),
        ("Return value:", CommentSection::ReturnValue),
        ("Comments:", CommentSection::Comments),
    ];

    /// Exact match against the label vocabulary.
    pub fn from_label(text: &str) -> Option<CommentSection> {
        Self::LABELS
            .iter()
            .find(|(label, _)| *label == text)
            .map(|(_, section)| *section)
    }

    pub fn label(self) -> Option<&'static str> {
        Self::LABELS
            .iter()
            .find(|(_, section)| *section == self)
            .map(|(label, _)| *label)
    }
}

impl Documentation {
    pub fn single(paragraph: Paragraph) -> Self {
        Documentation {
            paragraphs: vec![paragraph],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.iter().all(|p| p.segments.is_empty())
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.paragraphs.iter().flat_map(|p| p.segments.iter())
    }
}

// -- Tree operations ----------------------------------------------------------

impl DeclKind {
    fn tag(&self) -> &'static str {
        match self {
            DeclKind::Function(_) => "function",
            DeclKind::Method(_) => "method",
            DeclKind::Record(_) => "record",
            DeclKind::Enum(_) => "enum",
            DeclKind::Typedef(_) => "typedef",
            DeclKind::Constant(_) => "constant",
        }
    }
}

impl DeclarationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, visiting each (kind, name) exactly once.
    ///
    /// A record definition replaces an earlier forward declaration of the
    /// same record. Any other repeat is dropped and `false` is returned.
    pub fn insert(&mut self, decl: Declaration) -> bool {
        let key = (decl.kind.tag(), decl.name.clone());
        if let Some(&pos) = self.index.get(&key) {
            let existing = &mut self.declarations[pos];
            let upgrades = matches!(
                (&existing.kind, &decl.kind),
                (DeclKind::Record(old), DeclKind::Record(new))
                    if old.fields.is_none() && new.fields.is_some()
            );
            if upgrades {
                *existing = decl;
                return true;
            }
            return false;
        }
        self.index.insert(key, self.declarations.len());
        self.declarations.push(decl);
        true
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Find a record (struct or union) by exact name.
    pub fn record_mut(&mut self, name: &str) -> Option<&mut RecordDecl> {
        let pos = *self.index.get(&("record", name.to_string()))?;
        match &mut self.declarations[pos].kind {
            DeclKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn function(&self, name: &str) -> Option<&Declaration> {
        let pos = *self.index.get(&("function", name.to_string()))?;
        self.declarations.get(pos)
    }
}
