//! libclang front end.
//!
//! Parses every requested header through one in-memory umbrella translation
//! unit and lowers the cursors that originate in those headers into the
//! declaration tree. libclang is loaded at runtime, so building the crate does
//! not require it.

use super::{HeaderParser, ParseRequest};
use crate::error::{BindgenError, Result};
use crate::model::*;
use clang::diagnostic::Severity;
use clang::{Clang, Entity, EntityKind, Index, Type, TypeKind, Unsaved};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UMBRELLA: &str = "__pdfium_bindgen_umbrella.c";

/// [`HeaderParser`] backed by libclang.
#[derive(Debug, Default)]
pub struct ClangParser;

impl HeaderParser for ClangParser {
    fn parse(&self, request: &ParseRequest) -> Result<DeclarationTree> {
        let clang = Clang::new()
            .map_err(|e| BindgenError::HeaderParse(format!("failed to load libclang: {}", e)))?;
        let index = Index::new(&clang, false, false);

        let base = request
            .include_dirs
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        let umbrella = base.join(UMBRELLA);
        let source = request.umbrella_source();
        let args = request.compiler_args();
        debug!(?args, umbrella = %umbrella.display(), "invoking libclang");

        let tu = index
            .parser(umbrella.clone())
            .arguments(&args)
            .unsaved(&[Unsaved::new(&umbrella, &source)])
            .detailed_preprocessing_record(true)
            .skip_function_bodies(true)
            .parse()
            .map_err(|e| BindgenError::HeaderParse(e.to_string()))?;

        let errors: Vec<String> = tu
            .get_diagnostics()
            .iter()
            .filter(|d| matches!(d.get_severity(), Severity::Error | Severity::Fatal))
            .map(|d| d.get_text())
            .collect();
        if !errors.is_empty() {
            return Err(BindgenError::HeaderParse(errors.join("; ")));
        }

        let mut visitor = Visitor {
            headers: HeaderSet::new(&request.headers),
            tree: DeclarationTree::new(),
        };
        for entity in tu.get_entity().get_children() {
            visitor.visit(entity)?;
        }

        info!(
            declarations = visitor.tree.len(),
            headers = request.headers.len(),
            "parsed header corpus"
        );
        Ok(visitor.tree)
    }
}

// -- Header membership --------------------------------------------------------

/// Requested headers keyed by canonical path, mapped back to the path the
/// caller used so locations match the corpus loader's keys.
struct HeaderSet {
    files: HashMap<PathBuf, PathBuf>,
}

impl HeaderSet {
    fn new(headers: &[PathBuf]) -> Self {
        let files = headers
            .iter()
            .map(|h| (canonical(h), h.clone()))
            .collect();
        HeaderSet { files }
    }

    fn resolve(&self, path: &Path) -> Option<&PathBuf> {
        self.files.get(&canonical(path))
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// -- Lowering -----------------------------------------------------------------

struct Visitor {
    headers: HeaderSet,
    tree: DeclarationTree,
}

impl Visitor {
    /// Where `entity` starts, if it starts inside a requested header.
    ///
    /// Uses the extent start so that export macros and return types on the
    /// line above a function name still count as the declaration's first line.
    fn locate(&self, entity: &Entity) -> Option<SourceLocation> {
        let start = entity
            .get_range()
            .map(|r| r.get_start())
            .or_else(|| entity.get_location())?;
        let loc = start.get_expansion_location();
        let file = self.headers.resolve(&loc.file?.get_path())?;
        Some(SourceLocation {
            file: file.clone(),
            line: loc.line,
        })
    }

    fn in_corpus(&self, entity: &Entity) -> bool {
        self.locate(entity).is_some()
    }

    fn visit(&mut self, entity: Entity) -> Result<()> {
        let Some(location) = self.locate(&entity) else {
            return Ok(());
        };

        let kind = match entity.get_kind() {
            EntityKind::FunctionDecl => DeclKind::Function(self.function_decl(&entity)?),
            EntityKind::Method => DeclKind::Method(self.function_decl(&entity)?),
            EntityKind::StructDecl | EntityKind::UnionDecl => {
                // Unnamed records are lowered through their typedef.
                if unnamed(&entity) {
                    return Ok(());
                }
                DeclKind::Record(self.record_decl(&entity)?)
            }
            EntityKind::EnumDecl => {
                if unnamed(&entity) {
                    return Ok(());
                }
                DeclKind::Enum(self.enum_decl(&entity)?)
            }
            EntityKind::TypedefDecl => return self.visit_typedef(entity, location),
            EntityKind::MacroDefinition => match macro_value(&entity) {
                Some(value) => DeclKind::Constant(value),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        let Some(name) = entity.get_name() else {
            return Ok(());
        };
        self.tree.insert(Declaration {
            name,
            kind,
            location,
            doc: native_doc(&entity),
        });
        Ok(())
    }

    fn visit_typedef(&mut self, entity: Entity, location: SourceLocation) -> Result<()> {
        let Some(name) = entity.get_name() else {
            return Ok(());
        };
        let Some(underlying) = entity.get_typedef_underlying_type() else {
            return Ok(());
        };

        // `typedef struct { .. } NAME;` and `typedef enum { .. } NAME;`
        if let Some(decl) = unelaborate(underlying).get_declaration() {
            let kind = decl.get_kind();
            let tagged = matches!(
                kind,
                EntityKind::StructDecl | EntityKind::UnionDecl | EntityKind::EnumDecl
            );
            if tagged && unnamed(&decl) {
                let kind = if kind == EntityKind::EnumDecl {
                    DeclKind::Enum(self.enum_decl(&decl)?)
                } else {
                    DeclKind::Record(self.record_decl(&decl)?)
                };
                self.tree.insert(Declaration {
                    name,
                    kind,
                    location,
                    doc: native_doc(&entity).or_else(|| native_doc(&decl)),
                });
                return Ok(());
            }
        }

        let ty = self
            .convert_type(underlying)
            .map_err(|e| context(e, &format!("typedef `{}`", name)))?;
        // `typedef struct NAME { .. } NAME;` names the record itself.
        if ty == CType::Named(name.clone()) {
            return Ok(());
        }
        self.tree.insert(Declaration {
            name,
            kind: DeclKind::Typedef(ty),
            location,
            doc: native_doc(&entity),
        });
        Ok(())
    }

    fn function_decl(&self, entity: &Entity) -> Result<FunctionDecl> {
        let name = entity.get_name().unwrap_or_default();
        let return_type = match entity.get_result_type() {
            Some(ty) => self
                .convert_type(ty)
                .map_err(|e| context(e, &format!("return type of `{}`", name)))?,
            None => CType::Void,
        };
        let params = entity
            .get_arguments()
            .unwrap_or_default()
            .into_iter()
            .map(|arg| {
                let param = arg.get_name().unwrap_or_default();
                let ty = arg
                    .get_type()
                    .ok_or_else(|| BindgenError::HeaderParse(format!("untyped parameter `{}`", param)))
                    .and_then(|ty| self.convert_type(ty))
                    .map_err(|e| context(e, &format!("parameter `{}` of `{}`", param, name)))?;
                Ok(Param { name: param, ty })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FunctionDecl {
            return_type,
            params,
            variadic: entity.is_variadic(),
        })
    }

    fn record_decl(&self, entity: &Entity) -> Result<RecordDecl> {
        let is_union = entity.get_kind() == EntityKind::UnionDecl;
        if !entity.is_definition() {
            return Ok(RecordDecl {
                is_union,
                fields: None,
            });
        }
        let fields = entity
            .get_children()
            .into_iter()
            .filter(|c| c.get_kind() == EntityKind::FieldDecl)
            .map(|field| {
                let name = field.get_name().unwrap_or_default();
                let ty = field
                    .get_type()
                    .ok_or_else(|| BindgenError::HeaderParse(format!("untyped field `{}`", name)))
                    .and_then(|ty| self.convert_type(ty))
                    .map_err(|e| context(e, &format!("field `{}`", name)))?;
                Ok(Field {
                    name,
                    ty,
                    bit_width: field.get_bit_field_width().and_then(|w| u32::try_from(w).ok()),
                    doc: native_doc(&field),
                    ignored: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordDecl {
            is_union,
            fields: Some(fields),
        })
    }

    fn enum_decl(&self, entity: &Entity) -> Result<EnumDecl> {
        let underlying = match entity.get_enum_underlying_type() {
            Some(ty) => self.convert_type(ty)?,
            None => CType::Int,
        };
        let variants = entity
            .get_children()
            .into_iter()
            .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
            .filter_map(|c| {
                let (value, _) = c.get_enum_constant_value()?;
                Some(EnumVariant {
                    name: c.get_name()?,
                    value,
                    doc: native_doc(&c),
                })
            })
            .collect();
        Ok(EnumDecl {
            underlying,
            variants,
        })
    }

    fn convert_type(&self, ty: Type) -> Result<CType> {
        let converted = match ty.get_kind() {
            TypeKind::Void => CType::Void,
            TypeKind::Bool => CType::Bool,
            TypeKind::CharS | TypeKind::CharU => CType::Char,
            TypeKind::SChar => CType::SChar,
            TypeKind::UChar => CType::UChar,
            TypeKind::Short => CType::Short,
            TypeKind::UShort => CType::UShort,
            TypeKind::Int => CType::Int,
            TypeKind::UInt => CType::UInt,
            TypeKind::Long => CType::Long,
            TypeKind::ULong => CType::ULong,
            TypeKind::LongLong => CType::LongLong,
            TypeKind::ULongLong => CType::ULongLong,
            TypeKind::Float => CType::Float,
            TypeKind::Double => CType::Double,
            TypeKind::WChar => match ty.get_sizeof() {
                Ok(2) => CType::UInt16,
                _ => CType::Int32,
            },
            TypeKind::Pointer => {
                let pointee = ty.get_pointee_type().ok_or_else(|| unsupported(&ty))?;
                let canonical = pointee.get_canonical_type();
                if is_function(canonical.get_kind()) {
                    let function = if is_function(pointee.get_kind()) { pointee } else { canonical };
                    self.function_pointer(function)?
                } else {
                    CType::pointer_to(self.convert_type(pointee)?, pointee.is_const_qualified())
                }
            }
            TypeKind::ConstantArray => {
                let element = ty.get_element_type().ok_or_else(|| unsupported(&ty))?;
                CType::Array(Box::new(self.convert_type(element)?), ty.get_size().unwrap_or(0))
            }
            // Flexible array members occupy no storage.
            TypeKind::IncompleteArray => {
                let element = ty.get_element_type().ok_or_else(|| unsupported(&ty))?;
                CType::Array(Box::new(self.convert_type(element)?), 0)
            }
            TypeKind::Elaborated => {
                let named = ty.get_elaborated_type().ok_or_else(|| unsupported(&ty))?;
                self.convert_type(named)?
            }
            TypeKind::Typedef => self.typedef_type(ty)?,
            TypeKind::Record | TypeKind::Enum => {
                let decl = ty.get_declaration().ok_or_else(|| unsupported(&ty))?;
                match decl.get_name() {
                    Some(name) if !unnamed(&decl) => CType::Named(name),
                    _ if decl.get_kind() == EntityKind::EnumDecl => match decl.get_enum_underlying_type() {
                        Some(underlying) => self.convert_type(underlying)?,
                        None => CType::Int,
                    },
                    _ => CType::Anonymous {
                        is_union: decl.get_kind() == EntityKind::UnionDecl,
                    },
                }
            }
            TypeKind::FunctionPrototype | TypeKind::FunctionNoPrototype => self.function_pointer(ty)?,
            _ => {
                let canonical = ty.get_canonical_type();
                if canonical.get_kind() == ty.get_kind() {
                    return Err(unsupported(&ty));
                }
                self.convert_type(canonical)?
            }
        };
        Ok(converted)
    }

    /// Typedefs from the corpus stay named; system typedefs are resolved,
    /// with the fixed-width integers mapped directly.
    fn typedef_type(&self, ty: Type) -> Result<CType> {
        let name = ty.get_typedef_name().unwrap_or_else(|| ty.get_display_name());
        if let Some(fixed) = fixed_width(&name) {
            return Ok(fixed);
        }
        let from_corpus = ty
            .get_declaration()
            .is_some_and(|decl| self.in_corpus(&decl));
        if from_corpus {
            Ok(CType::Named(name))
        } else {
            self.convert_type(ty.get_canonical_type())
        }
    }

    fn function_pointer(&self, function: Type) -> Result<CType> {
        let return_type = match function.get_result_type() {
            Some(ty) => self.convert_type(ty)?,
            None => CType::Void,
        };
        let params = function
            .get_argument_types()
            .unwrap_or_default()
            .into_iter()
            .map(|ty| self.convert_type(ty))
            .collect::<Result<Vec<_>>>()?;
        Ok(CType::FunctionPointer {
            return_type: Box::new(return_type),
            params,
            variadic: function.is_variadic(),
        })
    }
}

/// A tag without an identifier of its own. Depending on the libclang version
/// these report no name, an empty one, or a synthesized `(unnamed ...)` one.
fn unnamed(entity: &Entity) -> bool {
    entity.is_anonymous() || !entity.get_name().is_some_and(|name| is_identifier(&name))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn is_function(kind: TypeKind) -> bool {
    matches!(kind, TypeKind::FunctionPrototype | TypeKind::FunctionNoPrototype)
}

fn unelaborate(ty: Type) -> Type {
    if ty.get_kind() == TypeKind::Elaborated {
        ty.get_elaborated_type().unwrap_or(ty)
    } else {
        ty
    }
}

fn fixed_width(name: &str) -> Option<CType> {
    let ty = match name {
        "int8_t" => CType::Int8,
        "uint8_t" => CType::UInt8,
        "int16_t" => CType::Int16,
        "uint16_t" => CType::UInt16,
        "int32_t" => CType::Int32,
        "uint32_t" => CType::UInt32,
        "int64_t" => CType::Int64,
        "uint64_t" => CType::UInt64,
        "size_t" => CType::Size,
        _ => return None,
    };
    Some(ty)
}

fn unsupported(ty: &Type) -> BindgenError {
    BindgenError::HeaderParse(format!("unsupported type `{}`", ty.get_display_name()))
}

fn context(err: BindgenError, what: &str) -> BindgenError {
    match err {
        BindgenError::HeaderParse(message) => {
            BindgenError::HeaderParse(format!("{}: {}", what, message))
        }
        other => other,
    }
}

/// Comment libclang attached to the cursor, one segment per non-empty line.
fn native_doc(entity: &Entity) -> Option<Documentation> {
    let raw = entity.get_comment()?;
    let segments: Vec<Segment> = raw
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_suffix("*/").unwrap_or(line);
            line.trim_start_matches(['/', '*', '!', '<'])
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .map(|text| Segment {
            section: CommentSection::Unset,
            text,
            trailing_newline: true,
        })
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(Documentation::single(Paragraph { segments }))
    }
}

// -- Macros -------------------------------------------------------------------

fn macro_value(entity: &Entity) -> Option<i64> {
    if entity.is_function_like_macro() || entity.is_builtin_macro() {
        return None;
    }
    let tokens: Vec<String> = entity
        .get_range()?
        .tokenize()
        .iter()
        .map(|t| t.get_spelling())
        .collect();
    // First token is the macro name.
    parse_integer_macro(tokens.get(1..)?)
}

/// Value of a macro body made of a single integer literal, optionally
/// parenthesized, negated, or shifted by another literal.
pub fn parse_integer_macro(body: &[String]) -> Option<i64> {
    let mut tokens: Vec<&str> = body.iter().map(String::as_str).collect();
    while tokens.first() == Some(&"(") && tokens.last() == Some(&")") {
        tokens = tokens[1..tokens.len() - 1].to_vec();
    }
    match tokens.as_slice() {
        [literal] => parse_literal(literal),
        ["-", literal] => parse_literal(literal).map(|v| -v),
        [lhs, "<<", rhs] => {
            let shift = u32::try_from(parse_literal(rhs)?).ok()?;
            parse_literal(lhs)?.checked_shl(shift)
        }
        _ => None,
    }
}

fn parse_literal(token: &str) -> Option<i64> {
    let digits = token.trim_end_matches(['u', 'U', 'l', 'L']);
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };
    i64::try_from(value).ok()
}
