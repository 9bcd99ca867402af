//! Front end and emitter against a real libclang. Each test returns early
//! when no libclang can be loaded on the host.

use pdfium_bindgen::comments::reconstruct_comments;
use pdfium_bindgen::corpus::HeaderCorpus;
use pdfium_bindgen::emit::rust::RustFfiEmitter;
use pdfium_bindgen::emit::{BindingEmitter, EmitOptions};
use pdfium_bindgen::error::BindgenError;
use pdfium_bindgen::fixups::{self, Fixup};
use pdfium_bindgen::model::*;
use pdfium_bindgen::parser::libclang::ClangParser;
use pdfium_bindgen::parser::{HeaderParser, ParseRequest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// libclang allows one live instance per process.
static LIBCLANG: Mutex<()> = Mutex::new(());

fn exclusive() -> MutexGuard<'static, ()> {
    LIBCLANG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn request(header: &str) -> ParseRequest {
    ParseRequest {
        headers: vec![fixtures().join(header)],
        include_dirs: vec![fixtures()],
        undefines: vec!["_WIN32".to_string()],
        target: None,
        extra_args: vec![],
    }
}

/// `None` when libclang is not installed.
fn parse(request: &ParseRequest) -> Option<DeclarationTree> {
    match ClangParser.parse(request) {
        Ok(tree) => Some(tree),
        Err(BindgenError::HeaderParse(message)) if message.starts_with("failed to load libclang") => {
            eprintln!("skipping: {}", message);
            None
        }
        Err(e) => panic!("parse failed: {}", e),
    }
}

fn line_of(path: &Path, needle: &str) -> u32 {
    let text = fs::read_to_string(path).unwrap();
    let index = text.lines().position(|l| l == needle).unwrap();
    index as u32 + 1
}

fn find<'a>(tree: &'a DeclarationTree, name: &str) -> Vec<&'a Declaration> {
    tree.declarations.iter().filter(|d| d.name == name).collect()
}

fn record<'a>(tree: &'a DeclarationTree, name: &str) -> &'a [Field] {
    find(tree, name)
        .into_iter()
        .find_map(|d| match &d.kind {
            DeclKind::Record(r) => r.fields.as_deref(),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no defined record `{}`", name))
}

fn constant(tree: &DeclarationTree, name: &str) -> Option<i64> {
    find(tree, name).into_iter().find_map(|d| match d.kind {
        DeclKind::Constant(value) => Some(value),
        _ => None,
    })
}

fn typedef<'a>(tree: &'a DeclarationTree, name: &str) -> Option<&'a CType> {
    find(tree, name).into_iter().find_map(|d| match &d.kind {
        DeclKind::Typedef(ty) => Some(ty),
        _ => None,
    })
}

#[test]
fn sample_header_is_lowered() {
    let _guard = exclusive();
    let request = request("fpdfview_sample.h");
    let Some(tree) = parse(&request) else {
        return;
    };
    let header = &request.headers[0];

    let init = tree.function("FPDF_InitLibraryWithConfig").unwrap();
    assert_eq!(init.location.file, *header);
    assert_eq!(init.location.line, line_of(header, "FPDF_EXPORT void FPDF_CALLCONV"));
    let DeclKind::Function(ref init_fn) = init.kind else {
        panic!("not a function");
    };
    assert_eq!(init_fn.params.len(), 1);
    assert_eq!(init_fn.params[0].name, "config");

    let fields = record(&tree, "FPDF_LIBRARY_CONFIG_");
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["version", "m_pUserFontPaths", "m_pIsolate", "m_v8EmbedderSlot"]);
    assert_eq!(fields[0].ty, CType::Int);
    assert_eq!(
        fields[1].ty,
        CType::pointer_to(CType::pointer_to(CType::Char, true), false)
    );
    assert_eq!(fields[2].ty, CType::pointer_to(CType::Void, false));
    assert_eq!(fields[3].ty, CType::UInt);
    assert!(fields.iter().all(|f| f.bit_width.is_none()));
    let version_doc: Vec<&str> = fields[0]
        .doc
        .iter()
        .flat_map(|d| d.segments())
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(version_doc, ["Version number of the interface."]);

    assert_eq!(constant(&tree, "FPDF_OBJECT_UNKNOWN"), Some(0));
    assert_eq!(constant(&tree, "FPDF_OBJECT_BOOLEAN"), Some(1));
    // Include guards and empty export macros are not constants.
    assert_eq!(constant(&tree, "PUBLIC_FPDFVIEW_H_"), None);
    assert_eq!(constant(&tree, "FPDF_EXPORT"), None);

    assert_eq!(
        typedef(&tree, "FPDF_LIBRARY_CONFIG"),
        Some(&CType::Named("FPDF_LIBRARY_CONFIG_".to_string()))
    );
    assert_eq!(
        typedef(&tree, "FPDF_DOCUMENT"),
        Some(&CType::pointer_to(
            CType::Named("fpdf_document_t__".to_string()),
            false
        ))
    );
}

#[test]
fn typedef_naming_its_own_tag_is_not_repeated() {
    let _guard = exclusive();
    let request = request("fpdfview_sample.h");
    let Some(tree) = parse(&request) else {
        return;
    };

    let size = record(&tree, "FS_SIZEF_");
    assert_eq!(size.len(), 2);
    assert_eq!(typedef(&tree, "FS_SIZEF_"), None);

    let modes = find(&tree, "FPDF_TEXT_RENDERMODE");
    assert_eq!(modes.len(), 1);
    let DeclKind::Enum(ref modes) = modes[0].kind else {
        panic!("not an enum");
    };
    let variants: Vec<(&str, i64)> = modes
        .variants
        .iter()
        .map(|v| (v.name.as_str(), v.value))
        .collect();
    assert_eq!(
        variants,
        [
            ("FPDF_TEXTRENDERMODE_UNKNOWN", -1),
            ("FPDF_TEXTRENDERMODE_FILL", 0),
            ("FPDF_TEXTRENDERMODE_STROKE", 1),
        ]
    );
}

#[test]
fn bitfields_nested_unions_and_flexible_arrays() {
    let _guard = exclusive();
    let request = request("layout_sample.h");
    let Some(tree) = parse(&request) else {
        return;
    };

    let fields = record(&tree, "packed_flags");
    let shape: Vec<(&str, Option<u32>)> = fields
        .iter()
        .map(|f| (f.name.as_str(), f.bit_width))
        .collect();
    assert_eq!(
        shape,
        [
            ("visible", Some(1)),
            ("printable", Some(1)),
            ("value", None),
            ("data", None),
        ]
    );
    assert_eq!(fields[2].ty, CType::Anonymous { is_union: true });
    assert_eq!(fields[3].ty, CType::Array(Box::new(CType::UChar), 0));

    let output = RustFfiEmitter
        .emit(&request, &tree, &EmitOptions::default())
        .unwrap();
    assert!(output.contains("_bitfield_1"));
    assert!(output.contains("__IncompleteArrayField<::std::os::raw::c_uchar>"));
    assert!(output.contains("Size of packed_flags"));
}

#[test]
fn sample_header_emits_documented_bindings() {
    let _guard = exclusive();
    let request = request("fpdfview_sample.h");
    let Some(mut tree) = parse(&request) else {
        return;
    };
    let mut corpus = HeaderCorpus::new();
    assert_eq!(reconstruct_comments(&mut tree, &mut corpus).unwrap(), 2);
    fixups::apply_all(&mut tree, &Fixup::defaults()).unwrap();

    let options = EmitOptions {
        opaque_types: vec!["FS_SIZEF_".to_string()],
        ..EmitOptions::default()
    };
    let output = RustFfiEmitter.emit(&request, &tree, &options).unwrap();

    assert!(output.contains("#![allow(non_camel_case_types"));
    assert!(output.contains("#[link(name = \"pdfium\")]\nextern \"C\" {"));
    assert!(output.contains(
        "pub fn FPDF_GetPageCount(document: FPDF_DOCUMENT) -> ::std::os::raw::c_int;"
    ));
    assert!(output.contains("    /// * document - Handle to document. Returned by FPDF_LoadDocument.\n"));
    assert!(!output.contains("/// Function:"));

    assert!(!output.contains("pub m_pUserFontPaths"));
    assert!(output.contains("    m_pUserFontPaths: *mut *const ::std::os::raw::c_char,"));
    assert!(output.contains("pub version: ::std::os::raw::c_int,"));

    assert!(output.contains(
        "pub const FPDF_TEXTRENDERMODE_UNKNOWN: FPDF_TEXT_RENDERMODE = -1;"
    ));
    assert!(output.contains("_bindgen_opaque_blob"));
}
