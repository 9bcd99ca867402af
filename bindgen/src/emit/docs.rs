//! Documentation rendering and placement.
//!
//! The code generator knows nothing about the reconstructed documentation, so
//! its output is annotated afterwards: every item and field that has
//! documentation in the tree gets a `///` block in front of its attributes,
//! and the `extern` block gets its `#[link]` attribute.

use crate::emit::{DocStyle, EmitOptions};
use crate::error::{BindgenError, Result};
use crate::model::*;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

static RE_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)pub (fn|struct|union|type|const|static) (?:r#)?([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});
static RE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s+)(?:pub(?:\([a-z]+\))? )?(?:r#)?([A-Za-z_][A-Za-z0-9_]*):").unwrap()
});
static RE_EXTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*)(?:unsafe )?extern "C" \{"#).unwrap());

/// Sentinel line opening a PDFium comment block; it only repeats the name.
const FUNCTION_SENTINEL: &str = "Function:";

// -- Rendering ----------------------------------------------------------------

/// Doc comment body for `doc`, one entry per output line. Empty entries are
/// paragraph breaks; there is never a leading, trailing or doubled break.
pub fn doc_lines(doc: &Documentation, style: DocStyle) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in doc.paragraphs.iter().filter(|p| !p.segments.is_empty()) {
        push_break(&mut lines);
        match style {
            DocStyle::Plain => {
                for segment in &paragraph.segments {
                    if segment.text.is_empty() {
                        push_break(&mut lines);
                    } else {
                        lines.push(segment.text.clone());
                    }
                }
            }
            DocStyle::Markdown => markdown_paragraph(paragraph, &mut lines),
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// `doc` as `///` lines at `indent`.
pub fn render_doc(doc: &Documentation, indent: &str, style: DocStyle) -> Vec<String> {
    doc_lines(doc, style)
        .into_iter()
        .map(|line| {
            if line.is_empty() {
                format!("{}///", indent)
            } else {
                format!("{}/// {}", indent, line)
            }
        })
        .collect()
}

fn push_break(lines: &mut Vec<String>) {
    if lines.last().is_some_and(|l| !l.is_empty()) {
        lines.push(String::new());
    }
}

fn markdown_paragraph(paragraph: &Paragraph, lines: &mut Vec<String>) {
    for segment in &paragraph.segments {
        if segment.text.starts_with(FUNCTION_SENTINEL) {
            continue;
        }
        if segment.text.is_empty() {
            push_break(lines);
            continue;
        }

        let label_rest = segment
            .section
            .label()
            .and_then(|label| segment.text.strip_prefix(label));

        let body = match label_rest {
            Some(rest) => {
                if let Some(heading) = heading(segment.section) {
                    push_break(lines);
                    lines.push(format!("# {}", heading));
                    lines.push(String::new());
                }
                rest.trim()
            }
            None => segment.text.as_str(),
        };

        if body.is_empty() {
            continue;
        }
        if segment.section == CommentSection::Parameters {
            lines.push(format!("* {}", body));
        } else {
            lines.push(body.to_string());
        }
    }
}

fn heading(section: CommentSection) -> Option<&'static str> {
    match section {
        CommentSection::Parameters => Some("Parameters"),
        CommentSection::ReturnValue => Some("Returns"),
        CommentSection::Comments => Some("Remarks"),
        CommentSection::Function | CommentSection::Unset => None,
    }
}

// -- Placement ----------------------------------------------------------------

/// Item namespace a generated `pub` item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Function,
    Record,
    Type,
    Const,
}

impl Slot {
    fn of_keyword(keyword: &str) -> Option<Slot> {
        match keyword {
            "fn" => Some(Slot::Function),
            "struct" | "union" => Some(Slot::Record),
            "type" => Some(Slot::Type),
            "const" => Some(Slot::Const),
            _ => None,
        }
    }
}

/// Documentation of the tree, keyed the way generated items are named.
#[derive(Default)]
struct DocIndex<'t> {
    items: HashMap<(Slot, &'t str), &'t Documentation>,
    fields: HashMap<(&'t str, &'t str), &'t Documentation>,
}

impl<'t> DocIndex<'t> {
    fn new(tree: &'t DeclarationTree) -> Self {
        let mut index = DocIndex::default();
        for decl in &tree.declarations {
            let slot = match &decl.kind {
                DeclKind::Function(_) => Slot::Function,
                DeclKind::Method(_) => continue,
                DeclKind::Record(record) => {
                    for field in record.fields.iter().flatten() {
                        if let Some(doc) = field.doc.as_ref().filter(|d| !d.is_empty()) {
                            index.fields.insert((decl.name.as_str(), field.name.as_str()), doc);
                        }
                    }
                    Slot::Record
                }
                DeclKind::Enum(decl_enum) => {
                    for variant in &decl_enum.variants {
                        if let Some(doc) = variant.doc.as_ref() {
                            index.add(Slot::Const, &variant.name, doc);
                        }
                    }
                    Slot::Type
                }
                DeclKind::Typedef(_) => Slot::Type,
                DeclKind::Constant(_) => Slot::Const,
            };
            if let Some(doc) = decl.doc.as_ref() {
                index.add(slot, &decl.name, doc);
            }
        }
        index
    }

    fn add(&mut self, slot: Slot, name: &'t str, doc: &'t Documentation) {
        if !doc.is_empty() {
            self.items.entry((slot, name)).or_insert(doc);
        }
    }
}

/// Insert `block` in front of the attributes directly above the line about
/// to be pushed.
fn insert_above_attributes(out: &mut Vec<String>, indent: &str, block: Vec<String>) {
    let mut at = out.len();
    while at > 0 {
        let previous = &out[at - 1];
        let same_indent = previous.len() - previous.trim_start().len() == indent.len();
        if same_indent && previous.trim_start().starts_with("#[") {
            at -= 1;
        } else {
            break;
        }
    }
    out.splice(at..at, block);
}

/// Annotate generated Rust source with the tree's documentation and link the
/// `extern` blocks against `options.link_name`.
///
/// Every free function of the tree must appear in `generated`; a missing one
/// is a [`BindgenError::ShapeMismatch`].
pub fn annotate(generated: &str, tree: &DeclarationTree, options: &EmitOptions) -> Result<String> {
    let index = DocIndex::new(tree);
    let mut missing: BTreeSet<&str> = tree
        .declarations
        .iter()
        .filter(|d| matches!(d.kind, DeclKind::Function(_)))
        .map(|d| d.name.as_str())
        .collect();
    let mut placed: HashSet<(Slot, String)> = HashSet::new();
    // Record whose body is being copied, with its indent.
    let mut record: Option<(String, usize)> = None;
    let mut out: Vec<String> = Vec::new();

    for line in generated.lines() {
        if let Some((name, indent)) = &record {
            let closes = line.trim() == "}" && line.len() - line.trim_start().len() == *indent;
            if closes {
                record = None;
            } else if let Some(caps) = RE_FIELD.captures(line) {
                if let Some(doc) = index.fields.get(&(name.as_str(), &caps[2])) {
                    out.extend(render_doc(doc, &caps[1], options.doc_style));
                }
            }
            out.push(line.to_string());
            continue;
        }

        if let Some(caps) = RE_EXTERN.captures(line) {
            let indent = &caps[1];
            let link = format!("{}#[link(name = \"{}\")]", indent, options.link_name);
            insert_above_attributes(&mut out, indent, vec![link]);
        } else if let Some(caps) = RE_ITEM.captures(line) {
            let (indent, keyword, name) = (&caps[1], &caps[2], &caps[3]);
            if let Some(slot) = Slot::of_keyword(keyword) {
                if slot == Slot::Function {
                    missing.remove(name);
                }
                if placed.insert((slot, name.to_string())) {
                    if let Some(doc) = index.items.get(&(slot, name)) {
                        let block = render_doc(doc, indent, options.doc_style);
                        insert_above_attributes(&mut out, indent, block);
                    }
                }
                if slot == Slot::Record && line.trim_end().ends_with('{') {
                    record = Some((name.to_string(), indent.len()));
                }
            }
        }
        out.push(line.to_string());
    }

    if !missing.is_empty() {
        let names: Vec<&str> = missing.into_iter().collect();
        return Err(BindgenError::ShapeMismatch(format!(
            "functions missing from generated bindings: {}",
            names.join(", ")
        )));
    }

    let mut annotated = out.join("\n");
    annotated.push('\n');
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn seg(section: CommentSection, text: &str) -> Segment {
        Segment {
            section,
            text: text.to_string(),
            trailing_newline: true,
        }
    }

    fn decl(name: &str, kind: DeclKind, doc: Option<Documentation>) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind,
            location: SourceLocation {
                file: PathBuf::from("fpdfview.h"),
                line: 1,
            },
            doc,
        }
    }

    fn function() -> DeclKind {
        DeclKind::Function(FunctionDecl {
            return_type: CType::Void,
            params: vec![],
            variadic: false,
        })
    }

    fn page_count_doc() -> Documentation {
        Documentation::single(Paragraph {
            segments: vec![
                seg(CommentSection::Unset, "Function: FPDF_GetPageCount"),
                seg(CommentSection::Unset, "Get total number of pages in the document."),
                seg(CommentSection::Parameters, "Parameters:"),
                seg(
                    CommentSection::Parameters,
                    "document - Handle to the loaded document. Must not be null.",
                ),
                seg(CommentSection::ReturnValue, "Return value:"),
                seg(CommentSection::ReturnValue, "The number of pages."),
            ],
        })
    }

    #[test]
    fn markdown_uses_headings_and_bullets_without_sentinel() {
        assert_eq!(
            doc_lines(&page_count_doc(), DocStyle::Markdown),
            [
                "Get total number of pages in the document.",
                "",
                "# Parameters",
                "",
                "* document - Handle to the loaded document. Must not be null.",
                "",
                "# Returns",
                "",
                "The number of pages.",
            ]
        );
    }

    #[test]
    fn plain_keeps_every_segment() {
        let lines = doc_lines(&page_count_doc(), DocStyle::Plain);
        assert_eq!(lines[0], "Function: FPDF_GetPageCount");
        assert_eq!(lines[2], "Parameters:");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn remarks_keep_text_merged_into_label() {
        let doc = Documentation::single(Paragraph {
            segments: vec![seg(
                CommentSection::Comments,
                "Comments: Call once before any other function.",
            )],
        });
        assert_eq!(
            doc_lines(&doc, DocStyle::Markdown),
            ["# Remarks", "", "Call once before any other function."]
        );
    }

    #[test]
    fn empty_segments_become_single_breaks() {
        let doc = Documentation::single(Paragraph {
            segments: vec![
                seg(CommentSection::Comments, "Comments: First paragraph."),
                seg(CommentSection::Comments, ""),
                seg(CommentSection::Comments, ""),
                seg(CommentSection::Comments, "Second paragraph."),
                seg(CommentSection::Comments, ""),
            ],
        });
        assert_eq!(
            doc_lines(&doc, DocStyle::Markdown),
            ["# Remarks", "", "First paragraph.", "", "Second paragraph."]
        );
        assert_eq!(
            doc_lines(&doc, DocStyle::Plain),
            ["Comments: First paragraph.", "", "Second paragraph."]
        );
        assert_eq!(
            render_doc(&doc, "    ", DocStyle::Plain),
            [
                "    /// Comments: First paragraph.",
                "    ///",
                "    /// Second paragraph."
            ]
        );
    }

    #[test]
    fn empty_documentation_renders_nothing() {
        let doc = Documentation::single(Paragraph::default());
        assert!(doc_lines(&doc, DocStyle::Markdown).is_empty());
    }

    const GENERATED: &str = r#"#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct FPDF_LIBRARY_CONFIG_ {
    pub version: ::std::os::raw::c_int,
    m_pUserFontPaths: *mut *const ::std::os::raw::c_char,
}
pub type FPDF_LIBRARY_CONFIG = FPDF_LIBRARY_CONFIG_;
pub const FPDF_OBJECT_UNKNOWN: u32 = 0;
extern "C" {
    pub fn FPDF_GetPageCount(document: FPDF_DOCUMENT) -> ::std::os::raw::c_int;
}
extern "C" {
    pub fn FPDF_DestroyLibrary();
}
"#;

    fn documented_tree() -> DeclarationTree {
        let note = |text: &str| {
            Some(Documentation::single(Paragraph {
                segments: vec![seg(CommentSection::Unset, text)],
            }))
        };
        let mut tree = DeclarationTree::new();
        tree.insert(decl(
            "FPDF_LIBRARY_CONFIG_",
            DeclKind::Record(RecordDecl {
                is_union: false,
                fields: Some(vec![Field {
                    name: "version".to_string(),
                    ty: CType::Int,
                    bit_width: None,
                    doc: note("Version number of the interface."),
                    ignored: false,
                }]),
            }),
            note("Process-wide options for initializing the library."),
        ));
        tree.insert(decl("FPDF_OBJECT_UNKNOWN", DeclKind::Constant(0), note("PDF object types")));
        tree.insert(decl("FPDF_GetPageCount", function(), Some(page_count_doc())));
        tree.insert(decl(
            "FPDF_DestroyLibrary",
            function(),
            Some(Documentation::single(Paragraph::default())),
        ));
        tree
    }

    #[test]
    fn docs_precede_attributes_items_and_fields() {
        let out = annotate(GENERATED, &documented_tree(), &EmitOptions::default()).unwrap();
        assert!(out.starts_with(
            "/// Process-wide options for initializing the library.\n#[repr(C)]\n#[derive(Debug, Copy, Clone)]\npub struct FPDF_LIBRARY_CONFIG_ {\n    /// Version number of the interface.\n    pub version: ::std::os::raw::c_int,\n    m_pUserFontPaths:"
        ), "{}", out);
        assert!(out.contains("/// PDF object types\npub const FPDF_OBJECT_UNKNOWN: u32 = 0;\n"));
        assert!(out.contains(
            "    /// Get total number of pages in the document.\n    ///\n    /// # Parameters\n"
        ));
        assert!(out.contains("    /// The number of pages.\n    pub fn FPDF_GetPageCount("));
        assert!(!out.contains("Function: FPDF_GetPageCount"));
        assert!(out.contains("{\n    pub fn FPDF_DestroyLibrary();\n}\n"));
    }

    #[test]
    fn every_extern_block_is_linked() {
        let options = EmitOptions {
            link_name: "pdfium.dll".to_string(),
            ..EmitOptions::default()
        };
        let out = annotate(GENERATED, &documented_tree(), &options).unwrap();
        assert_eq!(out.matches("#[link(name = \"pdfium.dll\")]\nextern \"C\" {\n").count(), 2);
    }

    #[test]
    fn unsafe_extern_blocks_are_linked() {
        let generated = "unsafe extern \"C\" {\n    pub fn FPDF_DestroyLibrary();\n}\n";
        let mut tree = DeclarationTree::new();
        tree.insert(decl("FPDF_DestroyLibrary", function(), None));
        let out = annotate(generated, &tree, &EmitOptions::default()).unwrap();
        assert!(out.starts_with("#[link(name = \"pdfium\")]\nunsafe extern \"C\" {\n"));
    }

    #[test]
    fn function_absent_from_output_is_shape_mismatch() {
        let mut tree = documented_tree();
        tree.insert(decl("FPDF_CloseDocument", function(), None));
        let err = annotate(GENERATED, &tree, &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, BindgenError::ShapeMismatch(ref m) if m.contains("FPDF_CloseDocument")));
    }

    #[test]
    fn methods_are_not_required() {
        let mut tree = documented_tree();
        tree.insert(decl(
            "Close",
            DeclKind::Method(FunctionDecl {
                return_type: CType::Void,
                params: vec![],
                variadic: false,
            }),
            None,
        ));
        assert!(annotate(GENERATED, &tree, &EmitOptions::default()).is_ok());
    }
}
