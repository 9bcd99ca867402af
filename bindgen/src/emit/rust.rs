//! Rust `extern "C"` emitter backed by `bindgen`.
//!
//! bindgen re-reads the header corpus with the same compiler arguments the
//! parser used and owns type lowering and record layout, layout assertions
//! included. The declaration tree decides what is generated and which fields
//! stay private; the reconstructed documentation is attached afterwards.

use crate::emit::{docs, BindingEmitter, EmitOptions};
use crate::error::{BindgenError, Result};
use crate::model::{DeclKind, DeclarationTree};
use crate::parser::ParseRequest;
use bindgen::callbacks::{FieldInfo, ParseCallbacks};
use bindgen::{EnumVariation, FieldVisibilityKind, Formatter};
use std::collections::HashSet;
use tracing::{debug, info};

const UMBRELLA: &str = "__pdfium_bindgen_umbrella.h";

const PREAMBLE: &str =
    "#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]";

#[derive(Debug, Default)]
pub struct RustFfiEmitter;

/// Fields the fixups marked as ignored, keyed by (record, field).
#[derive(Debug, Default)]
struct HiddenFields(HashSet<(String, String)>);

impl HiddenFields {
    fn from_tree(tree: &DeclarationTree) -> Self {
        let mut hidden = HashSet::new();
        for decl in &tree.declarations {
            let DeclKind::Record(record) = &decl.kind else {
                continue;
            };
            for field in record.fields.iter().flatten().filter(|f| f.ignored) {
                hidden.insert((decl.name.clone(), field.name.clone()));
            }
        }
        HiddenFields(hidden)
    }
}

impl ParseCallbacks for HiddenFields {
    fn field_visibility(&self, info: FieldInfo<'_>) -> Option<FieldVisibilityKind> {
        let key = (info.type_name.to_string(), info.field_name.to_string());
        self.0.contains(&key).then_some(FieldVisibilityKind::Private)
    }
}

/// bindgen configured for one corpus: only the tree's declarations (and
/// what they reference) are generated.
fn builder(request: &ParseRequest, tree: &DeclarationTree, options: &EmitOptions) -> bindgen::Builder {
    let mut builder = bindgen::builder()
        .header_contents(UMBRELLA, &request.umbrella_source())
        .clang_args(request.compiler_args())
        .raw_line(PREAMBLE)
        .formatter(Formatter::Prettyplease)
        .default_enum_style(EnumVariation::Consts)
        .prepend_enum_name(false)
        .generate_comments(false)
        .layout_tests(true)
        .merge_extern_blocks(true)
        .derive_default(false)
        .parse_callbacks(Box::new(HiddenFields::from_tree(tree)));

    for decl in &tree.declarations {
        let pattern = regex::escape(&decl.name);
        builder = match &decl.kind {
            DeclKind::Function(_) => builder.allowlist_function(pattern),
            DeclKind::Method(_) => continue,
            DeclKind::Record(_) | DeclKind::Enum(_) | DeclKind::Typedef(_) => {
                builder.allowlist_type(pattern)
            }
            DeclKind::Constant(_) => builder.allowlist_var(pattern),
        };
    }
    for opaque in &options.opaque_types {
        builder = builder.opaque_type(regex::escape(opaque));
    }
    builder
}

impl BindingEmitter for RustFfiEmitter {
    fn emit(&self, request: &ParseRequest, tree: &DeclarationTree, options: &EmitOptions) -> Result<String> {
        clang_sys::load().map_err(|e| BindgenError::Emit(format!("failed to load libclang: {}", e)))?;
        debug!(
            headers = request.headers.len(),
            opaque = options.opaque_types.len(),
            "invoking bindgen"
        );

        let generated = builder(request, tree, options)
            .generate()
            .map_err(|e| BindgenError::Emit(e.to_string()))?
            .to_string();
        let output = docs::annotate(&generated, tree, options)?;

        info!(
            declarations = tree.len(),
            bytes = output.len(),
            "emitted rust bindings"
        );
        Ok(output)
    }
}
