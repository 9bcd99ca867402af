//! Emitter module: trait-based output dispatch.

pub mod docs;
pub mod rust;

use crate::error::Result;
use crate::model::DeclarationTree;
use crate::parser::ParseRequest;
use serde::Deserialize;

/// How reconstructed documentation is rendered into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStyle {
    /// Section labels become `# Parameters` / `# Returns` / `# Remarks`
    /// headings, parameters become bullets.
    #[default]
    Markdown,
    /// One doc line per segment, labels kept verbatim.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Shared library the `extern` block links against.
    pub link_name: String,
    pub doc_style: DocStyle,
    pub opaque_types: Vec<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            link_name: "pdfium".to_string(),
            doc_style: DocStyle::default(),
            opaque_types: Vec::new(),
        }
    }
}

/// Trait for rendering a declaration tree into one interop source file.
///
/// `request` is the same corpus description the tree was parsed from, for
/// back ends that read the headers themselves.
pub trait BindingEmitter {
    fn emit(&self, request: &ParseRequest, tree: &DeclarationTree, options: &EmitOptions) -> Result<String>;
}
