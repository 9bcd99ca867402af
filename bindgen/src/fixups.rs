//! Post-parse compatibility fixups applied before emission.

use crate::error::{BindgenError, Result};
use crate::model::DeclarationTree;
use serde::Deserialize;
use tracing::info;

/// One targeted adjustment of the declaration tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fixup {
    /// Hide a struct field from the generated surface, keeping its storage.
    IgnoreField { record: String, field: String },
}

impl Fixup {
    /// The fixups every PDFium generation needs.
    pub fn defaults() -> Vec<Fixup> {
        vec![Fixup::IgnoreField {
            record: "FPDF_LIBRARY_CONFIG_".to_string(),
            // Raw array of font paths owned by the native side.
            field: "m_pUserFontPaths".to_string(),
        }]
    }

    /// Apply to `tree`. A missing target means the upstream headers changed
    /// shape and the fixup table needs updating.
    pub fn apply(&self, tree: &mut DeclarationTree) -> Result<()> {
        match self {
            Fixup::IgnoreField { record, field } => {
                let decl = tree.record_mut(record).ok_or_else(|| {
                    BindgenError::ShapeMismatch(format!("struct `{}` not found", record))
                })?;
                let fields = decl.fields.as_mut().ok_or_else(|| {
                    BindgenError::ShapeMismatch(format!("struct `{}` has no definition", record))
                })?;
                let target = fields.iter_mut().find(|f| f.name == *field).ok_or_else(|| {
                    BindgenError::ShapeMismatch(format!(
                        "struct `{}` has no field `{}`",
                        record, field
                    ))
                })?;
                target.ignored = true;
                info!(record = %record, field = %field, "ignored struct field");
                Ok(())
            }
        }
    }
}

/// Apply every fixup in order, stopping at the first mismatch.
pub fn apply_all(tree: &mut DeclarationTree, fixups: &[Fixup]) -> Result<()> {
    fixups.iter().try_for_each(|fixup| fixup.apply(tree))
}
