//! Header parser seam: the declaration extractor behind a trait.

pub mod libclang;

use crate::error::Result;
use crate::model::DeclarationTree;
use std::path::PathBuf;

/// Everything a parser front end needs to read the header corpus.
#[derive(Debug, Clone, Default)]
pub struct ParseRequest {
    /// Headers whose declarations are wanted, in order.
    pub headers: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor symbols forced undefined (e.g. `_WIN32`).
    pub undefines: Vec<String>,
    /// Target triple; the host when `None`.
    pub target: Option<String>,
    pub extra_args: Vec<String>,
}

impl ParseRequest {
    /// Compiler arguments for a C front end.
    pub fn compiler_args(&self) -> Vec<String> {
        let mut args = vec!["-x".to_string(), "c".to_string()];
        if let Some(ref target) = self.target {
            args.push(format!("--target={}", target));
        }
        for symbol in &self.undefines {
            args.push(format!("-U{}", symbol));
        }
        for dir in &self.include_dirs {
            args.push(format!("-I{}", dir.display()));
        }
        args.push("-fparse-all-comments".to_string());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Translation unit that pulls in every requested header once.
    ///
    /// Paths are made absolute so the unit resolves them wherever the front
    /// end places it.
    pub fn umbrella_source(&self) -> String {
        self.headers
            .iter()
            .map(|h| {
                let path = std::path::absolute(h).unwrap_or_else(|_| h.clone());
                format!("#include \"{}\"\n", path.display())
            })
            .collect()
    }
}

/// Turns a header corpus into a declaration tree.
pub trait HeaderParser {
    fn parse(&self, request: &ParseRequest) -> Result<DeclarationTree>;
}
