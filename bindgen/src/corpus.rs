//! Header corpus: header discovery and a per-run line cache.

use crate::error::{BindgenError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Memoized line arrays, one read per header for the whole run.
#[derive(Debug, Default)]
pub struct HeaderCorpus {
    cache: HashMap<PathBuf, Vec<String>>,
}

impl HeaderCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of `path`, read on first request and cached afterwards.
    pub fn lines_of(&mut self, path: &Path) -> Result<&[String]> {
        if !self.cache.contains_key(path) {
            let bytes =
                fs::read(path).map_err(|e| BindgenError::unavailable(path, Some(e)))?;
            let lines: Vec<String> = String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect();
            debug!(path = %path.display(), lines = lines.len(), "cached header");
            self.cache.insert(path.to_path_buf(), lines);
        }
        Ok(self.cache[path].as_slice())
    }

    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }
}

/// List the `*.h` files directly inside `include_dir`, minus `excluded`.
///
/// Sorted for deterministic output. An include directory without any
/// header is as fatal as a missing one.
pub fn discover_headers(include_dir: &Path, excluded: &[String]) -> Result<Vec<PathBuf>> {
    if !include_dir.is_dir() {
        return Err(BindgenError::unavailable(include_dir, None));
    }
    let pattern = include_dir.join("*.h");
    let pattern = pattern.to_string_lossy();
    let mut headers: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| BindgenError::HeaderParse(format!("invalid glob pattern {}: {}", pattern, e)))?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            !excluded.iter().any(|x| x == name)
        })
        .collect();
    headers.sort();
    headers.dedup();
    if headers.is_empty() {
        return Err(BindgenError::unavailable(include_dir.join("*.h"), None));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lines_are_cached_after_first_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fpdfview.h");
        fs::write(&path, "// one\nint two;\n").unwrap();

        let mut corpus = HeaderCorpus::new();
        assert_eq!(corpus.lines_of(&path).unwrap(), ["// one", "int two;"]);

        // Served from cache even after the file changes on disk.
        fs::write(&path, "changed\n").unwrap();
        assert_eq!(corpus.lines_of(&path).unwrap().len(), 2);
        assert_eq!(corpus.cached_files(), 1);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let mut corpus = HeaderCorpus::new();
        let err = corpus.lines_of(Path::new("/nonexistent/fpdfview.h")).unwrap_err();
        assert!(matches!(err, BindgenError::SourceUnavailable { .. }));
    }

    #[test]
    fn discovery_skips_excluded_and_non_headers() {
        let dir = TempDir::new().unwrap();
        for name in ["fpdfview.h", "fpdf_ext.h", "fpdf_edit.h", "README.md"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("cpp")).unwrap();
        fs::write(dir.path().join("cpp").join("fpdf_scopers.h"), "").unwrap();

        let headers = discover_headers(dir.path(), &["fpdf_ext.h".to_string()]).unwrap();
        let names: Vec<_> = headers
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["fpdf_edit.h", "fpdfview.h"]);
    }

    #[test]
    fn discovery_without_headers_fails() {
        let dir = TempDir::new().unwrap();
        assert!(discover_headers(dir.path(), &[]).is_err());
        assert!(discover_headers(&dir.path().join("missing"), &[]).is_err());
    }
}
