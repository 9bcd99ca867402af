//! Run configuration.
//!
//! Built-in defaults reproduce the PDFium setup. `PDFIUM_BINDGEN_CONFIG` may
//! name a TOML file overriding any subset of fields.

use crate::assets::github::DEFAULT_RELEASE_API;
use crate::emit::{DocStyle, EmitOptions};
use crate::error::{BindgenError, Result};
use crate::fixups::Fixup;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV: &str = "PDFIUM_BINDGEN_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Product name used in the provenance header.
    pub product: String,
    pub release_api: String,
    pub user_agent: String,
    /// Scratch directory for downloads and extracted packages.
    pub work_dir: PathBuf,
    /// Package whose headers drive generation.
    pub header_package: String,
    /// Include directories, relative to the header package.
    pub include_subdirs: Vec<PathBuf>,
    pub undefines: Vec<String>,
    pub excluded_headers: Vec<String>,
    pub target: Option<String>,
    pub clang_args: Vec<String>,
    pub libraries: Vec<LibraryEntry>,
    pub fixups: Vec<Fixup>,
    /// Types emitted as opaque blobs of the right size and alignment.
    pub opaque_types: Vec<String>,
    pub link_name: String,
    pub doc_style: DocStyle,
    /// Final bindings file in the consuming project.
    pub bindings_path: PathBuf,
    pub runtimes_root: PathBuf,
    pub version_manifest: PathBuf,
    /// Emitter output name inside `work_dir`.
    pub raw_output: String,
}

/// One platform's native binary within a release package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibraryEntry {
    /// Runtime identifier, e.g. `linux-x64`.
    pub platform: String,
    /// Archive stem of the package carrying the binary.
    pub package: String,
    /// Binary path relative to the extracted package.
    pub binary: PathBuf,
}

impl LibraryEntry {
    fn new(platform: &str, package: &str, binary: &str) -> Self {
        LibraryEntry {
            platform: platform.to_string(),
            package: package.to_string(),
            binary: PathBuf::from(binary),
        }
    }

    /// `<runtimes_root>/<platform>/native`
    pub fn destination(&self, runtimes_root: &Path) -> PathBuf {
        runtimes_root.join(&self.platform).join("native")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            product: "PDFium".to_string(),
            release_api: DEFAULT_RELEASE_API.to_string(),
            user_agent: concat!("pdfium-bindgen/", env!("CARGO_PKG_VERSION")).to_string(),
            work_dir: PathBuf::from("work"),
            header_package: "pdfium-win-x64".to_string(),
            include_subdirs: vec![PathBuf::from("include"), PathBuf::from("include/cpp")],
            undefines: vec!["_WIN32".to_string()],
            excluded_headers: vec!["fpdf_ext.h".to_string()],
            target: None,
            clang_args: Vec::new(),
            libraries: vec![
                LibraryEntry::new("win-x86", "pdfium-win-x86", "bin/pdfium.dll"),
                LibraryEntry::new("win-x64", "pdfium-win-x64", "bin/pdfium.dll"),
                LibraryEntry::new("linux-x64", "pdfium-linux-x64", "lib/libpdfium.so"),
                LibraryEntry::new("osx-x64", "pdfium-mac-x64", "lib/libpdfium.dylib"),
            ],
            fixups: Fixup::defaults(),
            opaque_types: Vec::new(),
            link_name: "pdfium".to_string(),
            doc_style: DocStyle::Markdown,
            bindings_path: PathBuf::from("pdfium-sys/src/bindings.rs"),
            runtimes_root: PathBuf::from("pdfium-sys/runtimes"),
            version_manifest: PathBuf::from("pdfium-sys/version.props"),
            raw_output: "bindings.rs".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with the file named by `PDFIUM_BINDGEN_CONFIG`.
    pub fn load() -> Result<Config> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Config::from_file(Path::new(&path)),
            None => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| BindgenError::unavailable(path, Some(e)))?;
        let config = Config::from_toml(&text).map_err(|message| BindgenError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn from_toml(text: &str) -> std::result::Result<Config, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Distinct packages a run downloads: the header package first.
    pub fn packages(&self) -> Vec<&str> {
        let mut packages = vec![self.header_package.as_str()];
        for entry in &self.libraries {
            if !packages.contains(&entry.package.as_str()) {
                packages.push(&entry.package);
            }
        }
        packages
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            link_name: self.link_name.clone(),
            doc_style: self.doc_style,
            opaque_types: self.opaque_types.clone(),
        }
    }
}
