//! pdfium-bindgen: generate Rust FFI bindings for PDFium from its C headers.
//!
//! One run resolves a release of the prebuilt binaries, parses the header
//! package, repairs the header comments into structured documentation,
//! applies the layout fixups and emits a provenance-stamped bindings file.
//! It then stages the per-platform binaries and writes a version manifest.
//!
//! Every collaborator that touches the outside world (release provider,
//! header parser, emitter) is a trait object handed to [`run`].

pub mod assembly;
pub mod assets;
pub mod comments;
pub mod config;
pub mod corpus;
pub mod emit;
pub mod error;
pub mod fixups;
pub mod model;
pub mod parser;

use crate::assembly::PackageVersion;
use crate::assets::{AssetProvider, ReleaseDescriptor};
use crate::config::Config;
use crate::corpus::HeaderCorpus;
use crate::emit::BindingEmitter;
use crate::error::{BindgenError, Result};
use crate::parser::{HeaderParser, ParseRequest};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Per-invocation arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// `latest` or a release id.
    pub release: String,
    /// Parse headers and rewrite the bindings; when false only binaries and
    /// the manifest are refreshed.
    pub regenerate: bool,
    /// Minor build number stamped into the package version.
    pub minor: u32,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub release: ReleaseDescriptor,
    pub version: PackageVersion,
    /// Declarations emitted; zero when regeneration was skipped.
    pub declarations: usize,
    pub documented: usize,
    pub platforms: usize,
}

/// Execute one generation run. The first error aborts it.
pub fn run(
    options: &RunOptions,
    config: &Config,
    provider: &dyn AssetProvider,
    parser: &dyn HeaderParser,
    emitter: &dyn BindingEmitter,
) -> Result<RunSummary> {
    let release = provider.release(&options.release)?;
    let version = PackageVersion::from_tag(&release.tag_name, options.minor)?;

    fs::create_dir_all(&config.work_dir).map_err(|e| BindgenError::io(&config.work_dir, e))?;
    for asset in assets::select_assets(&release, &config.packages())? {
        provider.fetch(asset, &config.work_dir)?;
    }
    // Every runtime must be present before any artifact is touched.
    let runtimes = assembly::locate_runtimes(&config.libraries, &config.work_dir)?;

    let mut declarations = 0;
    let mut documented = 0;
    if options.regenerate {
        let package_dir = config.work_dir.join(&config.header_package);
        let include_dirs: Vec<PathBuf> = config
            .include_subdirs
            .iter()
            .map(|dir| package_dir.join(dir))
            .collect();
        let header_dir = include_dirs
            .first()
            .ok_or_else(|| BindgenError::unavailable(&package_dir, None))?;
        let headers = corpus::discover_headers(header_dir, &config.excluded_headers)?;
        info!(count = headers.len(), dir = %header_dir.display(), "discovered headers");

        let request = ParseRequest {
            headers,
            include_dirs,
            undefines: config.undefines.clone(),
            target: config.target.clone(),
            extra_args: config.clang_args.clone(),
        };
        let mut tree = parser.parse(&request)?;

        let mut corpus = HeaderCorpus::new();
        documented = comments::reconstruct_comments(&mut tree, &mut corpus)?;
        fixups::apply_all(&mut tree, &config.fixups)?;

        let source = emitter.emit(&request, &tree, &config.emit_options())?;
        let raw_path = config.work_dir.join(&config.raw_output);
        fs::write(&raw_path, source).map_err(|e| BindgenError::io(&raw_path, e))?;
        assembly::assemble_bindings(
            &raw_path,
            &release,
            &config.product,
            Utc::now(),
            &config.bindings_path,
        )?;
        declarations = tree.len();
    } else {
        info!("regeneration disabled, keeping existing bindings");
    }

    let platforms = assembly::stage_runtimes(&runtimes, &config.runtimes_root)?;
    assembly::write_version_manifest(&config.version_manifest, &version)?;

    info!(
        tag = %release.tag_name,
        version = %version,
        declarations,
        documented,
        platforms,
        "run complete"
    );
    Ok(RunSummary {
        release,
        version,
        declarations,
        documented,
        platforms,
    })
}
