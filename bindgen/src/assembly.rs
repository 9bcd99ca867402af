//! Artifact assembly: provenance-stamped bindings, staged runtimes and the
//! version manifest.

use crate::assets::ReleaseDescriptor;
use crate::config::LibraryEntry;
use crate::error::{BindgenError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info};

static RE_MANIFEST_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Version>\s*([^<]*?)\s*</Version>").unwrap());

const MAX_VERSION_COMPONENTS: usize = 4;

// -- Bindings -----------------------------------------------------------------

/// Three comment lines naming where, what and when the bindings were built.
pub fn provenance_header(release: &ReleaseDescriptor, product: &str, built_on: DateTime<Utc>) -> String {
    format!(
        "// Built from precompiled binaries at {}\n// {} version {} [{}]\n// Built on: {}\n",
        release.html_url,
        product,
        release.tag_name,
        release.target_commitish,
        built_on.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// Prepend the provenance header to the emitter's raw output and write the
/// result to `dest`.
pub fn assemble_bindings(
    raw_path: &Path,
    release: &ReleaseDescriptor,
    product: &str,
    built_on: DateTime<Utc>,
    dest: &Path,
) -> Result<()> {
    let raw = fs::read_to_string(raw_path).map_err(|e| BindgenError::unavailable(raw_path, Some(e)))?;
    let mut contents = provenance_header(release, product, built_on);
    contents.push_str(&raw);
    write_exclusive(dest, contents.as_bytes())?;
    info!(dest = %dest.display(), bytes = contents.len(), "wrote bindings");
    Ok(())
}

/// Removes the sibling lock file when the write finishes, either way.
struct LockGuard(PathBuf);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Replace `path` atomically while holding `<path>.lock`.
///
/// A lock that already exists means another writer owns the destination.
pub fn write_exclusive(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| BindgenError::io(&parent, e))?;

    let lock = lock_path(path);
    match OpenOptions::new().write(true).create_new(true).open(&lock) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(BindgenError::WriteConflict {
                path: path.to_path_buf(),
                lock,
            });
        }
        Err(e) => return Err(BindgenError::io(&lock, e)),
    }
    let _guard = LockGuard(lock);

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| BindgenError::io(&parent, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.flush())
        .map_err(|e| BindgenError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| BindgenError::io(path, e.error))?;
    debug!(path = %path.display(), bytes = contents.len(), "persisted");
    Ok(())
}

// -- Runtimes -----------------------------------------------------------------

/// A platform binary and its package LICENSE, both known to exist.
#[derive(Debug, Clone)]
pub struct RuntimeSource {
    pub entry: LibraryEntry,
    pub binary: PathBuf,
    pub license: PathBuf,
}

/// Resolve every entry's binary and LICENSE inside `work_dir`, failing on the
/// first one missing.
pub fn locate_runtimes(entries: &[LibraryEntry], work_dir: &Path) -> Result<Vec<RuntimeSource>> {
    entries
        .iter()
        .map(|entry| {
            let package = work_dir.join(&entry.package);
            let binary = package.join(&entry.binary);
            let license = package.join("LICENSE");
            for required in [&binary, &license] {
                if !required.is_file() {
                    return Err(BindgenError::unavailable(required.as_path(), None));
                }
            }
            if binary.file_name().is_none() {
                return Err(BindgenError::unavailable(binary, None));
            }
            Ok(RuntimeSource {
                entry: entry.clone(),
                binary,
                license,
            })
        })
        .collect()
}

/// Copy each located binary and LICENSE into
/// `<runtimes_root>/<platform>/native/`. The root is cleared first.
pub fn stage_runtimes(sources: &[RuntimeSource], runtimes_root: &Path) -> Result<usize> {
    if runtimes_root.exists() {
        fs::remove_dir_all(runtimes_root).map_err(|e| BindgenError::io(runtimes_root, e))?;
    }

    for source in sources {
        let dest = source.entry.destination(runtimes_root);
        fs::create_dir_all(&dest).map_err(|e| BindgenError::io(&dest, e))?;
        let file_name = source
            .binary
            .file_name()
            .ok_or_else(|| BindgenError::unavailable(source.binary.as_path(), None))?;
        copy(&source.binary, &dest.join(file_name))?;
        copy(&source.license, &dest.join("LICENSE"))?;
        info!(platform = %source.entry.platform, dest = %dest.display(), "staged runtime");
    }
    Ok(sources.len())
}

fn copy(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map(|_| ()).map_err(|e| BindgenError::io(to, e))
}

// -- Version manifest ---------------------------------------------------------

/// Dotted package version of one to four numeric components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    components: Vec<u32>,
}

impl PackageVersion {
    pub fn new(components: Vec<u32>) -> Result<Self> {
        if components.is_empty() || components.len() > MAX_VERSION_COMPONENTS {
            return Err(BindgenError::InvalidManifest(format!(
                "expected 1 to {} version components, got {}",
                MAX_VERSION_COMPONENTS,
                components.len()
            )));
        }
        Ok(PackageVersion { components })
    }

    /// `<build>.<minor>.0.0`, with the build taken from the last `/` segment
    /// of the release tag (`chromium/4194` → `4194`).
    pub fn from_tag(tag: &str, minor: u32) -> Result<Self> {
        let build = tag
            .rsplit('/')
            .next()
            .and_then(|b| b.parse::<u32>().ok())
            .ok_or_else(|| BindgenError::InvalidReleaseTag(tag.to_string()))?;
        PackageVersion::new(vec![build, minor, 0, 0])
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for PackageVersion {
    type Err = BindgenError;

    fn from_str(s: &str) -> Result<Self> {
        let components = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| BindgenError::InvalidManifest(format!("invalid version `{}`", s)))
            })
            .collect::<Result<Vec<_>>>()?;
        PackageVersion::new(components)
    }
}

pub fn write_version_manifest(path: &Path, version: &PackageVersion) -> Result<()> {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Project>\n  <PropertyGroup>\n    <Version>{}</Version>\n  </PropertyGroup>\n</Project>\n",
        version
    );
    write_exclusive(path, xml.as_bytes())?;
    info!(path = %path.display(), version = %version, "wrote version manifest");
    Ok(())
}

pub fn read_version_manifest(path: &Path) -> Result<PackageVersion> {
    let xml = fs::read_to_string(path).map_err(|e| BindgenError::unavailable(path, Some(e)))?;
    let caps = RE_MANIFEST_VERSION
        .captures(&xml)
        .ok_or_else(|| BindgenError::InvalidManifest(format!("no <Version> in {}", path.display())))?;
    caps[1].parse()
}
