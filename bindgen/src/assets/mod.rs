//! Release asset provider seam.
//!
//! A release is described once per run; the packages a run needs are matched
//! against its assets by archive stem and fetched into the work directory.

pub mod archive;
pub mod github;

use crate::error::{BindgenError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Published release of the prebuilt binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    /// e.g. `chromium/4194`
    pub tag_name: String,
    pub target_commitish: String,
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

impl Asset {
    /// Archive name without its `.zip` / `.tgz` / `.tar.gz` extension.
    pub fn stem(&self) -> Option<&str> {
        archive::archive_stem(&self.name)
    }
}

/// Source of releases and their extracted packages.
pub trait AssetProvider {
    /// Describe release `id` (`latest` or a numeric release id).
    fn release(&self, id: &str) -> Result<ReleaseDescriptor>;

    /// Download `asset` and extract it into `<work_dir>/<stem>`, returning
    /// that directory.
    fn fetch(&self, asset: &Asset, work_dir: &Path) -> Result<PathBuf>;
}

/// Pick the asset for every package, by exact stem match.
///
/// A package the release does not carry is fatal.
pub fn select_assets<'r>(release: &'r ReleaseDescriptor, packages: &[&str]) -> Result<Vec<&'r Asset>> {
    packages
        .iter()
        .map(|package| {
            let asset = release
                .assets
                .iter()
                .find(|a| a.stem() == Some(*package))
                .ok_or_else(|| {
                    BindgenError::unavailable(format!("{}/{}", release.tag_name, package), None)
                })?;
            debug!(package = %package, asset = %asset.name, "selected asset");
            Ok(asset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            browser_download_url: format!("https://example.invalid/{}", name),
        }
    }

    fn release() -> ReleaseDescriptor {
        ReleaseDescriptor {
            tag_name: "chromium/4194".to_string(),
            target_commitish: "master".to_string(),
            html_url: "https://github.com/bblanchon/pdfium-binaries/releases/tag/chromium/4194"
                .to_string(),
            assets: vec![
                asset("pdfium-win-x64.zip"),
                asset("pdfium-v8-win-x64.zip"),
                asset("pdfium-linux-x64.tgz"),
                asset("pdfium-linux-x64-musl.tgz"),
            ],
        }
    }

    #[test]
    fn exact_stem_match_only() {
        let release = release();
        let picked = select_assets(&release, &["pdfium-win-x64", "pdfium-linux-x64"]).unwrap();
        let names: Vec<_> = picked.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["pdfium-win-x64.zip", "pdfium-linux-x64.tgz"]);
    }

    #[test]
    fn missing_package_is_source_unavailable() {
        let release = release();
        let err = select_assets(&release, &["pdfium-mac-arm64"]).unwrap_err();
        assert!(matches!(err, BindgenError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("chromium/4194/pdfium-mac-arm64"));
    }

    #[test]
    fn descriptor_deserializes_from_github_json() {
        let json = r#"{
            "tag_name": "chromium/4194",
            "target_commitish": "master",
            "html_url": "https://github.com/bblanchon/pdfium-binaries/releases/tag/chromium/4194",
            "draft": false,
            "assets": [
                {"name": "pdfium-win-x86.zip", "size": 1, "browser_download_url": "https://x/pdfium-win-x86.zip"}
            ]
        }"#;
        let release: ReleaseDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "chromium/4194");
        assert_eq!(release.assets[0].stem(), Some("pdfium-win-x86"));
    }
}
