//! GitHub releases provider for the prebuilt PDFium binaries.

use crate::assets::{archive, Asset, AssetProvider, ReleaseDescriptor};
use crate::error::{BindgenError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_RELEASE_API: &str =
    "https://api.github.com/repos/bblanchon/pdfium-binaries/releases";

/// Blocking client for the releases API; no retries.
pub struct GithubReleases {
    agent: ureq::Agent,
    api_base: String,
}

impl GithubReleases {
    pub fn new(api_base: &str, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout_connect(Duration::from_secs(30))
            .build();
        GithubReleases {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn release_url(&self, id: &str) -> String {
        format!("{}/{}", self.api_base, id)
    }

    fn get(&self, url: &str) -> Result<ureq::Response> {
        self.agent
            .get(url)
            .call()
            .map_err(|e| BindgenError::Fetch {
                url: url.to_string(),
                source: Box::new(e),
            })
    }
}

impl AssetProvider for GithubReleases {
    fn release(&self, id: &str) -> Result<ReleaseDescriptor> {
        let url = self.release_url(id);
        let body = self
            .get(&url)?
            .into_string()
            .map_err(|e| BindgenError::io(&url, e))?;
        let release: ReleaseDescriptor =
            serde_json::from_str(&body).map_err(|e| BindgenError::ReleaseDescriptor {
                url: url.clone(),
                source: e,
            })?;
        info!(
            tag = %release.tag_name,
            commit = %release.target_commitish,
            assets = release.assets.len(),
            "fetched release descriptor"
        );
        Ok(release)
    }

    fn fetch(&self, asset: &Asset, work_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(work_dir).map_err(|e| BindgenError::io(work_dir, e))?;
        let target = work_dir.join(&asset.name);
        if target.exists() {
            fs::remove_file(&target).map_err(|e| BindgenError::io(&target, e))?;
        }

        let response = self.get(&asset.browser_download_url)?;
        let mut file = File::create(&target).map_err(|e| BindgenError::io(&target, e))?;
        let bytes = io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| BindgenError::io(&target, e))?;
        info!(asset = %asset.name, bytes, "downloaded asset");

        archive::extract(&target, work_dir)
    }
}
