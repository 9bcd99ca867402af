//! Archive extraction for downloaded packages.

use crate::error::{BindgenError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSIONS: [&str; 3] = [".tar.gz", ".tgz", ".zip"];

/// `name` without its archive extension, or `None` for unsupported formats.
pub fn archive_stem(name: &str) -> Option<&str> {
    EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
}

/// Extract `archive` into `<dest_root>/<stem>`, replacing any previous
/// extraction, and return that directory.
pub fn extract(archive: &Path, dest_root: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = archive_stem(name).ok_or_else(|| BindgenError::Archive {
        path: archive.to_path_buf(),
        message: "unsupported archive format".to_string(),
    })?;
    let dest = dest_root.join(stem);
    if dest.exists() {
        fs::remove_dir_all(&dest).map_err(|e| BindgenError::io(&dest, e))?;
    }
    fs::create_dir_all(&dest).map_err(|e| BindgenError::io(&dest, e))?;

    let file = File::open(archive).map_err(|e| BindgenError::unavailable(archive, Some(e)))?;
    let failed = |message: String| BindgenError::Archive {
        path: archive.to_path_buf(),
        message,
    };
    if name.ends_with(".zip") {
        let mut zip = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;
        zip.extract(&dest).map_err(|e| failed(e.to_string()))?;
    } else {
        tar::Archive::new(GzDecoder::new(file))
            .unpack(&dest)
            .map_err(|e| failed(e.to_string()))?;
    }

    info!(archive = %archive.display(), dest = %dest.display(), "extracted package");
    Ok(dest)
}
