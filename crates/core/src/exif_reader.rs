use crate::tags::TagBag;
use anyhow::{Context, Result};
use exiftool::ExifTool;
use std::path::Path;

/// Reads every tag exiftool reports for `path` as one bag.
pub fn read_tags(exiftool: &mut ExifTool, path: &Path) -> Result<TagBag> {
    let tags: TagBag = exiftool
        .read_metadata(path, &[])
        .with_context(|| format!("exiftool could not read {}", path.display()))?;
    log::debug!("read {} tags from {}", tags.len(), path.display());
    Ok(tags)
}

/// Starts a long-lived exiftool process.
pub fn start_exiftool() -> Result<ExifTool> {
    ExifTool::new().context("failed to start exiftool; is it installed and on PATH?")
}
