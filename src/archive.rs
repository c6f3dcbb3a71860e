use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use crate::errors::Result;

/// Extract a ZIP archive into a directory, preserving member names.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest_dir)?;
    Ok(())
}
