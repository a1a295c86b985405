use anyhow::{anyhow, Context, Result};
use std::{
    fs::{self, File},
    io::{self, Read, Seek},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

/// Index of the first file entry whose name ends with `suffix`.
pub fn find_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    suffix: &str,
) -> Result<Option<usize>> {
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{}", i))?;
        if entry.is_file() && entry.name().ends_with(suffix) {
            debug!(name = entry.name(), index = i, "matched archive member");
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Extract the member ending in `suffix` from `zip_path` into `data_dir`,
/// then move it onto `csv_path`, replacing whatever is there.
///
/// A missing member is an `io::ErrorKind::NotFound` error.
#[instrument(level = "info", skip_all, fields(zip = %zip_path.as_ref().display(), %suffix))]
pub fn extract_member(
    zip_path: impl AsRef<Path>,
    suffix: &str,
    data_dir: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
) -> Result<PathBuf> {
    let zip_path = zip_path.as_ref();
    let csv_path = csv_path.as_ref();

    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    let index = find_member(&mut archive, suffix)?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found in zip", suffix),
        )
    })?;

    let mut entry = archive.by_index(index)?;
    let relative = entry
        .enclosed_name()
        .ok_or_else(|| anyhow!("archive member {:?} escapes the data directory", entry.name()))?;
    let extracted = data_dir.as_ref().join(relative);
    if let Some(parent) = extracted.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = File::create(&extracted)
        .with_context(|| format!("creating {}", extracted.display()))?;
    let bytes = io::copy(&mut entry, &mut out)
        .with_context(|| format!("extracting {} from {:?}", entry.name(), zip_path))?;
    drop(out);

    if extracted != csv_path {
        if csv_path.exists() {
            fs::remove_file(csv_path)
                .with_context(|| format!("removing stale {}", csv_path.display()))?;
        }
        fs::rename(&extracted, csv_path).with_context(|| {
            format!("moving {} to {}", extracted.display(), csv_path.display())
        })?;
    }

    info!(path = %csv_path.display(), bytes, "extracted");
    Ok(csv_path.to_path_buf())
}
