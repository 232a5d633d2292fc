use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vd_core::DiagnosticsError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Record of what one retrieval request actually bundled.
///
/// Built fresh per request; never reused, so a previous request's partial
/// state cannot leak into a new archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveManifest {
    pub archive_path: PathBuf,
    /// Entry names as stored in the archive (base names, flattened).
    pub included: Vec<String>,
    /// Requested items that were not found. Informational, not fatal.
    pub missing: Vec<String>,
}

/// Builds one compressed bundle per retrieval request.
///
/// The archive is written to a temporary file and renamed into place only
/// once closed, so a reader never observes a partial archive. The final
/// name carries a second-resolution timestamp; a numeric suffix breaks
/// same-second ties between concurrent requests.
pub struct Archiver {
    dir: PathBuf,
    prefix: String,
}

impl Archiver {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Bundle every existing path into a fresh zip under the archive dir.
    ///
    /// Entries are stored under their base name only, flattening directory
    /// structure. Paths that vanished since resolution are recorded as
    /// missing. Fails with `FilesNotFound` when nothing could be included,
    /// leaving no file behind.
    pub fn build(&self, paths: &[PathBuf]) -> Result<ArchiveManifest, DiagnosticsError> {
        let mut included = Vec::new();
        let mut missing = Vec::new();

        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.dir)?;

        {
            let mut archive = ZipWriter::new(tmp.as_file_mut());
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

            for path in paths {
                if !path.is_file() {
                    warn!(path = %path.display(), "requested file disappeared before archiving");
                    missing.push(path.display().to_string());
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    missing.push(path.display().to_string());
                    continue;
                };

                archive
                    .start_file(name, options)
                    .map_err(|e| DiagnosticsError::Archive(e.to_string()))?;
                let mut source = File::open(path)?;
                io::copy(&mut source, &mut archive)?;
                included.push(name.to_string());
            }

            archive
                .finish()
                .map_err(|e| DiagnosticsError::Archive(e.to_string()))?;
        }

        if included.is_empty() {
            // Dropping the temp file removes it; nothing is left on disk.
            return Err(DiagnosticsError::FilesNotFound);
        }

        let archive_path = self.publish(tmp)?;
        debug!(
            archive = %archive_path.display(),
            included = included.len(),
            missing = missing.len(),
            "archive built"
        );

        Ok(ArchiveManifest {
            archive_path,
            included,
            missing,
        })
    }

    /// Rename the finished temp file to its timestamped name, appending a
    /// numeric suffix when another request claimed the name this second.
    fn publish(&self, mut tmp: NamedTempFile) -> Result<PathBuf, DiagnosticsError> {
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}_{}.zip", self.prefix, stamp)
            } else {
                format!("{}_{}-{}.zip", self.prefix, stamp, attempt)
            };
            let candidate = self.dir.join(name);
            match tmp.persist_noclobber(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    tmp = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(DiagnosticsError::Io(e.error)),
            }
        }
    }
}

/// List the entry names of a zip archive. Used by callers that need to
/// confirm what a produced bundle contains.
pub fn list_entries(archive: &Path) -> Result<Vec<String>, DiagnosticsError> {
    let file = File::open(archive)?;
    let zip = zip::ZipArchive::new(file).map_err(|e| DiagnosticsError::Archive(e.to_string()))?;
    Ok(zip.file_names().map(|n| n.to_string()).collect())
}
