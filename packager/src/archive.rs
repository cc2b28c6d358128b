//! Zip archive creation.
//!
//! The staging tree is written to `<name>.zip.partial` and renamed into
//! place only once the archive is complete, so an interrupted or failed run
//! never leaves a zip behind. Entries are relative to the staging directory,
//! deflate-compressed, and keep their Unix mode bits; symlinks are stored as
//! symlinks. A `sha256sum`-style sidecar is written next to the archive.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors arising while writing the archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Filesystem error reading the staging tree or writing the archive.
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip writer rejected an entry.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The staging tree could not be traversed.
    #[error("failed to walk staging tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A staged path cannot be stored as a zip entry name.
    #[error("cannot store {} in the archive: name is not valid UTF-8", path.display())]
    InvalidEntryName {
        /// The offending path.
        path: PathBuf,
    },
}

/// Result of a successful archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    /// Final archive path.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Number of entries written (files, directories and symlinks).
    pub entries: usize,
}

/// `<archive>.partial`, the in-progress file.
#[must_use]
pub fn partial_path(archive_path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{archive_path}.partial"))
}

/// `<archive>.sha256`, the checksum sidecar.
#[must_use]
pub fn sidecar_path(archive_path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{archive_path}.sha256"))
}

/// Zip `staging_dir` into `archive_path`, replacing any previous archive.
///
/// The archive and its sidecar are both written under partial names and
/// renamed into place at the end.
///
/// # Errors
///
/// Returns an [`ArchiveError`] if the tree cannot be read or the archive
/// cannot be written. Neither partial file survives a failure, and a
/// previous archive and sidecar are only replaced once both new files are
/// complete.
pub fn create_archive(
    staging_dir: &Utf8Path,
    archive_path: &Utf8Path,
) -> Result<ArchiveOutput, ArchiveError> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(archive_path);
    let sidecar = sidecar_path(archive_path);
    let sidecar_partial = partial_path(&sidecar);
    let mut renamed = false;

    let written = write_zip(staging_dir.as_std_path(), partial.as_std_path())
        .and_then(|entries| {
            let sha256 = compute_sha256(partial.as_std_path())?;
            write_sidecar(&sidecar_partial, archive_path, &sha256)?;
            fs::rename(&partial, archive_path)?;
            renamed = true;
            fs::rename(&sidecar_partial, &sidecar)?;
            Ok((entries, sha256))
        });

    match written {
        Ok((entries, sha256)) => {
            info!("Wrote {archive_path} ({entries} entries, sha256 {sha256})");
            Ok(ArchiveOutput {
                path: archive_path.to_owned(),
                sha256,
                entries,
            })
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            let _ = fs::remove_file(&sidecar_partial);
            if renamed {
                // The new zip is in place but its sidecar is not.
                let _ = fs::remove_file(archive_path);
                let _ = fs::remove_file(&sidecar);
            }
            Err(e)
        }
    }
}

fn write_zip(staging_dir: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = fs::File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;

    for entry in WalkDir::new(staging_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let name = entry_name(staging_dir, entry.path())?;
        let options = base.unix_permissions(unix_mode(&entry)?);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            zip.add_directory(name.as_str(), options)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            let target = target.to_str().ok_or_else(|| ArchiveError::InvalidEntryName {
                path: target.clone(),
            })?;
            zip.add_symlink(name.as_str(), target, options)?;
        } else {
            zip.start_file(name.as_str(), options)?;
            let mut source = fs::File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
        debug!("archived {name}");
        entries += 1;
    }

    zip.finish()?.flush()?;
    Ok(entries)
}

/// Entry name relative to the staging root, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let invalid = || ArchiveError::InvalidEntryName {
        path: path.to_path_buf(),
    };
    let relative = path.strip_prefix(root).map_err(|_| invalid())?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str().ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn unix_mode(entry: &walkdir::DirEntry) -> Result<u32, ArchiveError> {
    use std::os::unix::fs::PermissionsExt;

    Ok(entry.metadata()?.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(entry: &walkdir::DirEntry) -> Result<u32, ArchiveError> {
    Ok(if entry.file_type().is_dir() { 0o755 } else { 0o644 })
}

fn write_sidecar(
    dest: &Utf8Path,
    archive_path: &Utf8Path,
    sha256: &str,
) -> Result<(), ArchiveError> {
    let name = archive_path.file_name().unwrap_or(archive_path.as_str());
    fs::write(dest, format!("{sha256}  {name}\n"))?;
    Ok(())
}

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<String, ArchiveError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
