//! Unpacking of the Node source tarball fetched in remote mode.
//!
//! Only the headers are used afterwards, but the tarball is unpacked whole so
//! the `node-v<version>/` layout matches a vendored checkout. Entries whose
//! names would land outside the scratch directory are refused.

use flate2::read::GzDecoder;
use log::{debug, trace};
use std::fs::File;
use std::path::{Component, Path};

/// Unpacks a downloaded source archive.
///
/// # Examples
///
/// ```no_run
/// use electron_dist::extraction::{ArtefactExtractor, TarGzExtractor};
/// use std::path::Path;
///
/// let files = TarGzExtractor
///     .extract(Path::new("node-v1.2.3.tar.gz"), Path::new("scratch"))
///     .expect("unpacked");
/// assert!(files > 0);
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Unpack `archive_path` below `dest_dir` and count the regular files.
    ///
    /// # Errors
    ///
    /// Fails with [`ExtractionError::PathTraversal`] for an entry that names
    /// a location outside `dest_dir`, [`ExtractionError::EmptyArchive`] when
    /// nothing but directories were found, and [`ExtractionError::Io`] when
    /// the archive is unreadable.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError>;
}

/// Reasons a source archive could not be unpacked.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Reading the archive or writing an entry failed.
    #[error("could not unpack source archive: {0}")]
    Io(#[from] std::io::Error),

    /// An entry name is absolute or climbs out with `..`.
    #[error("archive entry escapes the destination: {path}")]
    PathTraversal {
        /// Entry name as stored in the archive.
        path: String,
    },

    /// The archive held no regular files.
    #[error("source archive contains no files")]
    EmptyArchive,
}

/// Gzip-compressed tar extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl ArtefactExtractor for TarGzExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive_path)?));
        archive.set_preserve_permissions(true);

        let mut files = 0;
        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.into_owned();
            ensure_contained(&name)?;
            trace!("unpacking {}", name.display());

            files += usize::from(entry.header().entry_type().is_file());
            entry.unpack_in(dest_dir)?;
        }

        if files == 0 {
            return Err(ExtractionError::EmptyArchive);
        }
        debug!("unpacked {files} files from {}", archive_path.display());
        Ok(files)
    }
}

/// Refuse entry names that are rooted or contain `..`.
fn ensure_contained(name: &Path) -> Result<(), ExtractionError> {
    let contained = name
        .components()
        .all(|part| matches!(part, Component::Normal(_) | Component::CurDir));
    if contained {
        Ok(())
    } else {
        Err(ExtractionError::PathTraversal {
            path: name.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn tarball(dir: &Path, files: &[(&str, &[u8])]) -> std::path::PathBuf {
        let path = dir.join("node.tar.gz");
        let mut builder =
            tar::Builder::new(GzEncoder::new(File::create(&path).expect("create"), Compression::fast()));
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *body).expect("append");
        }
        builder.into_inner().expect("tar").finish().expect("gzip");
        path
    }

    #[rstest]
    fn unpacks_source_layout(scratch: TempDir) {
        let archive = tarball(scratch.path(), &[
            ("node-v1.2.3/src/node.h", b"// node"),
            ("node-v1.2.3/deps/uv/include/uv.h", b"// uv"),
        ]);
        let dest = scratch.path().join("out");
        std::fs::create_dir_all(&dest).expect("dest");

        let files = TarGzExtractor.extract(&archive, &dest).expect("extract");

        assert_eq!(files, 2);
        let node = std::fs::read(dest.join("node-v1.2.3/src/node.h")).expect("node.h");
        assert_eq!(node, b"// node");
        assert!(dest.join("node-v1.2.3/deps/uv/include/uv.h").is_file());
    }

    #[rstest]
    #[case::leading_parent("../escape.h")]
    #[case::nested_parent("node-v1/../../escape.h")]
    fn escaping_names_are_refused(#[case] name: &str) {
        assert!(matches!(
            ensure_contained(Path::new(name)),
            Err(ExtractionError::PathTraversal { ref path }) if path == name
        ));
    }

    #[cfg(unix)]
    #[test]
    fn rooted_names_are_refused() {
        assert!(matches!(
            ensure_contained(Path::new("/etc/passwd")),
            Err(ExtractionError::PathTraversal { .. })
        ));
    }

    #[rstest]
    #[case::nested("node-v1.2.3/deps/v8/include/v8.h")]
    #[case::dot_prefixed("./node-v1.2.3/common.gypi")]
    fn ordinary_names_are_accepted(#[case] name: &str) {
        assert!(ensure_contained(Path::new(name)).is_ok());
    }

    #[rstest]
    fn archive_without_files_is_empty(scratch: TempDir) {
        let archive = tarball(scratch.path(), &[]);

        let result = TarGzExtractor.extract(&archive, scratch.path());

        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[rstest]
    fn garbage_input_is_an_io_error(scratch: TempDir) {
        let archive = scratch.path().join("broken.tar.gz");
        std::fs::write(&archive, b"plain text").expect("write");

        let result = TarGzExtractor.extract(&archive, scratch.path());

        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
