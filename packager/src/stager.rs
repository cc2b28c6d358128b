//! Staging tree management and file copying.
//!
//! The staging tree lives at `<dist>/<version>` and is the only directory a
//! run ever deletes. Files are copied with their permission bits and
//! modification time; directories are copied recursively with symlinks
//! re-created as links.

use crate::config::DistLayout;
use crate::error::{DistError, Result};
use crate::platform::PlatformAssets;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Assembles the versioned staging tree for one run.
pub struct Stager<'a> {
    layout: &'a DistLayout,
}

impl<'a> Stager<'a> {
    /// Create a stager over the paths in `layout`.
    #[must_use]
    pub fn new(layout: &'a DistLayout) -> Self {
        Self { layout }
    }

    /// Remove any previous staging tree and create `<arch>/bin`,
    /// `<arch>/lib` and `includes`.
    ///
    /// Only `<dist>/<version>` is removed; siblings under the dist root
    /// (checked-in headers, earlier archives) are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Staging`] if the old tree cannot be removed or a
    /// directory cannot be created.
    pub fn reset(&self) -> Result<()> {
        let staging = self.staging_dir()?;
        match fs::remove_dir_all(staging) {
            Ok(()) => debug!("removed previous staging tree {staging}"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(DistError::staging(staging, e)),
        }

        for dir in [
            &self.layout.bin_dir,
            &self.layout.lib_dir,
            &self.layout.include_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| DistError::staging(dir, e))?;
        }
        info!("Prepared staging tree at {staging}");
        Ok(())
    }

    /// Copy every binary and directory listed in `assets` from the build
    /// output into `<arch>/bin`.
    ///
    /// All sources are checked before anything is copied, so a missing
    /// artefact is reported without a half-populated `bin` directory.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::MissingArtefact`] for the first absent source and
    /// [`DistError::Staging`] if a copy fails.
    pub fn stage_assets(&self, assets: &PlatformAssets) -> Result<()> {
        let build_dir = &self.layout.build_dir;
        for name in &assets.binaries {
            require_file(&build_dir.join(name))?;
        }
        for name in &assets.directories {
            require_dir(&build_dir.join(name))?;
        }

        for name in &assets.binaries {
            copy_file(&build_dir.join(name), &self.layout.bin_dir.join(name))?;
        }
        for name in &assets.directories {
            let copied = copy_tree(&build_dir.join(name), &self.layout.bin_dir.join(name))?;
            debug!("copied {copied} entries from {name}");
        }
        info!(
            "Staged {} binaries and {} directories into {}",
            assets.binaries.len(),
            assets.directories.len(),
            self.layout.bin_dir
        );
        Ok(())
    }

    /// Write `version.txt` containing exactly `version`.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Staging`] if the file cannot be written.
    pub fn write_version(&self, version: &str) -> Result<()> {
        let path = &self.layout.version_file;
        fs::write(path, version).map_err(|e| DistError::staging(path, e))?;
        debug!("wrote {path}");
        Ok(())
    }

    /// Delete the staging tree.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Staging`] if removal fails for any reason other
    /// than the tree already being gone.
    pub fn remove(&self) -> Result<()> {
        let staging = self.staging_dir()?;
        match fs::remove_dir_all(staging) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DistError::staging(staging, e)),
        }
    }

    /// The staging directory, checked to be a direct child of the dist root.
    fn staging_dir(&self) -> Result<&Utf8Path> {
        let staging = self.layout.staging_dir.as_path();
        let scoped = staging.file_name().is_some()
            && staging.parent() == Some(self.layout.dist_root.as_path());
        if scoped {
            Ok(staging)
        } else {
            Err(DistError::staging(
                staging,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory under {}", self.layout.dist_root),
                ),
            ))
        }
    }
}

/// Fail with [`DistError::MissingArtefact`] unless `path` is a file.
pub(crate) fn require_file(path: &Utf8Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DistError::MissingArtefact {
            path: path.to_owned(),
        })
    }
}

/// Fail with [`DistError::MissingArtefact`] unless `path` is a directory.
pub(crate) fn require_dir(path: &Utf8Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DistError::MissingArtefact {
            path: path.to_owned(),
        })
    }
}

/// Copy one file, preserving permission bits and timestamps.
///
/// # Errors
///
/// Returns [`DistError::MissingArtefact`] if `src` is not a file and
/// [`DistError::Staging`] if the copy fails.
pub fn copy_file(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    require_file(src)?;
    copy_preserving(src.as_std_path(), dest.as_std_path())
        .map_err(|e| DistError::staging(dest, e))?;
    debug!("copied {src} -> {dest}");
    Ok(())
}

/// Recursively copy `src` to `dest`, returning the number of entries written.
///
/// Symlinks are re-created pointing at the same target on Unix. On other
/// hosts the link target's contents are copied instead. Directories get the
/// source permissions and times once their contents are in place.
///
/// # Errors
///
/// Returns [`DistError::MissingArtefact`] if `src` is not a directory and
/// [`DistError::Staging`] if any entry cannot be read or written.
pub fn copy_tree(src: &Utf8Path, dest: &Utf8Path) -> Result<usize> {
    require_dir(src)?;
    let mut copied = 0;
    let mut directories = Vec::new();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| DistError::staging(src, e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src.as_std_path())
            .map_err(|e| DistError::staging(src, io::Error::other(e)))?;
        let target = dest.as_std_path().join(relative);
        let file_type = entry.file_type();

        let outcome = if file_type.is_dir() {
            directories.push((entry.path().to_path_buf(), target.clone()));
            fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else {
            copy_preserving(entry.path(), &target)
        };
        outcome.map_err(|e| DistError::staging(lossy(&target), e))?;
        copied += 1;
    }

    // Deepest first, so a read-only parent is applied after its children.
    for (source, target) in directories.iter().rev() {
        fs::metadata(source)
            .and_then(|metadata| {
                fs::set_permissions(target, metadata.permissions())?;
                preserve_times(&metadata, target)
            })
            .map_err(|e| DistError::staging(lossy(target), e))?;
    }
    Ok(copied)
}

fn lossy(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}

fn copy_preserving(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    preserve_times(&fs::metadata(src)?, dest)
}

fn preserve_times(source: &fs::Metadata, dest: &Path) -> io::Result<()> {
    let times = FileTimes::new()
        .set_accessed(source.accessed()?)
        .set_modified(source.modified()?);
    open_for_times(dest)?.set_times(times)
}

#[cfg(not(windows))]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
    File::options()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(path)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    copy_preserving(src, dest)
}

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
